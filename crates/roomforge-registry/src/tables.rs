//! redb table definitions for the room registry.

use redb::TableDefinition;

/// Room records keyed by room code, JSON-serialized.
pub const ROOMS: TableDefinition<&str, &[u8]> = TableDefinition::new("rooms");
