//! Room registry for Roomforge.
//!
//! The registry is the durable record of which rooms exist. A record is
//! present exactly when a live instance is believed to back it: the
//! orchestrator inserts after a successful spawn and deletes after a
//! destroy.
//!
//! # Key types
//!
//! - [`Registry`]: the storage trait the orchestrator is written against
//! - [`RedbRegistry`]: on-disk (or in-memory) store backed by redb
//! - [`MemoryRegistry`]: a plain locked map, for tests and throwaway runs
//! - [`RoomFilter`]: which rooms a listing returns
//!
//! # Consistency
//!
//! Every operation is a single atomic step. An insert either lands in
//! full or not at all, a concurrent `list` never sees a half-written
//! record, and a second insert under an existing code is rejected with
//! [`RegistryError::Duplicate`].

mod error;
mod memory;
#[cfg(feature = "redb")]
mod redb_store;
#[cfg(feature = "redb")]
mod tables;

pub use error::{RegistryError, RegistryResult};
pub use memory::MemoryRegistry;
#[cfg(feature = "redb")]
pub use redb_store::RedbRegistry;

use std::future::Future;

use roomforge_protocol::{Room, RoomCode};

/// Which rooms [`Registry::list`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomFilter {
    /// Rooms with `private == false`. What public listings show.
    #[default]
    Public,
    /// Every room. What reconciliation sweeps.
    All,
}

impl RoomFilter {
    /// Returns `true` if `room` passes this filter.
    pub fn matches(&self, room: &Room) -> bool {
        match self {
            Self::Public => !room.private,
            Self::All => true,
        }
    }
}

/// Storage for room records, keyed by room code.
pub trait Registry: Send + Sync + 'static {
    /// Stores a new room.
    ///
    /// # Errors
    /// [`RegistryError::Duplicate`] if a room with the same code exists;
    /// a storage error if the write could not be committed.
    fn insert(
        &self,
        room: &Room,
    ) -> impl Future<Output = RegistryResult<()>> + Send;

    /// Returns every room matching `filter`. Order is unspecified.
    fn list(
        &self,
        filter: RoomFilter,
    ) -> impl Future<Output = RegistryResult<Vec<Room>>> + Send;

    /// Looks up one room by code.
    fn get(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = RegistryResult<Option<Room>>> + Send;

    /// Removes a room. Returns `true` if it existed.
    fn delete(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = RegistryResult<bool>> + Send;
}
