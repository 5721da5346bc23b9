//! RedbRegistry: redb-backed room storage.
//!
//! Rooms are JSON-serialized into a single `rooms` table keyed by code.
//! redb serializes write transactions and gives readers committed
//! snapshots, which is exactly the atomicity the registry promises. The
//! store supports both on-disk and in-memory backends (the latter for
//! tests).
//!
//! redb calls block (commits fsync), so each operation runs on the
//! blocking pool rather than on a runtime worker.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use roomforge_protocol::{Room, RoomCode};
use tracing::{debug, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::tables::ROOMS;
use crate::{Registry, RoomFilter};

/// Convert any `Display` error into a `RegistryError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| RegistryError::$variant(e.to_string())
    };
}

/// Thread-safe room registry backed by redb.
#[derive(Clone)]
pub struct RedbRegistry {
    db: Arc<Database>,
}

impl RedbRegistry {
    /// Open (or create) a persistent registry at the given path.
    pub fn open(path: &Path) -> RegistryResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let registry = Self { db: Arc::new(db) };
        registry.ensure_tables()?;
        debug!(?path, "room registry opened");
        Ok(registry)
    }

    /// Create an ephemeral in-memory registry.
    pub fn open_in_memory() -> RegistryResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let registry = Self { db: Arc::new(db) };
        registry.ensure_tables()?;
        debug!("in-memory room registry opened");
        Ok(registry)
    }

    fn ensure_tables(&self) -> RegistryResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(ROOMS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Runs `op` against the database on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> RegistryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> RegistryResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(map_err!(Transaction))?
    }
}

fn insert_room(db: &Database, room: &Room) -> RegistryResult<()> {
    let key = room.code.as_str();
    let value = serde_json::to_vec(room).map_err(map_err!(Serialize))?;

    let txn = db.begin_write().map_err(map_err!(Transaction))?;
    let exists = {
        let mut table = txn.open_table(ROOMS).map_err(map_err!(Table))?;
        let exists = table.get(key).map_err(map_err!(Read))?.is_some();
        if !exists {
            table
                .insert(key, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        exists
    };

    if exists {
        txn.abort().map_err(map_err!(Transaction))?;
        return Err(RegistryError::Duplicate(room.code.clone()));
    }
    txn.commit().map_err(map_err!(Transaction))?;
    debug!(code = %room.code, "room stored");
    Ok(())
}

fn list_rooms(db: &Database, filter: RoomFilter) -> RegistryResult<Vec<Room>> {
    let txn = db.begin_read().map_err(map_err!(Transaction))?;
    let table = txn.open_table(ROOMS).map_err(map_err!(Table))?;
    let mut results = Vec::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (key, value) = entry.map_err(map_err!(Read))?;
        // An unreadable record is skipped so the rest stay listable.
        let room: Room = match serde_json::from_slice(value.value()) {
            Ok(room) => room,
            Err(e) => {
                warn!(key = key.value(), error = %e, "skipping unreadable room record");
                continue;
            }
        };
        if filter.matches(&room) {
            results.push(room);
        }
    }
    Ok(results)
}

fn get_room(db: &Database, code: &str) -> RegistryResult<Option<Room>> {
    let txn = db.begin_read().map_err(map_err!(Transaction))?;
    let table = txn.open_table(ROOMS).map_err(map_err!(Table))?;
    match table.get(code).map_err(map_err!(Read))? {
        Some(guard) => {
            let room: Room =
                serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
            Ok(Some(room))
        }
        None => Ok(None),
    }
}

fn delete_room(db: &Database, code: &str) -> RegistryResult<bool> {
    let txn = db.begin_write().map_err(map_err!(Transaction))?;
    let existed;
    {
        let mut table = txn.open_table(ROOMS).map_err(map_err!(Table))?;
        existed = table.remove(code).map_err(map_err!(Write))?.is_some();
    }
    txn.commit().map_err(map_err!(Transaction))?;
    debug!(%code, existed, "room deleted");
    Ok(existed)
}

impl Registry for RedbRegistry {
    async fn insert(&self, room: &Room) -> RegistryResult<()> {
        let room = room.clone();
        self.blocking(move |db| insert_room(db, &room)).await
    }

    async fn list(&self, filter: RoomFilter) -> RegistryResult<Vec<Room>> {
        self.blocking(move |db| list_rooms(db, filter)).await
    }

    async fn get(&self, code: &RoomCode) -> RegistryResult<Option<Room>> {
        let code = code.clone();
        self.blocking(move |db| get_room(db, code.as_str())).await
    }

    async fn delete(&self, code: &RoomCode) -> RegistryResult<bool> {
        let code = code.clone();
        self.blocking(move |db| delete_room(db, code.as_str())).await
    }
}
