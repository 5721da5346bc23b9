//! In-memory registry.

use std::collections::HashMap;

use roomforge_protocol::{Room, RoomCode};
use tokio::sync::RwLock;

use crate::{Registry, RegistryError, RegistryResult, RoomFilter};

/// [`Registry`] backed by a `RwLock<HashMap>`. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    rooms: RwLock<HashMap<RoomCode, Room>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rooms, private ones included.
    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }
}

impl Registry for MemoryRegistry {
    async fn insert(&self, room: &Room) -> RegistryResult<()> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.code) {
            return Err(RegistryError::Duplicate(room.code.clone()));
        }
        rooms.insert(room.code.clone(), room.clone());
        tracing::debug!(code = %room.code, "room stored");
        Ok(())
    }

    async fn list(&self, filter: RoomFilter) -> RegistryResult<Vec<Room>> {
        let rooms = self.rooms.read().await;
        Ok(rooms
            .values()
            .filter(|room| filter.matches(room))
            .cloned()
            .collect())
    }

    async fn get(&self, code: &RoomCode) -> RegistryResult<Option<Room>> {
        Ok(self.rooms.read().await.get(code).cloned())
    }

    async fn delete(&self, code: &RoomCode) -> RegistryResult<bool> {
        let existed = self.rooms.write().await.remove(code).is_some();
        tracing::debug!(%code, existed, "room deleted");
        Ok(existed)
    }
}
