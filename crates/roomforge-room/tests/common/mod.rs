//! Test doubles shared by the orchestrator and reconciler tests.
//!
//! `MemoryBackend` and `MemoryRegistry` do the real work; the wrappers
//! here add failure injection and record the order in which instances
//! are destroyed and records deleted.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use roomforge_backend::{LaunchError, Launcher, MemoryBackend};
use roomforge_protocol::{Endpoint, Room, RoomCode};
use roomforge_registry::{
    MemoryRegistry, Registry, RegistryError, RegistryResult, RoomFilter,
};
use roomforge_room::{OrchestratorConfig, RoomOrchestrator};

// =========================================================================
// EventLog
// =========================================================================

/// Ordered record of side effects, shared by launcher and registry.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

// =========================================================================
// RecordingLauncher
// =========================================================================

/// Delegates to a `MemoryBackend`, logging every destroy and optionally
/// stalling it.
pub struct RecordingLauncher {
    pub backend: MemoryBackend,
    log: EventLog,
    destroy_delay: Mutex<Duration>,
}

impl RecordingLauncher {
    pub fn new(backend: MemoryBackend, log: EventLog) -> Self {
        Self {
            backend,
            log,
            destroy_delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn set_destroy_delay(&self, delay: Duration) {
        *self.destroy_delay.lock().unwrap() = delay;
    }
}

impl Launcher for RecordingLauncher {
    async fn spawn(
        &self,
        code: &RoomCode,
        max_players: u32,
        image: &str,
    ) -> Result<Endpoint, LaunchError> {
        self.backend.spawn(code, max_players, image).await
    }

    async fn destroy(&self, code: &RoomCode) -> Result<(), LaunchError> {
        self.log.push(format!("destroy:{code}"));
        let delay = *self.destroy_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.backend.destroy(code).await
    }
}

// =========================================================================
// StubRegistry
// =========================================================================

/// A `MemoryRegistry` with switchable failures.
#[derive(Default)]
pub struct StubRegistry {
    inner: MemoryRegistry,
    log: EventLog,
    /// Reject the next insert as a duplicate, then behave normally.
    pub collide_once: AtomicBool,
    pub fail_inserts: AtomicBool,
    pub fail_list: AtomicBool,
    pub fail_deletes: AtomicBool,
    /// Another writer removes each record just before it is deleted.
    pub delete_races: AtomicBool,
    rejected: Mutex<Vec<RoomCode>>,
}

impl StubRegistry {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    /// Codes whose insert was rejected.
    pub fn rejected(&self) -> Vec<RoomCode> {
        self.rejected.lock().unwrap().clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }

    pub async fn contains(&self, code: &RoomCode) -> bool {
        self.inner.get(code).await.unwrap().is_some()
    }
}

impl Registry for StubRegistry {
    async fn insert(&self, room: &Room) -> RegistryResult<()> {
        if self.collide_once.swap(false, Ordering::SeqCst) {
            self.rejected.lock().unwrap().push(room.code.clone());
            return Err(RegistryError::Duplicate(room.code.clone()));
        }
        if self.fail_inserts.load(Ordering::SeqCst) {
            self.rejected.lock().unwrap().push(room.code.clone());
            return Err(RegistryError::Write("disk full".into()));
        }
        self.inner.insert(room).await
    }

    async fn list(&self, filter: RoomFilter) -> RegistryResult<Vec<Room>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(RegistryError::Read("storage offline".into()));
        }
        self.inner.list(filter).await
    }

    async fn get(&self, code: &RoomCode) -> RegistryResult<Option<Room>> {
        self.inner.get(code).await
    }

    async fn delete(&self, code: &RoomCode) -> RegistryResult<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(RegistryError::Write("storage offline".into()));
        }
        if self.delete_races.load(Ordering::SeqCst) {
            self.inner.delete(code).await?;
        }
        self.log.push(format!("delete:{code}"));
        self.inner.delete(code).await
    }
}

// =========================================================================
// Harness
// =========================================================================

pub type TestOrchestrator = RoomOrchestrator<RecordingLauncher, StubRegistry, MemoryBackend>;

pub struct Harness {
    pub orchestrator: Arc<TestOrchestrator>,
    /// Same instance table the orchestrator launches into and probes.
    pub backend: MemoryBackend,
    pub log: EventLog,
}

impl Harness {
    pub fn new(config: OrchestratorConfig) -> Self {
        let backend = MemoryBackend::new().with_address("10.0.0.1");
        let log = EventLog::default();
        let orchestrator = RoomOrchestrator::new(
            RecordingLauncher::new(backend.clone(), log.clone()),
            StubRegistry::new(log.clone()),
            backend.clone(),
            config,
        );
        Self {
            orchestrator: Arc::new(orchestrator),
            backend,
            log,
        }
    }

    pub fn registry(&self) -> &StubRegistry {
        self.orchestrator.registry()
    }

    pub fn launcher(&self) -> &RecordingLauncher {
        self.orchestrator.launcher()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}
