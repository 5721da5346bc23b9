//! In-process backend: instances are entries in a map.
//!
//! [`MemoryBackend`] implements both [`Launcher`] and [`StatusProbe`], so
//! an orchestrator can be driven end to end without Docker or a network.
//! Clones share state, which lets a test hand one clone to the
//! orchestrator and keep another to inspect and steer it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use roomforge_protocol::{Endpoint, RoomCode, StatusReport};

use crate::{LaunchError, Launcher, ProbeError, StatusProbe};

const DEFAULT_BASE_PORT: u16 = 40001;

#[derive(Debug)]
struct Instance {
    endpoint: Endpoint,
    image: String,
    max_players: u32,
    players: u32,
}

#[derive(Debug)]
struct Inner {
    address: String,
    next_port: u16,
    instances: HashMap<RoomCode, Instance>,
    spawn_count: usize,
    destroy_calls: HashMap<RoomCode, usize>,
    unreachable: HashSet<RoomCode>,
    fail_spawns: bool,
    fail_destroys: bool,
    probe_delay: Duration,
    probe_delays: HashMap<RoomCode, Duration>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            next_port: DEFAULT_BASE_PORT,
            instances: HashMap::new(),
            spawn_count: 0,
            destroy_calls: HashMap::new(),
            unreachable: HashSet::new(),
            fail_spawns: false,
            fail_destroys: false,
            probe_delay: Duration::ZERO,
            probe_delays: HashMap::new(),
        }
    }
}

/// Launcher and status probe backed by an in-memory instance table.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address reported in spawned endpoints.
    pub fn with_address(self, address: impl Into<String>) -> Self {
        self.lock().address = address.into();
        self
    }

    /// Sets the first port handed out. Each spawn takes the next two.
    pub fn with_base_port(self, port: u16) -> Self {
        self.lock().next_port = port;
        self
    }

    // -- steering --------------------------------------------------------

    /// Makes every following spawn fail with [`LaunchError::Spawn`].
    pub fn fail_spawns(&self, fail: bool) {
        self.lock().fail_spawns = fail;
    }

    /// Makes every following destroy fail with [`LaunchError::Destroy`].
    /// The instance keeps running.
    pub fn fail_destroys(&self, fail: bool) {
        self.lock().fail_destroys = fail;
    }

    /// Sets how many players `code` reports. No-op for unknown codes.
    pub fn set_players(&self, code: &RoomCode, players: u32) {
        if let Some(instance) = self.lock().instances.get_mut(code) {
            instance.players = players;
        }
    }

    /// Makes probes of `code` fail as if the instance were unreachable.
    pub fn set_unreachable(&self, code: &RoomCode, unreachable: bool) {
        let mut inner = self.lock();
        if unreachable {
            inner.unreachable.insert(code.clone());
        } else {
            inner.unreachable.remove(code);
        }
    }

    /// Delays every probe answer by `delay`.
    pub fn set_probe_delay(&self, delay: Duration) {
        self.lock().probe_delay = delay;
    }

    /// Delays probes of `code` only, overriding [`set_probe_delay`](Self::set_probe_delay).
    pub fn set_probe_delay_for(&self, code: &RoomCode, delay: Duration) {
        self.lock().probe_delays.insert(code.clone(), delay);
    }

    // -- inspection ------------------------------------------------------

    pub fn is_running(&self, code: &RoomCode) -> bool {
        self.lock().instances.contains_key(code)
    }

    /// Codes of all running instances, sorted.
    pub fn running(&self) -> Vec<RoomCode> {
        let mut codes: Vec<RoomCode> = self.lock().instances.keys().cloned().collect();
        codes.sort();
        codes
    }

    /// Number of successful spawns so far.
    pub fn spawn_count(&self) -> usize {
        self.lock().spawn_count
    }

    /// Number of destroy calls made for `code`, successful or not.
    pub fn destroy_calls(&self, code: &RoomCode) -> usize {
        self.lock().destroy_calls.get(code).copied().unwrap_or(0)
    }

    /// Image and capacity `code` was started with.
    pub fn launched_with(&self, code: &RoomCode) -> Option<(String, u32)> {
        self.lock()
            .instances
            .get(code)
            .map(|i| (i.image.clone(), i.max_players))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicked test thread must not wedge every other test using the clone.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Launcher for MemoryBackend {
    async fn spawn(
        &self,
        code: &RoomCode,
        max_players: u32,
        image: &str,
    ) -> Result<Endpoint, LaunchError> {
        let mut inner = self.lock();

        let query_port = inner.next_port;
        let game_port = query_port.checked_add(1).ok_or_else(|| {
            LaunchError::Allocation(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "memory backend ran out of ports",
            ))
        })?;

        if inner.fail_spawns {
            return Err(LaunchError::Spawn("injected spawn failure".into()));
        }
        if inner.instances.contains_key(code) {
            return Err(LaunchError::Spawn(format!(
                "instance {code} already exists"
            )));
        }

        inner.next_port = game_port.wrapping_add(1);
        let endpoint = Endpoint::new(inner.address.clone(), query_port, game_port);
        inner.instances.insert(
            code.clone(),
            Instance {
                endpoint: endpoint.clone(),
                image: image.to_string(),
                max_players,
                players: 0,
            },
        );
        inner.spawn_count += 1;
        tracing::debug!(%code, image, query_port, game_port, "memory instance started");
        Ok(endpoint)
    }

    async fn destroy(&self, code: &RoomCode) -> Result<(), LaunchError> {
        let mut inner = self.lock();
        *inner.destroy_calls.entry(code.clone()).or_insert(0) += 1;

        if inner.fail_destroys {
            return Err(LaunchError::Destroy("injected destroy failure".into()));
        }
        if inner.instances.remove(code).is_some() {
            tracing::debug!(%code, "memory instance stopped");
        }
        inner.unreachable.remove(code);
        inner.probe_delays.remove(code);
        Ok(())
    }
}

impl StatusProbe for MemoryBackend {
    async fn probe(&self, endpoint: &Endpoint) -> Result<StatusReport, ProbeError> {
        let delay = {
            let inner = self.lock();
            inner
                .instances
                .iter()
                .find(|(_, i)| i.endpoint == *endpoint)
                .and_then(|(code, _)| inner.probe_delays.get(code).copied())
                .unwrap_or(inner.probe_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let inner = self.lock();
        let (code, instance) = inner
            .instances
            .iter()
            .find(|(_, i)| i.endpoint == *endpoint)
            .ok_or_else(|| ProbeError::Unreachable(endpoint.query_addr()))?;

        if inner.unreachable.contains(code) {
            return Err(ProbeError::Unreachable(endpoint.query_addr()));
        }
        Ok(StatusReport {
            players: instance.players,
        })
    }
}
