//! Compute backend abstraction for Roomforge.
//!
//! Provides the [`Launcher`] and [`StatusProbe`] traits that abstract over
//! how game-server instances are started, stopped, and asked for their
//! occupancy, plus the implementations that ship with Roomforge.
//!
//! # Feature Flags
//!
//! - `docker` (default): [`DockerLauncher`], drives the `docker` CLI
//! - `http-probe` (default): [`HttpProbe`], queries `/api/v1/status` via `hyper`
//!
//! [`MemoryBackend`] is always available. It implements both traits
//! in-process and is what the orchestrator is tested against.

mod error;
mod memory;
mod ports;

#[cfg(feature = "docker")]
mod docker;
#[cfg(feature = "http-probe")]
mod status;

pub use error::{LaunchError, ProbeError};
pub use memory::MemoryBackend;
pub use ports::allocate_ports;

#[cfg(feature = "docker")]
pub use docker::{DockerConfig, DockerLauncher};
#[cfg(feature = "http-probe")]
pub use status::{HttpProbe, STATUS_PATH};

use std::future::Future;

use roomforge_protocol::{Endpoint, RoomCode, StatusReport};

/// Starts and stops game-server instances.
///
/// An instance is identified by its room code for its whole life: the
/// code is the container name (or equivalent handle) in the backend.
///
/// # Contract
///
/// - `spawn` reserves two distinct ports before touching the backend.
///   If that fails nothing is started and the error is
///   [`LaunchError::Allocation`]. If the backend itself fails, the error
///   is [`LaunchError::Spawn`] and the caller must not record a room.
/// - `destroy` is idempotent. Destroying an instance that is already gone,
///   or never existed, returns `Ok(())`.
pub trait Launcher: Send + Sync + 'static {
    /// Starts an instance of `image` named `code` with room for
    /// `max_players`, returning where it can be reached.
    fn spawn(
        &self,
        code: &RoomCode,
        max_players: u32,
        image: &str,
    ) -> impl Future<Output = Result<Endpoint, LaunchError>> + Send;

    /// Stops the instance named `code`.
    fn destroy(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<(), LaunchError>> + Send;
}

/// Asks a live instance how many players are connected.
///
/// Implementations should fail rather than hang: the orchestrator also
/// applies its own timeout, but a probe that honours one is friendlier.
pub trait StatusProbe: Send + Sync + 'static {
    /// Queries the status channel of the instance at `endpoint`.
    fn probe(
        &self,
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<StatusReport, ProbeError>> + Send;
}
