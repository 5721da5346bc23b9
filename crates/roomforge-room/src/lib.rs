//! Room orchestration for Roomforge.
//!
//! Ties the launcher, the registry and the status probe together. A
//! [`RoomOrchestrator`] creates rooms (spawn first, then persist, with a
//! compensating destroy when the persist step fails) and sweeps them
//! (probe every room, reap the empty ones). A [`Reconciler`] runs those
//! sweeps on a timer as an independent background task.
//!
//! # Key types
//!
//! - [`RoomOrchestrator`]: create, list, look up and reconcile rooms
//! - [`Reconciler`]: the periodic sweep task
//! - [`OrchestratorConfig`] / [`ReconcileConfig`]: tunables
//! - [`SweepReport`]: what one sweep did
//! - [`RoomError`]: what a caller of the orchestrator can see fail

mod config;
mod error;
mod orchestrator;
mod reconcile;

pub use config::{OrchestratorConfig, ReconcileConfig};
pub use error::RoomError;
pub use orchestrator::{RoomOrchestrator, SweepOutcome, SweepReport};
pub use reconcile::Reconciler;
