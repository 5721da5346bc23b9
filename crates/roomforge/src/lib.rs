//! # Roomforge
//!
//! On-demand game-server rooms. A client asks for a room, Roomforge
//! starts a dedicated game-server instance for it, records where the
//! instance can be reached, and tears it down again once nobody is
//! connected.
//!
//! This meta crate wires the layers together behind an HTTP API:
//!
//! ```text
//! HTTP (axum) → RoomOrchestrator → Launcher + Registry
//!                     ↑
//!               Reconciler (timer) → StatusProbe → Launcher + Registry
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use roomforge::prelude::*;
//!
//! # async fn run() -> Result<(), RoomforgeError> {
//! let backend = MemoryBackend::new();
//! let orchestrator = Arc::new(RoomOrchestrator::new(
//!     backend.clone(),
//!     MemoryRegistry::new(),
//!     backend,
//!     OrchestratorConfig::default(),
//! ));
//!
//! let (_stop, shutdown) = tokio::sync::watch::channel(false);
//! let server = RoomforgeServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(orchestrator)
//!     .await?;
//! server.run(shutdown).await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::RoomforgeError;
pub use handler::{build_router, ApiError};
pub use server::{RoomforgeServer, RoomforgeServerBuilder};

/// Everything needed to assemble and run a Roomforge service.
pub mod prelude {
    pub use crate::{build_router, ApiError, RoomforgeError, RoomforgeServer, RoomforgeServerBuilder};

    pub use roomforge_backend::{
        DockerConfig, DockerLauncher, HttpProbe, LaunchError, Launcher,
        MemoryBackend, ProbeError, StatusProbe,
    };
    pub use roomforge_protocol::{
        CreateRoom, Endpoint, ProtocolError, Room, RoomCode, StatusReport,
    };
    pub use roomforge_registry::{
        MemoryRegistry, RedbRegistry, Registry, RegistryError, RoomFilter,
    };
    pub use roomforge_room::{
        OrchestratorConfig, ReconcileConfig, Reconciler, RoomError,
        RoomOrchestrator, SweepReport,
    };
}
