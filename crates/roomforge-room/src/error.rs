//! Error types for the orchestration layer.

use roomforge_backend::LaunchError;
use roomforge_protocol::ProtocolError;
use roomforge_registry::RegistryError;

/// Errors a caller of [`RoomOrchestrator`](crate::RoomOrchestrator) can see.
///
/// Reconciliation failures never show up here: they are logged and the
/// sweep moves on.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The request was rejected before anything was started.
    #[error("invalid request: {0}")]
    Validation(#[from] ProtocolError),

    /// No network endpoint could be reserved for the instance.
    #[error("could not allocate an endpoint: {0}")]
    Allocation(#[source] LaunchError),

    /// The backend failed to start the instance.
    #[error("could not start instance: {0}")]
    Spawn(#[source] LaunchError),

    /// The instance started but its record could not be saved.
    #[error("could not save room: {0}")]
    Persistence(#[from] RegistryError),

    /// No room is registered under this code.
    #[error("room {0} not found")]
    NotFound(String),
}

impl From<LaunchError> for RoomError {
    fn from(err: LaunchError) -> Self {
        match err {
            LaunchError::Allocation(_) => Self::Allocation(err),
            _ => Self::Spawn(err),
        }
    }
}
