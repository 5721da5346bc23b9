//! Unified error type for Roomforge.

use roomforge_backend::{LaunchError, ProbeError};
use roomforge_protocol::ProtocolError;
use roomforge_registry::RegistryError;
use roomforge_room::RoomError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RoomforgeError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Room(#[from] RoomError),

    /// Binding or serving the HTTP listener failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_launch_error() {
        let err: RoomforgeError = LaunchError::Spawn("no image".into()).into();
        assert!(matches!(err, RoomforgeError::Launch(_)));
        assert!(err.to_string().contains("no image"));
    }

    #[test]
    fn test_from_registry_error() {
        let err: RoomforgeError = RegistryError::Open("locked".into()).into();
        assert!(matches!(err, RoomforgeError::Registry(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err: RoomforgeError = RoomError::NotFound("abcdef".into()).into();
        assert!(matches!(err, RoomforgeError::Room(_)));
        assert_eq!(err.to_string(), "room abcdef not found");
    }

    #[test]
    fn test_from_io_error() {
        let err: RoomforgeError =
            std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken").into();
        assert!(matches!(err, RoomforgeError::Io(_)));
    }
}
