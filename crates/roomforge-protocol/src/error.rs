//! Error types for the protocol layer.

/// Errors that can occur while parsing or validating protocol types.
///
/// These never involve I/O: a `ProtocolError` always means the input
/// itself was unacceptable, so callers report it as a client error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A room code was empty, too long, or contained non-letters.
    #[error("invalid room code: {0:?}")]
    InvalidCode(String),

    /// A creation request failed validation.
    ///
    /// The message names the offending field, e.g.
    /// "name is required".
    #[error("validation failed: {0}")]
    Validation(String),
}
