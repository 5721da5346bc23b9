/// Errors that can occur while starting or stopping an instance.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// No free network endpoint could be reserved. Nothing was started.
    #[error("port allocation failed: {0}")]
    Allocation(#[source] std::io::Error),

    /// The backend failed to start the instance.
    #[error("spawn failed: {0}")]
    Spawn(String),

    /// The backend failed to stop the instance.
    #[error("destroy failed: {0}")]
    Destroy(String),
}

/// Errors that can occur while querying an instance's status.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The instance could not be reached at all.
    #[error("instance unreachable: {0}")]
    Unreachable(String),

    /// The status endpoint answered with a non-success status code.
    #[error("status endpoint returned {0}")]
    Status(u16),

    /// The response body was not a valid status report.
    #[error("malformed status report: {0}")]
    Decode(String),

    /// No answer arrived within the probe timeout.
    #[error("probe timed out")]
    Timeout,
}
