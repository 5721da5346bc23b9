//! Ephemeral port allocation for new instances.

use tokio::net::TcpListener;

use crate::LaunchError;

/// Reserves a `(query_port, game_port)` pair from the OS.
///
/// Both listeners stay bound until both ports are known, so the two are
/// always distinct. They are released before returning: between this call
/// and the backend binding the ports, another process may grab one. That
/// window is accepted; a backend that fails to bind reports a spawn error.
pub async fn allocate_ports() -> Result<(u16, u16), LaunchError> {
    let query = TcpListener::bind("0.0.0.0:0")
        .await
        .map_err(LaunchError::Allocation)?;
    let game = TcpListener::bind("0.0.0.0:0")
        .await
        .map_err(LaunchError::Allocation)?;

    let query_port = query.local_addr().map_err(LaunchError::Allocation)?.port();
    let game_port = game.local_addr().map_err(LaunchError::Allocation)?.port();

    drop(query);
    drop(game);

    tracing::trace!(query_port, game_port, "ports allocated");
    Ok((query_port, game_port))
}
