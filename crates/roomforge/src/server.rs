//! `RoomforgeServer` builder and serve loop.
//!
//! The server owns the HTTP listener and runs the reconciler next to it.
//! Both stop on the same `watch` signal.

use std::net::SocketAddr;
use std::sync::Arc;

use roomforge_backend::{Launcher, StatusProbe};
use roomforge_registry::Registry;
use roomforge_room::{Reconciler, RoomOrchestrator};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::{build_router, RoomforgeError};

/// Builder for configuring and starting a Roomforge server.
///
/// # Example
///
/// ```rust,ignore
/// let server = RoomforgeServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(orchestrator)
///     .await?;
/// server.run(shutdown).await
/// ```
pub struct RoomforgeServerBuilder {
    bind_addr: String,
}

impl RoomforgeServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Binds the listener for `orchestrator`'s API.
    ///
    /// # Errors
    /// [`RoomforgeError::Io`] if the address cannot be bound.
    pub async fn build<L, R, P>(
        self,
        orchestrator: Arc<RoomOrchestrator<L, R, P>>,
    ) -> Result<RoomforgeServer<L, R, P>, RoomforgeError>
    where
        L: Launcher,
        R: Registry,
        P: StatusProbe,
    {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        Ok(RoomforgeServer {
            listener,
            orchestrator,
        })
    }
}

impl Default for RoomforgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Roomforge server. Call [`run()`](Self::run) to start serving.
pub struct RoomforgeServer<L, R, P> {
    listener: TcpListener,
    orchestrator: Arc<RoomOrchestrator<L, R, P>>,
}

impl<L, R, P> RoomforgeServer<L, R, P>
where
    L: Launcher,
    R: Registry,
    P: StatusProbe,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn orchestrator(&self) -> &Arc<RoomOrchestrator<L, R, P>> {
        &self.orchestrator
    }

    /// Serves the API and runs the reconciler until `shutdown` turns
    /// `true` or its sender is dropped.
    ///
    /// In-flight requests are allowed to finish. Returns once both the
    /// HTTP server and the reconciler have stopped.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), RoomforgeError> {
        let addr = self.listener.local_addr()?;
        let reconciler = Reconciler::spawn(Arc::clone(&self.orchestrator), shutdown.clone());
        let app = build_router(self.orchestrator);

        tracing::info!(%addr, "roomforge listening");

        let mut signal = shutdown;
        let served = axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                // A dropped sender counts as a shutdown request.
                let _ = signal.wait_for(|stop| *stop).await;
            })
            .await;

        if let Err(e) = served {
            reconciler.abort();
            return Err(e.into());
        }

        if let Err(e) = reconciler.await {
            tracing::warn!(error = %e, "reconciler task ended abnormally");
        }
        tracing::info!("roomforge stopped");
        Ok(())
    }
}
