//! roomforged: the Roomforge daemon.
//!
//! Opens the room registry, picks a compute backend, and serves the HTTP
//! API with the reconciler running alongside until Ctrl-C or SIGTERM.
//!
//! # Usage
//!
//! ```text
//! ROOMFORGE_DATA_DIR=/var/lib/roomforge roomforged --bind 0.0.0.0:8080
//! ```

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use roomforge::prelude::*;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::{Backend, Cli};

const DEFAULT_FILTER: &str = "info,roomforge=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    info!(backend = ?cli.backend, bind = %cli.bind, "roomforged starting");

    std::fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("creating data directory {:?}", cli.data_dir))?;
    let registry_path = cli.registry_path();
    let registry = RedbRegistry::open(&registry_path)
        .with_context(|| format!("opening room registry at {registry_path:?}"))?;
    info!(path = ?registry_path, "room registry opened");

    let config = cli.orchestrator_config();
    match cli.backend {
        Backend::Docker => {
            let launcher = DockerLauncher::new(cli.docker_config());
            let probe = HttpProbe::new(cli.probe_timeout());
            let orchestrator = RoomOrchestrator::new(launcher, registry, probe, config);
            serve(&cli.bind, orchestrator).await
        }
        Backend::Memory => {
            let backend = MemoryBackend::new().with_address(cli.advertise_address.clone());
            let orchestrator =
                RoomOrchestrator::new(backend.clone(), registry, backend, config);
            serve(&cli.bind, orchestrator).await
        }
    }
}

async fn serve<L, R, P>(bind: &str, orchestrator: RoomOrchestrator<L, R, P>) -> anyhow::Result<()>
where
    L: Launcher,
    R: Registry,
    P: StatusProbe,
{
    let server = RoomforgeServerBuilder::new()
        .bind(bind)
        .build(Arc::new(orchestrator))
        .await
        .with_context(|| format!("binding {bind}"))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.run(shutdown_rx).await?;
    info!("roomforged stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
