//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use roomforge::prelude::{DockerConfig, OrchestratorConfig, ReconcileConfig};

/// Which compute backend rooms run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// One container per room, driven through the docker CLI.
    Docker,
    /// In-process fake instances. Nothing is actually started.
    Memory,
}

#[derive(Debug, Parser)]
#[command(name = "roomforged", about = "Roomforge daemon", version)]
pub struct Cli {
    /// Address the HTTP API listens on.
    #[arg(long, env = "ROOMFORGE_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    #[arg(long, env = "ROOMFORGE_BACKEND", value_enum, default_value_t = Backend::Docker)]
    pub backend: Backend,

    /// Directory holding the room registry.
    #[arg(long, env = "ROOMFORGE_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Seconds between reconciliation sweeps.
    #[arg(long, env = "ROOMFORGE_RECONCILE_INTERVAL_SECS", default_value_t = 60)]
    pub reconcile_interval_secs: u64,

    #[arg(long, env = "ROOMFORGE_PROBE_TIMEOUT_MS", default_value_t = 2000)]
    pub probe_timeout_ms: u64,

    #[arg(long, env = "ROOMFORGE_DESTROY_TIMEOUT_MS", default_value_t = 10_000)]
    pub destroy_timeout_ms: u64,

    /// Address recorded in rooms, where players and probes reach instances.
    #[arg(long, env = "ROOMFORGE_ADVERTISE_ADDRESS", default_value = "127.0.0.1")]
    pub advertise_address: String,

    #[arg(long, env = "ROOMFORGE_DOCKER_BIN", default_value = "docker")]
    pub docker_bin: String,

    #[arg(long, env = "ROOMFORGE_CODE_LENGTH", default_value_t = 6)]
    pub code_length: usize,
}

impl Cli {
    /// Location of the redb registry file.
    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("rooms.redb")
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let destroy_timeout = Duration::from_millis(self.destroy_timeout_ms);
        OrchestratorConfig {
            code_length: self.code_length,
            destroy_timeout,
            reconcile: ReconcileConfig {
                interval: Duration::from_secs(self.reconcile_interval_secs),
                probe_timeout: self.probe_timeout(),
                destroy_timeout,
                run_on_start: false,
            },
            ..Default::default()
        }
    }

    pub fn docker_config(&self) -> DockerConfig {
        DockerConfig {
            docker_bin: self.docker_bin.clone(),
            advertise_address: self.advertise_address.clone(),
            ..Default::default()
        }
    }
}
