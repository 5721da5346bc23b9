//! Docker launcher implementation using the `docker` CLI.

use std::process::Output;

use roomforge_protocol::{Endpoint, RoomCode};
use tokio::process::Command;

use crate::{allocate_ports, LaunchError, Launcher};

/// Settings for [`DockerLauncher`].
#[derive(Debug, Clone)]
pub struct DockerConfig {
    /// Path or name of the docker binary.
    pub docker_bin: String,
    /// Address recorded for players and probes to reach published ports.
    pub advertise_address: String,
    /// Port the game server serves its status endpoint on inside the container.
    pub query_container_port: u16,
    /// Port the game server accepts players on inside the container.
    pub game_container_port: u16,
    /// Extra arguments inserted after `docker run -d`, e.g. `--network`.
    pub extra_args: Vec<String>,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            docker_bin: "docker".to_string(),
            advertise_address: "127.0.0.1".to_string(),
            query_container_port: 8080,
            game_container_port: 6969,
            extra_args: Vec::new(),
        }
    }
}

/// Runs each room as a detached container named after its code.
///
/// The host ports are picked by [`allocate_ports`] and published onto the
/// container's fixed internal ports. The container receives its capacity
/// and code through `SERVER_MAX_PLAYERS` and `SERVER_CODE`.
#[derive(Debug, Clone, Default)]
pub struct DockerLauncher {
    config: DockerConfig,
}

impl DockerConfig {
    /// Replace unusable values with the defaults.
    ///
    /// - An empty `docker_bin` becomes `docker`.
    /// - An empty `advertise_address` becomes `127.0.0.1`.
    /// - Equal container ports are rejected in favour of the defaults.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.docker_bin.trim().is_empty() {
            tracing::warn!("docker_bin is empty, using `docker`");
            self.docker_bin = defaults.docker_bin;
        }
        if self.advertise_address.trim().is_empty() {
            tracing::warn!("advertise_address is empty, using 127.0.0.1");
            self.advertise_address = defaults.advertise_address;
        }
        if self.query_container_port == self.game_container_port {
            tracing::warn!(
                port = self.query_container_port,
                "query and game container ports collide, using defaults"
            );
            self.query_container_port = defaults.query_container_port;
            self.game_container_port = defaults.game_container_port;
        }
        self
    }
}

impl DockerLauncher {
    /// Creates a launcher. `config` is validated first.
    pub fn new(config: DockerConfig) -> Self {
        Self {
            config: config.validated(),
        }
    }

    pub fn config(&self) -> &DockerConfig {
        &self.config
    }

    /// Arguments for `docker run`.
    pub(crate) fn run_args(
        &self,
        code: &RoomCode,
        max_players: u32,
        image: &str,
        query_port: u16,
        game_port: u16,
    ) -> Vec<String> {
        let mut args = vec!["run".to_string(), "-d".to_string(), "--rm".to_string()];
        args.extend(self.config.extra_args.iter().cloned());
        args.extend([
            "-e".to_string(),
            format!("SERVER_MAX_PLAYERS={max_players}"),
            "-e".to_string(),
            format!("SERVER_CODE={code}"),
            "-p".to_string(),
            format!("{query_port}:{}", self.config.query_container_port),
            "-p".to_string(),
            format!("{game_port}:{}", self.config.game_container_port),
            "--name".to_string(),
            code.to_string(),
            image.to_string(),
        ]);
        args
    }

    async fn docker(&self, args: &[String]) -> std::io::Result<Output> {
        tracing::debug!(bin = %self.config.docker_bin, ?args, "running docker");
        Command::new(&self.config.docker_bin)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
    }
}

impl Launcher for DockerLauncher {
    async fn spawn(
        &self,
        code: &RoomCode,
        max_players: u32,
        image: &str,
    ) -> Result<Endpoint, LaunchError> {
        let (query_port, game_port) = allocate_ports().await?;
        let args = self.run_args(code, max_players, image, query_port, game_port);

        let output = self
            .docker(&args)
            .await
            .map_err(|e| LaunchError::Spawn(format!("could not run docker: {e}")))?;

        if !output.status.success() {
            return Err(LaunchError::Spawn(stderr_of(&output)));
        }

        tracing::info!(%code, image, query_port, game_port, "container started");
        Ok(Endpoint::new(
            self.config.advertise_address.clone(),
            query_port,
            game_port,
        ))
    }

    async fn destroy(&self, code: &RoomCode) -> Result<(), LaunchError> {
        let args = ["kill".to_string(), code.to_string()];
        let output = self
            .docker(&args)
            .await
            .map_err(|e| LaunchError::Destroy(format!("could not run docker: {e}")))?;

        if output.status.success() {
            tracing::info!(%code, "container killed");
            return Ok(());
        }

        let stderr = stderr_of(&output);
        if is_already_gone(&stderr) {
            tracing::debug!(%code, "container already gone");
            return Ok(());
        }
        Err(LaunchError::Destroy(stderr))
    }
}

fn stderr_of(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("docker exited with {}", output.status)
    } else {
        stderr
    }
}

/// Docker's wording for "there is nothing to kill".
fn is_already_gone(stderr: &str) -> bool {
    stderr.contains("No such container") || stderr.contains("is not running")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> RoomCode {
        RoomCode::parse("aBcDeF").unwrap()
    }

    #[test]
    fn test_run_args_publish_ports_and_pass_env() {
        let launcher = DockerLauncher::default();
        let args = launcher.run_args(&code(), 4, "echo-server", 40001, 40002);
        assert_eq!(
            args,
            vec![
                "run", "-d", "--rm",
                "-e", "SERVER_MAX_PLAYERS=4",
                "-e", "SERVER_CODE=aBcDeF",
                "-p", "40001:8080",
                "-p", "40002:6969",
                "--name", "aBcDeF",
                "echo-server",
            ]
        );
    }

    #[test]
    fn test_validated_fills_empty_values() {
        let config = DockerConfig {
            docker_bin: " ".into(),
            advertise_address: String::new(),
            query_container_port: 7000,
            game_container_port: 7000,
            extra_args: Vec::new(),
        }
        .validated();
        assert_eq!(config.docker_bin, "docker");
        assert_eq!(config.advertise_address, "127.0.0.1");
        assert_eq!(config.query_container_port, 8080);
        assert_eq!(config.game_container_port, 6969);
    }

    #[test]
    fn test_run_args_places_extra_args_before_image() {
        let launcher = DockerLauncher::new(DockerConfig {
            extra_args: vec!["--network".into(), "games".into()],
            ..DockerConfig::default()
        });
        let args = launcher.run_args(&code(), 2, "img", 1, 2);
        assert_eq!(&args[3..5], &["--network".to_string(), "games".to_string()]);
        assert_eq!(args.last().map(String::as_str), Some("img"));
    }

    #[test]
    fn test_already_gone_detection() {
        assert!(is_already_gone(
            "Error response from daemon: No such container: aBcDeF"
        ));
        assert!(is_already_gone(
            "Error response from daemon: Cannot kill container: aBcDeF: Container abc is not running"
        ));
        assert!(!is_already_gone("permission denied"));
    }

    #[tokio::test]
    async fn test_spawn_with_missing_binary_is_spawn_error() {
        let launcher = DockerLauncher::new(DockerConfig {
            docker_bin: "/nonexistent/roomforge-docker".into(),
            ..DockerConfig::default()
        });
        let err = launcher.spawn(&code(), 2, "img").await.unwrap_err();
        assert!(matches!(err, LaunchError::Spawn(_)));
    }

    #[tokio::test]
    async fn test_destroy_with_missing_binary_is_destroy_error() {
        let launcher = DockerLauncher::new(DockerConfig {
            docker_bin: "/nonexistent/roomforge-docker".into(),
            ..DockerConfig::default()
        });
        let err = launcher.destroy(&code()).await.unwrap_err();
        assert!(matches!(err, LaunchError::Destroy(_)));
    }
}
