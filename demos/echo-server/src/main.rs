//! echo-server: the game server a Roomforge room runs.
//!
//! Two listeners:
//! - the game port accepts up to `SERVER_MAX_PLAYERS` TCP clients and
//!   relays every line any of them sends to all of them;
//! - the query port serves `GET /api/v1/status` → `{"players": n}`,
//!   which is what the reconciler probes.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use roomforge_protocol::StatusReport;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Lines buffered per player before a slow reader starts dropping.
const LINE_BUFFER: usize = 256;

/// Pause after the first failed accept; doubles up to `ACCEPT_BACKOFF_MAX`.
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "echo-server", about = "Roomforge reference game server")]
struct Config {
    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "SERVER_QUERY_PORT", default_value_t = 8080)]
    query_port: u16,

    #[arg(long, env = "SERVER_GAME_PORT", default_value_t = 6969)]
    game_port: u16,

    /// Room code, for logging only.
    #[arg(long, env = "SERVER_CODE", default_value = "")]
    code: String,

    #[arg(long, env = "SERVER_MAX_PLAYERS", default_value_t = 2)]
    max_players: u32,
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

/// Shared between the game listener and the status endpoint.
struct Hub {
    lines: broadcast::Sender<String>,
    players: Arc<AtomicU32>,
    max_players: u32,
}

/// A taken player slot. Dropping it frees the slot.
struct Seat {
    players: Arc<AtomicU32>,
}

impl Drop for Seat {
    fn drop(&mut self) {
        self.players.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Hub {
    fn new(max_players: u32) -> Self {
        let (lines, _) = broadcast::channel(LINE_BUFFER);
        Self {
            lines,
            players: Arc::new(AtomicU32::new(0)),
            max_players: max_players.max(1),
        }
    }

    fn players(&self) -> u32 {
        self.players.load(Ordering::SeqCst)
    }

    /// Takes a slot, or `None` when the room is full.
    fn try_join(&self) -> Option<Seat> {
        self.players
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_players).then_some(n + 1)
            })
            .ok()
            .map(|_| Seat {
                players: Arc::clone(&self.players),
            })
    }
}

// ---------------------------------------------------------------------------
// Game port
// ---------------------------------------------------------------------------

/// Pause between failed accepts (EMFILE and the like). Doubles on each
/// failure and resets on the next successful accept.
struct Backoff {
    next: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            next: ACCEPT_BACKOFF_MIN,
        }
    }

    /// Sleeps for the current delay and doubles it for next time.
    async fn wait(&mut self) -> Duration {
        let delay = self.next;
        tokio::time::sleep(delay).await;
        self.next = (delay * 2).min(ACCEPT_BACKOFF_MAX);
        delay
    }

    fn reset(&mut self) {
        self.next = ACCEPT_BACKOFF_MIN;
    }
}

async fn run_game(listener: TcpListener, hub: Arc<Hub>) {
    let mut backoff = Backoff::new();
    loop {
        let (mut stream, peer) = match listener.accept().await {
            Ok(conn) => {
                backoff.reset();
                conn
            }
            Err(e) => {
                let delay = backoff.wait().await;
                warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "accept failed");
                continue;
            }
        };

        let Some(seat) = hub.try_join() else {
            debug!(%peer, "room full, refusing player");
            let _ = stream.write_all(b"room is full\n").await;
            let _ = stream.shutdown().await;
            continue;
        };

        // Subscribe before the player counts as connected, so nothing
        // sent after the status endpoint reports them is missed.
        let rx = hub.lines.subscribe();
        let hub = Arc::clone(&hub);
        info!(%peer, players = hub.players(), "player joined");
        tokio::spawn(async move {
            if let Err(e) = play(stream, &hub, rx).await {
                debug!(%peer, error = %e, "player connection ended with error");
            }
            drop(seat);
            info!(%peer, players = hub.players(), "player left");
        });
    }
}

async fn play(
    stream: TcpStream,
    hub: &Hub,
    mut rx: broadcast::Receiver<String>,
) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    let _ = hub.lines.send(line);
                }
                None => return Ok(()),
            },
            relayed = rx.recv() => match relayed {
                Ok(line) => {
                    write.write_all(line.as_bytes()).await?;
                    write.write_all(b"\n").await?;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "player fell behind, lines dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Query port
// ---------------------------------------------------------------------------

fn status_router(hub: Arc<Hub>) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .with_state(hub)
}

async fn status(State(hub): State<Arc<Hub>>) -> Json<StatusReport> {
    Json(StatusReport {
        players: hub.players(),
    })
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    let hub = Arc::new(Hub::new(config.max_players));

    let game_addr: SocketAddr = format!("{}:{}", config.host, config.game_port)
        .parse()
        .context("invalid game address")?;
    let query_addr: SocketAddr = format!("{}:{}", config.host, config.query_port)
        .parse()
        .context("invalid query address")?;

    let game = TcpListener::bind(game_addr)
        .await
        .with_context(|| format!("binding game port {game_addr}"))?;
    let query = TcpListener::bind(query_addr)
        .await
        .with_context(|| format!("binding query port {query_addr}"))?;

    info!(
        code = %config.code,
        %game_addr,
        %query_addr,
        max_players = hub.max_players,
        "echo server ready"
    );

    tokio::spawn(run_game(game, Arc::clone(&hub)));
    axum::serve(query, status_router(hub))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tokio::io::AsyncReadExt;
    use tower::ServiceExt;

    use super::*;

    async fn start(max_players: u32) -> (Arc<Hub>, SocketAddr) {
        let hub = Arc::new(Hub::new(max_players));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(run_game(listener, Arc::clone(&hub)));
        (hub, addr)
    }

    async fn wait_for_players(hub: &Hub, expected: u32) {
        for _ in 0..100 {
            if hub.players() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {expected} players, have {}", hub.players());
    }

    async fn read_line(stream: &mut BufReader<TcpStream>) -> String {
        let mut line = String::new();
        tokio::time::timeout(Duration::from_secs(2), stream.read_line(&mut line))
            .await
            .expect("no line received")
            .unwrap();
        line
    }

    #[tokio::test]
    async fn test_status_reports_connected_players() {
        let (hub, addr) = start(2).await;
        let app = status_router(Arc::clone(&hub));

        let resp = app
            .clone()
            .oneshot(Request::get("/api/v1/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(resp.into_body(), 1024).await.unwrap();
        let report: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(report, serde_json::json!({ "players": 0 }));

        let _player = TcpStream::connect(addr).await.unwrap();
        wait_for_players(&hub, 1).await;

        let resp = app
            .oneshot(Request::get("/api/v1/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(resp.into_body(), 1024).await.unwrap();
        let report: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(report["players"], 1);
    }

    #[tokio::test]
    async fn test_lines_are_relayed_to_every_player() {
        let (hub, addr) = start(2).await;
        let mut alice = BufReader::new(TcpStream::connect(addr).await.unwrap());
        let mut bob = BufReader::new(TcpStream::connect(addr).await.unwrap());
        wait_for_players(&hub, 2).await;

        alice.get_mut().write_all(b"hello\n").await.unwrap();

        assert_eq!(read_line(&mut bob).await, "hello\n");
        assert_eq!(read_line(&mut alice).await, "hello\n");
    }

    #[tokio::test]
    async fn test_players_beyond_capacity_are_refused() {
        let (hub, addr) = start(1).await;
        let _first = TcpStream::connect(addr).await.unwrap();
        wait_for_players(&hub, 1).await;

        let mut second = TcpStream::connect(addr).await.unwrap();
        let mut reply = String::new();
        tokio::time::timeout(Duration::from_secs(2), second.read_to_string(&mut reply))
            .await
            .expect("refused connection was not closed")
            .unwrap();
        assert_eq!(reply, "room is full\n");
        assert_eq!(hub.players(), 1);
    }

    #[tokio::test]
    async fn test_leaving_frees_the_slot() {
        let (hub, addr) = start(1).await;
        let first = TcpStream::connect(addr).await.unwrap();
        wait_for_players(&hub, 1).await;

        drop(first);
        wait_for_players(&hub, 0).await;

        let _second = TcpStream::connect(addr).await.unwrap();
        wait_for_players(&hub, 1).await;
    }

    #[test]
    fn test_try_join_respects_capacity() {
        let hub = Hub::new(2);
        let a = hub.try_join();
        let b = hub.try_join();
        assert!(a.is_some() && b.is_some());
        assert!(hub.try_join().is_none());
        drop(a);
        assert_eq!(hub.players(), 1);
        assert!(hub.try_join().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_backoff_grows_caps_and_resets() {
        let mut backoff = Backoff::new();

        let started = tokio::time::Instant::now();
        assert_eq!(backoff.wait().await, Duration::from_millis(10));
        assert_eq!(backoff.wait().await, Duration::from_millis(20));
        assert_eq!(backoff.wait().await, Duration::from_millis(40));
        assert!(started.elapsed() >= Duration::from_millis(70));

        for _ in 0..10 {
            backoff.wait().await;
        }
        assert_eq!(backoff.wait().await, ACCEPT_BACKOFF_MAX);

        backoff.reset();
        assert_eq!(backoff.wait().await, ACCEPT_BACKOFF_MIN);
    }
}
