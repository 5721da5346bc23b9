//! HTTP status probe.
//!
//! Game-server instances answer `GET /api/v1/status` on their query port
//! with `{"players": n}`. Each probe opens a fresh HTTP/1.1 connection.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use roomforge_protocol::{Endpoint, StatusReport};
use tokio::net::TcpStream;

use crate::{ProbeError, StatusProbe};

/// Path of the status endpoint on every instance.
pub const STATUS_PATH: &str = "/api/v1/status";

/// [`StatusProbe`] that speaks HTTP to the instance's query port.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl StatusProbe for HttpProbe {
    async fn probe(&self, endpoint: &Endpoint) -> Result<StatusReport, ProbeError> {
        let address = endpoint.query_addr();
        match tokio::time::timeout(self.timeout, fetch_status(&address)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(%address, "status probe timed out");
                Err(ProbeError::Timeout)
            }
        }
    }
}

async fn fetch_status(address: &str) -> Result<StatusReport, ProbeError> {
    let uri = format!("http://{address}{STATUS_PATH}");

    let stream = TcpStream::connect(address)
        .await
        .map_err(|e| ProbeError::Unreachable(e.to_string()))?;

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| ProbeError::Unreachable(e.to_string()))?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = http::Request::builder()
        .method("GET")
        .uri(&uri)
        .header("host", address)
        .header("user-agent", "roomforge-probe/0.1")
        .body(Empty::<Bytes>::new())
        .map_err(|e| ProbeError::Unreachable(e.to_string()))?;

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| ProbeError::Unreachable(e.to_string()))?;

    if !resp.status().is_success() {
        tracing::debug!(status = %resp.status(), %uri, "status probe non-2xx");
        return Err(ProbeError::Status(resp.status().as_u16()));
    }

    let body = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| ProbeError::Unreachable(e.to_string()))?
        .to_bytes();

    serde_json::from_slice(&body).map_err(|e| ProbeError::Decode(e.to_string()))
}
