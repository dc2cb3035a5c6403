//! TCP reachability probing.
//!
//! A refused or timed-out connection is the normal "not ready yet" answer and
//! is reported as `false`, never as an error.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Try a TCP handshake with `host:port`, closing the connection on success.
pub async fn can_connect(host: &str, port: u16, timeout: Duration) -> bool {
    debug!(host, port, "Testing connection");
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            drop(stream);
            debug!(host, port, "Can connect");
            true
        }
        Ok(Err(e)) => {
            debug!(host, port, error = %e, "Can't connect");
            false
        }
        Err(_) => {
            debug!(host, port, timeout_ms = timeout.as_millis() as u64, "Can't connect (timed out)");
            false
        }
    }
}

/// Answers "can I connect to this endpoint right now?".
#[async_trait]
pub trait Prober: Send + Sync {
    async fn can_connect(&self, host: &str, port: u16) -> bool;
}

/// Prober backed by real TCP connections.
#[derive(Debug, Clone)]
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn can_connect(&self, host: &str, port: u16) -> bool {
        can_connect(host, port, self.timeout).await
    }
}
