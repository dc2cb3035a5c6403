//! The master's rendezvous socket.
//!
//! Workers never exchange data with it; they only check whether it accepts
//! connections. It is reachable from the moment the master starts MPI until
//! the listener is closed after MPI exits.

use crate::error::TrainingResult;
use smchainer_core::Host;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct RendezvousListener {
    address: SocketAddr,
    task: JoinHandle<()>,
}

impl RendezvousListener {
    /// Bind `host:port` and serve accepts on a background task.
    pub async fn open(host: &Host, port: u16) -> TrainingResult<Self> {
        let listener = TcpListener::bind((host.as_str(), port)).await?;
        let address = listener.local_addr()?;
        info!(address = %address, "Rendezvous socket listening");

        let task = tokio::spawn(serve(listener));
        Ok(Self { address, task })
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Stop accepting and release the port.
    pub async fn close(mut self) {
        self.task.abort();
        // Wait for the aborted task so the listener is dropped before returning.
        let _ = (&mut self.task).await;
    }
}

impl Drop for RendezvousListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Accept and immediately drop connections; the payload is never read.
///
/// Accepting keeps the backlog from filling up, which would make a long MPI
/// run look finished to workers that keep probing.
async fn serve(listener: TcpListener) {
    let mut accepted: u64 = 0;
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                accepted += 1;
                if accepted == 1 {
                    info!(peer = %peer, "First worker saw the rendezvous socket");
                } else {
                    debug!(peer = %peer, accepted, "Rendezvous probe");
                }
                drop(stream);
            }
            Err(e) => {
                warn!(error = %e, "Rendezvous accept failed");
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}
