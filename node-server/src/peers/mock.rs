//! In-memory transport for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::replication::{MAX_SYNC_BATCH_ENTRIES, PingResponse, SyncRequest, SyncResponse};
use std::collections::HashMap;

use super::transport::{PeerTransport, TransportError};

#[derive(Debug, Clone)]
pub enum PeerBehavior {
    /// Answers as node `0`
    Up(String),
    /// Connection refused
    Down,
    /// Answers with a non-success status
    Broken(u16),
}

#[derive(Debug, Default)]
pub struct MockTransport {
    peers: Mutex<HashMap<String, PeerBehavior>>,
    pushes: Mutex<Vec<(String, SyncRequest)>>,
    pings: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peer(self, url: &str, behavior: PeerBehavior) -> Self {
        self.set(url, behavior);
        self
    }

    pub fn set(&self, url: &str, behavior: PeerBehavior) {
        self.peers.lock().insert(url.to_string(), behavior);
    }

    pub fn pushes(&self) -> Vec<(String, SyncRequest)> {
        self.pushes.lock().clone()
    }

    pub fn ping_count(&self) -> usize {
        self.pings.lock().len()
    }

    fn behavior(&self, peer: &str) -> PeerBehavior {
        self.peers
            .lock()
            .get(peer)
            .cloned()
            .unwrap_or(PeerBehavior::Down)
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn ping(&self, peer: &str) -> Result<PingResponse, TransportError> {
        self.pings.lock().push(peer.to_string());
        match self.behavior(peer) {
            PeerBehavior::Up(node) => Ok(PingResponse {
                success: true,
                message: "pong".to_string(),
                node,
            }),
            PeerBehavior::Down => Err(TransportError::Connect("connection refused".into())),
            PeerBehavior::Broken(status) => Err(TransportError::Status {
                status,
                body: "boom".into(),
            }),
        }
    }

    async fn push(&self, peer: &str, batch: &SyncRequest) -> Result<SyncResponse, TransportError> {
        self.pushes.lock().push((peer.to_string(), batch.clone()));
        match self.behavior(peer) {
            // same limit as a real sync endpoint
            PeerBehavior::Up(_) if batch.logs.len() > MAX_SYNC_BATCH_ENTRIES => {
                Err(TransportError::Status {
                    status: 413,
                    body: "batch too large".into(),
                })
            }
            PeerBehavior::Up(_) => Ok(SyncResponse {
                success: true,
                logs_processed: batch.logs.len(),
            }),
            PeerBehavior::Down => Err(TransportError::Timeout),
            PeerBehavior::Broken(status) => Err(TransportError::Status {
                status,
                body: "boom".into(),
            }),
        }
    }
}
