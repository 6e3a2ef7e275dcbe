//! Peer directory and load balancer
//!
//! Holds the static peer list and answers reachability questions by probing
//! peers' ping endpoint at call time. Nothing is cached between calls.

use std::sync::Arc;

use shared::replication::{ProbeStatus, ReplicaProbe};

use super::policy::SelectionPolicy;
use super::transport::PeerTransport;
use crate::liveness::LivenessMonitor;

pub struct PeerDirectory {
    peers: Vec<String>,
    transport: Arc<dyn PeerTransport>,
    policy: Arc<dyn SelectionPolicy>,
    liveness: LivenessMonitor,
}

impl std::fmt::Debug for PeerDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerDirectory")
            .field("peers", &self.peers)
            .field("policy", &self.policy.name())
            .finish()
    }
}

impl PeerDirectory {
    pub fn new(
        peers: Vec<String>,
        transport: Arc<dyn PeerTransport>,
        policy: Arc<dyn SelectionPolicy>,
        liveness: LivenessMonitor,
    ) -> Self {
        Self {
            peers,
            transport,
            policy,
            liveness,
        }
    }

    /// Configured peer URLs
    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Bounded reachability check, never fails
    ///
    /// A successful probe also records a heartbeat for the node id the peer
    /// reported about itself.
    pub async fn probe(&self, peer: &str) -> bool {
        match self.transport.ping(peer).await {
            Ok(ping) => {
                if let Err(e) = self.liveness.heartbeat(&ping.node) {
                    tracing::warn!(peer = %peer, node = %ping.node, "Failed to record peer heartbeat: {e}");
                }
                true
            }
            Err(e) => {
                tracing::debug!(peer = %peer, "Probe failed: {e}");
                false
            }
        }
    }

    /// Peers answering a probe right now, in configured order
    pub async fn active_peers(&self) -> Vec<String> {
        let mut active = Vec::with_capacity(self.peers.len());
        for peer in &self.peers {
            if self.probe(peer).await {
                active.push(peer.clone());
            }
        }
        active
    }

    /// Pick one reachable peer with the configured policy
    pub async fn select_peer(&self) -> Option<String> {
        let active = self.active_peers().await;
        let index = self.policy.select(&active)?;
        active.get(index).cloned()
    }

    /// Probe every configured peer and describe the outcome
    ///
    /// Diagnostic only: liveness rows are not written.
    pub async fn probe_all_diagnostic(&self) -> Vec<ReplicaProbe> {
        let mut results = Vec::with_capacity(self.peers.len());
        for peer in &self.peers {
            let probe = match self.transport.ping(peer).await {
                Ok(ping) => ReplicaProbe {
                    url: peer.clone(),
                    status: ProbeStatus::Active,
                    node: Some(ping.node),
                    message: None,
                },
                Err(e) if e.peer_responded() => ReplicaProbe {
                    url: peer.clone(),
                    status: ProbeStatus::Error,
                    node: None,
                    message: Some(format!("Invalid response: {e}")),
                },
                Err(e) => ReplicaProbe {
                    url: peer.clone(),
                    status: ProbeStatus::Inactive,
                    node: None,
                    message: Some(e.to_string()),
                },
            };
            results.push(probe);
        }
        results
    }
}
