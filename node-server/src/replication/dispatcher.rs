//! Replication dispatcher
//!
//! One cycle = fetch pending entries, push them once to every configured
//! peer (reachable or not), then mark every dispatched entry propagated
//! regardless of the per-peer outcomes.
//!
//! A backlog larger than [`MAX_SYNC_BATCH_ENTRIES`] goes out as consecutive
//! sync requests of at most that many entries, oldest first. A peer counts
//! as delivered only when every chunk was accepted; its first failed chunk
//! ends the attempt for that peer.

use std::sync::Arc;

use serde::Serialize;
use shared::replication::{MAX_SYNC_BATCH_ENTRIES, PeerResult, SyncRequest};
use tokio::sync::Mutex;

use super::{OperationLog, ReplicationError, ReplicationResult};
use crate::peers::PeerTransport;

/// Outcome of one dispatch cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub entries_sent: usize,
    pub per_peer_results: Vec<PeerResult>,
}

impl DispatchReport {
    /// Nothing was pending
    pub fn is_empty(&self) -> bool {
        self.entries_sent == 0
    }

    pub fn successes(&self) -> usize {
        self.per_peer_results.iter().filter(|r| r.is_success()).count()
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    log: OperationLog,
    peers: Vec<String>,
    transport: Arc<dyn PeerTransport>,
    // one cycle at a time
    cycle: Arc<Mutex<()>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("node_id", &self.log.node_id())
            .field("peers", &self.peers)
            .finish()
    }
}

impl Dispatcher {
    pub fn new(log: OperationLog, peers: Vec<String>, transport: Arc<dyn PeerTransport>) -> Self {
        Self {
            log,
            peers,
            transport,
            cycle: Arc::new(Mutex::new(())),
        }
    }

    /// Run one dispatch cycle
    ///
    /// Per-peer transport failures end up in the report, never in `Err`.
    /// `Err` means replication is disabled or the local store failed.
    pub async fn dispatch_pending(&self) -> ReplicationResult<DispatchReport> {
        if !self.log.is_enabled() {
            return Err(ReplicationError::Disabled);
        }

        let _guard = self.cycle.lock().await;

        let pending = self.log.fetch_pending()?;
        if pending.is_empty() {
            tracing::debug!("No pending log entries to dispatch");
            return Ok(DispatchReport::default());
        }

        let entry_ids: Vec<u64> = pending.iter().map(|e| e.id).collect();
        let batches: Vec<SyncRequest> = pending
            .chunks(MAX_SYNC_BATCH_ENTRIES)
            .map(|chunk| SyncRequest {
                logs: chunk.to_vec(),
            })
            .collect();

        let mut results = Vec::with_capacity(self.peers.len());
        for peer in &self.peers {
            let result = self.push_all(peer, &batches).await;
            if let Some(error) = &result.error {
                tracing::warn!(peer = %peer, entries = entry_ids.len(), "Replication to peer failed: {error}");
            }
            results.push(result);
        }

        self.log.mark_all_propagated(&entry_ids)?;

        let report = DispatchReport {
            entries_sent: entry_ids.len(),
            per_peer_results: results,
        };
        tracing::info!(
            entries = report.entries_sent,
            peers = self.peers.len(),
            delivered = report.successes(),
            "Dispatch cycle completed"
        );
        Ok(report)
    }

    /// Push every chunk to one peer, stopping at the first rejected one
    async fn push_all(&self, peer: &str, batches: &[SyncRequest]) -> PeerResult {
        let mut processed = 0;
        for (index, batch) in batches.iter().enumerate() {
            match self.transport.push(peer, batch).await {
                Ok(response) if response.success => processed += response.logs_processed,
                Ok(_) => {
                    return PeerResult::failure(
                        peer,
                        chunk_error(index, batches, "peer reported success=false"),
                    );
                }
                Err(e) => return PeerResult::failure(peer, chunk_error(index, batches, e)),
            }
        }
        tracing::debug!(peer = %peer, requests = batches.len(), logs_processed = processed, "Batch delivered");
        PeerResult::success(peer)
    }
}

/// Single-request cycles keep the bare error text
fn chunk_error(index: usize, batches: &[SyncRequest], error: impl std::fmt::Display) -> String {
    if batches.len() == 1 {
        return error.to_string();
    }
    let first_id = batches[index].logs.first().map(|e| e.id).unwrap_or_default();
    format!("request {} of {} (from entry {first_id}): {error}", index + 1, batches.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SystemClock;
    use crate::peers::mock::{MockTransport, PeerBehavior};
    use crate::storage::NodeStorage;
    use serde_json::json;
    use shared::Operation;
    use shared::replication::DeliveryStatus;

    const A: &str = "http://node-a:5001";
    const B: &str = "http://node-b:5002";

    fn setup(enabled: bool, transport: Arc<MockTransport>) -> (Dispatcher, OperationLog) {
        let storage = NodeStorage::open_in_memory().unwrap();
        let log = OperationLog::new(storage, "nodo1", enabled, Arc::new(SystemClock));
        let dispatcher = Dispatcher::new(
            log.clone(),
            vec![A.to_string(), B.to_string()],
            transport,
        );
        (dispatcher, log)
    }

    #[tokio::test]
    async fn test_one_reachable_one_not() {
        let transport = Arc::new(MockTransport::new().with_peer(A, PeerBehavior::Up("nodo2".into())));
        let (dispatcher, log) = setup(true, transport.clone());

        let first = log
            .append("clientes", Operation::Insert, 1, json!({"nombre": "Ana"}))
            .unwrap()
            .unwrap();
        let second = log
            .append("clientes", Operation::Update, 1, json!({"nombre": "Ana M."}))
            .unwrap()
            .unwrap();

        let report = dispatcher.dispatch_pending().await.unwrap();

        assert_eq!(report.entries_sent, 2);
        assert_eq!(report.per_peer_results.len(), 2);
        assert_eq!(report.per_peer_results[0].peer, A);
        assert_eq!(report.per_peer_results[0].status, DeliveryStatus::Success);
        assert_eq!(report.per_peer_results[1].peer, B);
        assert_eq!(report.per_peer_results[1].status, DeliveryStatus::Failure);
        assert!(report.per_peer_results[1].error.is_some());

        assert!(log.get(first).unwrap().unwrap().propagated);
        assert!(log.get(second).unwrap().unwrap().propagated);
        assert!(log.fetch_pending().unwrap().is_empty());

        // unreachable peer was still attempted, with the whole batch
        let pushes = transport.pushes();
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[1].0, B);
        assert_eq!(pushes[1].1.logs.len(), 2);
    }

    #[tokio::test]
    async fn test_backlog_above_limit_is_split_per_peer() {
        let transport = Arc::new(MockTransport::new().with_peer(A, PeerBehavior::Up("nodo2".into())));
        let (dispatcher, log) = setup(true, transport.clone());

        let total = MAX_SYNC_BATCH_ENTRIES + 1;
        for i in 0..total {
            log.append("clientes", Operation::Insert, i as i64, json!({"n": i}))
                .unwrap();
        }

        let report = dispatcher.dispatch_pending().await.unwrap();
        assert_eq!(report.entries_sent, total);
        assert_eq!(report.per_peer_results[0].status, DeliveryStatus::Success);
        assert_eq!(report.per_peer_results[1].status, DeliveryStatus::Failure);
        // B fails on its first request and is not retried with the rest
        assert!(
            report.per_peer_results[1]
                .error
                .as_deref()
                .unwrap()
                .starts_with("request 1 of 2")
        );

        let pushes = transport.pushes();
        let to_a: Vec<&SyncRequest> = pushes.iter().filter(|(p, _)| p == A).map(|(_, b)| b).collect();
        assert_eq!(to_a.len(), 2);
        assert_eq!(to_a[0].logs.len(), MAX_SYNC_BATCH_ENTRIES);
        assert_eq!(to_a[1].logs.len(), 1);
        // oldest first, nothing sent twice
        assert!(to_a[0].logs.last().unwrap().id < to_a[1].logs[0].id);
        assert_eq!(pushes.iter().filter(|(p, _)| p == B).count(), 1);

        assert!(log.fetch_pending().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_log_returns_empty_report() {
        let transport = Arc::new(MockTransport::new());
        let (dispatcher, _log) = setup(true, transport.clone());

        let report = dispatcher.dispatch_pending().await.unwrap();
        assert!(report.is_empty());
        assert!(report.per_peer_results.is_empty());
        assert!(transport.pushes().is_empty());
    }

    #[tokio::test]
    async fn test_missed_peer_does_not_get_entries_later() {
        let transport = Arc::new(MockTransport::new().with_peer(A, PeerBehavior::Up("nodo2".into())));
        let (dispatcher, log) = setup(true, transport.clone());

        log.append("productos", Operation::Insert, 3, json!({"precio": 10}))
            .unwrap();
        dispatcher.dispatch_pending().await.unwrap();

        transport.set(B, PeerBehavior::Up("nodo3".into()));
        let report = dispatcher.dispatch_pending().await.unwrap();
        assert!(report.is_empty());
        assert_eq!(transport.pushes().len(), 2);
    }

    #[tokio::test]
    async fn test_only_local_origin_entries_are_sent() {
        let transport = Arc::new(MockTransport::new().with_peer(A, PeerBehavior::Up("nodo2".into())));
        let (dispatcher, log) = setup(true, transport.clone());

        log.append("pedidos", Operation::Insert, 1, json!({"total": 5}))
            .unwrap();
        dispatcher.dispatch_pending().await.unwrap();

        for (_, batch) in transport.pushes() {
            assert!(batch.logs.iter().all(|e| e.origin_node == "nodo1"));
        }
    }

    #[tokio::test]
    async fn test_disabled_replication_refuses_dispatch() {
        let transport = Arc::new(MockTransport::new());
        let (dispatcher, _log) = setup(false, transport);

        assert!(matches!(
            dispatcher.dispatch_pending().await,
            Err(ReplicationError::Disabled)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_cycles_send_each_entry_once() {
        let transport = Arc::new(MockTransport::new().with_peer(A, PeerBehavior::Up("nodo2".into())));
        let (dispatcher, log) = setup(true, transport.clone());

        log.append("clientes", Operation::Insert, 1, json!({})).unwrap();

        let (r1, r2) = tokio::join!(dispatcher.dispatch_pending(), dispatcher.dispatch_pending());
        let sent = r1.unwrap().entries_sent + r2.unwrap().entries_sent;
        assert_eq!(sent, 1);
    }
}
