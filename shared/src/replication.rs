//! Replication protocol types
//!
//! Everything that crosses the wire between two nodes lives here: operation
//! log entries, liveness rows and the request/response bodies of the
//! sync, ping, nodes and replicate endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Largest batch a node accepts on its sync endpoint
pub const MAX_SYNC_BATCH_ENTRIES: usize = 1000;

/// Request body limit of the sync endpoint, in bytes
pub const MAX_SYNC_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Liveness window in milliseconds
pub const LIVENESS_WINDOW_MS: i64 = 60_000;

/// Mutation kind recorded in the operation log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One local mutation awaiting (or past) propagation
///
/// Entries are immutable once appended; only `propagated` flips, once,
/// from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationLogEntry {
    /// Monotonic id assigned by the origin node
    pub id: u64,
    /// Entity collection (clientes, productos, pedidos, ...)
    pub table: String,
    pub operation: Operation,
    pub record_id: i64,
    /// Field snapshot; an empty object for DELETE
    #[serde(default = "empty_payload")]
    pub payload: Value,
    pub origin_node: String,
    /// Unix millis of the local append
    pub created_at: i64,
    #[serde(default)]
    pub propagated: bool,
}

fn empty_payload() -> Value {
    Value::Object(Default::default())
}

/// Stored liveness status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Active,
    Inactive,
}

/// Heartbeat row for one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLiveness {
    pub node_id: String,
    pub status: NodeStatus,
    /// Unix millis of the latest heartbeat or successful probe
    pub last_seen: i64,
}

impl NodeLiveness {
    /// Active only when the stored status says so AND the row is fresh
    pub fn is_active_at(&self, now_millis: i64) -> bool {
        self.status == NodeStatus::Active && now_millis - self.last_seen <= LIVENESS_WINDOW_MS
    }
}

// ========== Wire bodies ==========

/// `POST /api/replication/sync` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub logs: Vec<OperationLogEntry>,
}

/// `POST /api/replication/sync` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub success: bool,
    pub logs_processed: usize,
}

/// `GET /api/health/ping` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub node: String,
}

/// `GET /api/health/nodes` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodesResponse {
    pub success: bool,
    pub nodes: Vec<NodeLiveness>,
    pub total_active: usize,
}

/// Outcome of pushing one batch to one peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Success,
    Failure,
}

/// Per-peer line of a dispatch report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerResult {
    pub peer: String,
    pub status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PeerResult {
    pub fn success(peer: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            status: DeliveryStatus::Success,
            error: None,
        }
    }

    pub fn failure(peer: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            status: DeliveryStatus::Failure,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == DeliveryStatus::Success
    }
}

/// `POST /api/replication/replicate` response
///
/// When nothing was pending only `success` and `message` are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_replicated: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<PeerResult>>,
}

/// Diagnostic probe status of one configured peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    /// 2xx with a parseable ping body
    Active,
    /// Answered, but not with a usable ping
    Error,
    /// Transport failure or timeout
    Inactive,
}

/// One line of `GET /api/health/replicas`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaProbe {
    pub url: String,
    pub status: ProbeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
