//! Status API Handlers

use axum::{Json, extract::State};
use serde::Serialize;
use shared::error::AppResult;
use shared::replication::ReplicaProbe;

use crate::core::ServerState;
use crate::storage::StorageStats;

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    message: &'static str,
    status: &'static str,
    node: String,
    port: u16,
    replication_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    success: bool,
    node: String,
    status: &'static str,
    active_nodes: usize,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    success: bool,
    node: String,
    port: u16,
    replication_enabled: bool,
    peer_selection: &'static str,
    configured_peers: usize,
    peers: Vec<String>,
    active_nodes: Vec<String>,
    pending_logs: usize,
    replicas: Vec<ReplicaProbe>,
    storage: StorageStats,
}

/// GET /
pub async fn index(State(state): State<ServerState>) -> Json<IndexResponse> {
    Json(IndexResponse {
        message: "Order node API v1.0",
        status: "running",
        node: state.config.node_id.clone(),
        port: state.config.http_port,
        replication_enabled: state.config.replica_enabled,
    })
}

/// GET /api/status
pub async fn status(State(state): State<ServerState>) -> AppResult<Json<StatusResponse>> {
    let active = state.liveness.active_nodes()?;
    Ok(Json(StatusResponse {
        success: true,
        node: state.config.node_id.clone(),
        status: "active",
        active_nodes: active.len(),
    }))
}

/// GET /api/info - 节点详细信息
///
/// 包含对每个对等节点的诊断探测，耗时受探活超时约束
pub async fn info(State(state): State<ServerState>) -> AppResult<Json<InfoResponse>> {
    let active_nodes: Vec<String> = state.liveness.active_nodes()?.into_iter().collect();
    let pending_logs = state.oplog.fetch_pending()?.len();
    let storage = state.storage.get_stats()?;
    let replicas = state.peers.probe_all_diagnostic().await;

    Ok(Json(InfoResponse {
        success: true,
        node: state.config.node_id.clone(),
        port: state.config.http_port,
        replication_enabled: state.config.replica_enabled,
        peer_selection: state.peers.policy_name(),
        configured_peers: state.peers.peers().len(),
        peers: state.peers.peers().to_vec(),
        active_nodes,
        pending_logs,
        replicas,
        storage,
    }))
}
