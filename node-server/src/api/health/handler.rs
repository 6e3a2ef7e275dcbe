//! Health API Handlers

use axum::{Json, extract::State};
use serde::Serialize;
use shared::error::AppResult;
use shared::replication::{NodesResponse, PingResponse, ReplicaProbe};

use crate::core::ServerState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    success: bool,
    node: String,
    status: &'static str,
    port: u16,
}

#[derive(Debug, Serialize)]
pub struct ReplicasResponse {
    success: bool,
    replicas: Vec<ReplicaProbe>,
    current_node: String,
}

/// GET /api/health - 记录本节点心跳
///
/// 外部健康探测驱动本节点的存活行
pub async fn health(State(state): State<ServerState>) -> AppResult<Json<HealthResponse>> {
    state.liveness.heartbeat(state.node_id())?;
    Ok(Json(HealthResponse {
        success: true,
        node: state.config.node_id.clone(),
        status: "active",
        port: state.config.http_port,
    }))
}

/// GET /api/health/ping
pub async fn ping(State(state): State<ServerState>) -> Json<PingResponse> {
    Json(PingResponse {
        success: true,
        message: "pong".to_string(),
        node: state.config.node_id.clone(),
    })
}

/// GET /api/health/nodes
pub async fn nodes(State(state): State<ServerState>) -> AppResult<Json<NodesResponse>> {
    let nodes = state.liveness.active_entries()?;
    Ok(Json(NodesResponse {
        success: true,
        total_active: nodes.len(),
        nodes,
    }))
}

/// GET /api/health/replicas - 不写存活状态
pub async fn replicas(State(state): State<ServerState>) -> Json<ReplicasResponse> {
    Json(ReplicasResponse {
        success: true,
        replicas: state.peers.probe_all_diagnostic().await,
        current_node: state.config.node_id.clone(),
    })
}
