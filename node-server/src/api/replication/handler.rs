//! Replication API Handlers

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Serialize;
use shared::OperationLogEntry;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::replication::{MAX_SYNC_BODY_BYTES, ReplicateResponse, SyncRequest, SyncResponse};

use crate::core::ServerState;

#[derive(Debug, Serialize)]
pub struct PendingLogsResponse {
    success: bool,
    logs: Vec<OperationLogEntry>,
    node: String,
}

/// POST /api/replication/sync - 应用远端批次
///
/// 单条失败不影响其余条目，`logs_processed` 只统计成功应用的条数。
pub async fn sync(
    State(state): State<ServerState>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> AppResult<Json<SyncResponse>> {
    let Json(request) = payload.map_err(reject_body)?;

    let receiver = state.receiver.clone();
    let report = tokio::task::spawn_blocking(move || receiver.receive(&request.logs))
        .await
        .map_err(|e| AppError::internal(format!("Sync task failed: {e}")))??;

    Ok(Json(SyncResponse {
        success: true,
        logs_processed: report.applied_count,
    }))
}

fn reject_body(rejection: JsonRejection) -> AppError {
    if rejection.status() == http::StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::new(ErrorCode::SyncBatchTooLarge).with_detail("max_bytes", MAX_SYNC_BODY_BYTES);
    }
    AppError::with_message(ErrorCode::SyncBatchInvalid, rejection.body_text())
}

/// POST /api/replication/replicate - 推送本节点待传播的日志
pub async fn replicate(State(state): State<ServerState>) -> AppResult<Json<ReplicateResponse>> {
    let report = state.dispatcher.dispatch_pending().await?;

    if report.is_empty() {
        return Ok(Json(ReplicateResponse {
            success: true,
            message: Some("No pending logs to replicate".to_string()),
            logs_replicated: None,
            results: None,
        }));
    }

    Ok(Json(ReplicateResponse {
        success: true,
        message: None,
        logs_replicated: Some(report.entries_sent),
        results: Some(report.per_peer_results),
    }))
}

/// GET /api/replication/logs/pending
pub async fn pending_logs(State(state): State<ServerState>) -> AppResult<Json<PendingLogsResponse>> {
    let logs = state.oplog.fetch_pending()?;
    Ok(Json(PendingLogsResponse {
        success: true,
        logs,
        node: state.config.node_id.clone(),
    }))
}
