//! Replication API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/replication/sync | POST | 接收并应用远端批次 |
//! | /api/replication/replicate | POST | 立即执行一次 dispatch |
//! | /api/replication/logs/pending | GET | 本节点待传播的日志 |

mod handler;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use shared::replication::MAX_SYNC_BODY_BYTES;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/replication", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route(
            "/sync",
            post(handler::sync).layer(DefaultBodyLimit::max(MAX_SYNC_BODY_BYTES)),
        )
        .route("/replicate", post(handler::replicate))
        .route("/logs/pending", get(handler::pending_logs))
}
