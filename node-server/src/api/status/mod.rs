//! 节点状态路由 (只读投影)

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::index))
        .route("/api/status", get(handler::status))
        .route("/api/info", get(handler::info))
}
