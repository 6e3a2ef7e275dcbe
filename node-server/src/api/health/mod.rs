//! 健康检查路由
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/health | GET | 本节点心跳 + 状态 |
//! | /api/health/ping | GET | 对等节点探活 |
//! | /api/health/nodes | GET | 窗口内活跃的节点 |
//! | /api/health/replicas | GET | 逐个探测配置的对等节点 (诊断用) |
//!
//! # 响应示例
//!
//! ```json
//! { "success": true, "message": "pong", "node": "nodo1" }
//! ```

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/health", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::health))
        .route("/ping", get(handler::ping))
        .route("/nodes", get(handler::nodes))
        .route("/replicas", get(handler::replicas))
}
