//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 心跳、探活、活跃节点、对等节点诊断
//! - [`replication`] - 同步接收、手动复制、待传播日志
//! - [`status`] - 节点状态与信息

pub mod health;
pub mod replication;
pub mod status;

use axum::{Router, middleware};
use shared::error::AppError;
use tower_http::cors::CorsLayer;

use crate::core::ServerState;

/// HTTP 请求日志中间件
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let status = response.status();

    tracing::info!(target: "http_access", "{} {} {}", method, uri, status);

    response
}

async fn not_found() -> AppError {
    AppError::not_found("Endpoint")
}

/// Build the Axum router (without state)
pub fn build_app() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(status::router())
        .merge(health::router())
        .merge(replication::router())
        .fallback(not_found)
}

/// 组装完整的应用 (状态 + 中间件)
pub fn build_router(state: ServerState) -> Router {
    build_app()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(log_request))
}
