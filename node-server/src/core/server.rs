//! Server Implementation
//!
//! HTTP 服务器启动和管理

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::api;
use crate::core::{Config, Result, ServerError, ServerState};

/// HTTP Server
pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    /// Create server with existing state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    /// 运行直到收到 Ctrl+C
    pub async fn run(&self) -> Result<()> {
        let state = self.state.clone();

        let shutdown = CancellationToken::new();
        let worker = state.start_background_tasks(shutdown.clone());

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = TcpListener::bind(addr).await.map_err(ServerError::Bind)?;
        tracing::info!(
            node_id = %self.config.node_id,
            "🦀 Order node listening on {}",
            addr
        );

        let signal = shutdown.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
            signal.cancel();
        });

        serve(listener, state, shutdown).await?;

        if let Some(handle) = worker
            && let Err(e) = handle.await
        {
            tracing::error!("ReplicationWorker join failed: {e}");
        }
        Ok(())
    }
}

/// 在给定 listener 上提供 API，直到 `shutdown` 被取消
///
/// 正常退出后把本节点的存活记录标记为 inactive。
/// 集成测试用 `127.0.0.1:0` 绑定后直接调用。
pub async fn serve(listener: TcpListener, state: ServerState, shutdown: CancellationToken) -> Result<()> {
    let app = api::build_router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(ServerError::Serve)?;

    if let Err(e) = state.liveness.mark_inactive(state.node_id()) {
        tracing::warn!(node_id = %state.node_id(), "Failed to mark node inactive on shutdown: {e}");
    }
    Ok(())
}
