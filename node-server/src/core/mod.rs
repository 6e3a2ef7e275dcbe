//! 核心模块 - 节点配置、状态和服务器
//!
//! # 模块结构
//!
//! - [`Config`] - 节点配置
//! - [`ServerState`] - 共享状态 (存储、存活、对等节点、复制)
//! - [`Server`] - HTTP 服务器
//! - [`ServerError`] - 启动/运行错误
//! - [`Clock`] - 可注入的时间源

pub mod clock;
pub mod config;
pub mod error;
pub mod server;
pub mod state;

#[cfg(test)]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use config::{Config, PeerSelection};
pub use error::{Result, ServerError};
pub use server::{Server, serve};
pub use state::ServerState;
