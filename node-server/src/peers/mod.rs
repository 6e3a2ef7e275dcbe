//! 对等节点目录与负载均衡
//!
//! - [`PeerDirectory`] - 静态对等列表、探活、按策略选择可达节点
//! - [`SelectionPolicy`] - 可插拔选择策略 (random / round_robin)
//! - [`PeerTransport`] - 出站调用抽象，[`HttpTransport`] 为 reqwest 实现

pub mod directory;
pub mod policy;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use directory::PeerDirectory;
pub use policy::{RandomPolicy, RoundRobinPolicy, SelectionPolicy, create_policy};
pub use transport::{HttpTransport, PeerTransport, TransportError};
