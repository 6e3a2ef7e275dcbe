//! Order Node - 订单系统多节点复制与存活子系统
//!
//! # 架构概述
//!
//! 每个节点拥有独立的本地存储，节点之间通过异步的操作日志复制保持最终一致：
//!
//! - **操作日志** (`replication`): 本地变更的持久化日志与 dispatch/receive
//! - **存活监控** (`liveness`): 心跳时间戳与 60 秒窗口内的活跃集合
//! - **对等节点** (`peers`): 静态对等列表、探活、负载均衡选择
//! - **存储** (`storage`): 嵌入式 redb (日志、存活行、领域记录)
//! - **HTTP API** (`api`): 节点间协议与诊断接口
//!
//! # 模块结构
//!
//! ```text
//! node-server/src/
//! ├── core/          # 配置、状态、服务器、时钟
//! ├── api/           # HTTP 路由和处理器
//! ├── liveness/      # 存活监控
//! ├── peers/         # 对等节点目录、选择策略、出站传输
//! ├── replication/   # 操作日志、dispatcher、receiver、worker
//! ├── storage/       # redb 存储层
//! ├── mutations.rs   # 本地变更入口
//! └── utils/         # 日志
//! ```

pub mod api;
pub mod core;
pub mod liveness;
pub mod mutations;
pub mod peers;
pub mod replication;
pub mod storage;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerState};
pub use mutations::LocalMutations;
pub use replication::{Dispatcher, OperationLog, SyncReceiver};

// Re-export logger functions
pub use utils::logger::init_logger_with_file;

/// 设置运行环境：加载 .env、读取配置、初始化日志
///
/// 返回的 guard 需要在进程生命周期内保持存活 (文件日志刷新)。
pub fn setup_environment() -> (Config, Option<tracing_appender::non_blocking::WorkerGuard>) {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    let guard = init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    (config, guard)
}

pub fn print_banner(config: &Config) {
    println!(
        r#"
   ____          __             _   __          __
  / __ \_________/ /__  _____   / | / /___  ____/ /__
 / / / / ___/ __  / _ \/ ___/  /  |/ / __ \/ __  / _ \
/ /_/ / /  / /_/ /  __/ /     / /|  / /_/ / /_/ /  __/
\____/_/   \__,_/\___/_/     /_/ |_/\____/\__,_/\___/

    Node:        {}
    Port:        {}
    Replication: {}
    Peers:       {}
    "#,
        config.node_id,
        config.http_port,
        if config.replica_enabled { "enabled" } else { "disabled" },
        config.replica_nodes.len()
    );
}
