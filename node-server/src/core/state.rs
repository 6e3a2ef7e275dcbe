use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::{Clock, Config, Result, SystemClock};
use crate::liveness::LivenessMonitor;
use crate::mutations::LocalMutations;
use crate::peers::{HttpTransport, PeerDirectory, PeerTransport, SelectionPolicy, create_policy};
use crate::replication::{Dispatcher, OperationLog, ReplicationWorker, SyncReceiver};
use crate::storage::NodeStorage;

/// 节点状态 - 持有所有组件的共享引用
///
/// 所有字段都是 Arc 或内部 Arc 包装的句柄，clone 为浅拷贝。
///
/// # 组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | storage | NodeStorage | redb 本地存储 |
/// | clock | Arc<dyn Clock> | 时间源 |
/// | liveness | LivenessMonitor | 心跳与活跃集合 |
/// | peers | Arc<PeerDirectory> | 对等节点目录与选择策略 |
/// | oplog | OperationLog | 操作日志 |
/// | dispatcher | Dispatcher | 复制推送 |
/// | receiver | SyncReceiver | 远端批次应用 |
/// | mutations | LocalMutations | 本地变更入口 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub storage: NodeStorage,
    pub clock: Arc<dyn Clock>,
    pub liveness: LivenessMonitor,
    pub peers: Arc<PeerDirectory>,
    pub oplog: OperationLog,
    pub dispatcher: Dispatcher,
    pub receiver: SyncReceiver,
    pub mutations: LocalMutations,
}

impl ServerState {
    /// 初始化节点状态
    ///
    /// 按顺序初始化：
    /// 1. 数据库 (work_dir/node.redb)
    /// 2. 出站 HTTP 客户端
    /// 3. 选择策略与各组件
    pub fn initialize(config: &Config) -> Result<Self> {
        let storage = NodeStorage::open(config.database_path())?;
        let transport = Arc::new(HttpTransport::from_config(config)?);
        let policy = create_policy(config.peer_selection);

        tracing::info!(
            node_id = %config.node_id,
            database = %config.database_path().display(),
            peers = config.replica_nodes.len(),
            replication = config.replica_enabled,
            policy = policy.name(),
            "Node state initialized"
        );

        Ok(Self::with_components(
            config.clone(),
            storage,
            transport,
            policy,
            Arc::new(SystemClock),
        ))
    }

    /// 用给定组件组装状态
    ///
    /// 测试中注入内存存储、mock 传输和手动时钟
    pub fn with_components(
        config: Config,
        storage: NodeStorage,
        transport: Arc<dyn PeerTransport>,
        policy: Arc<dyn SelectionPolicy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let liveness = LivenessMonitor::new(storage.clone(), clock.clone());
        let peers = Arc::new(PeerDirectory::new(
            config.replica_nodes.clone(),
            transport.clone(),
            policy,
            liveness.clone(),
        ));
        let oplog = OperationLog::new(
            storage.clone(),
            config.node_id.clone(),
            config.replica_enabled,
            clock.clone(),
        );
        let dispatcher = Dispatcher::new(oplog.clone(), config.replica_nodes.clone(), transport);
        let receiver = SyncReceiver::new(storage.clone(), config.node_id.clone());
        let mutations = LocalMutations::new(storage.clone(), oplog.clone());

        Self {
            config,
            storage,
            clock,
            liveness,
            peers,
            oplog,
            dispatcher,
            receiver,
            mutations,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }

    /// 启动后台任务
    ///
    /// 只有配置了 `REPLICATION_INTERVAL_SECS` 且启用复制时才会启动定时复制，
    /// 否则返回 None。
    pub fn start_background_tasks(&self, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        let interval = self.config.replication_interval()?;
        if !self.config.replica_enabled {
            tracing::info!("Replication disabled, periodic dispatch not started");
            return None;
        }
        let worker = ReplicationWorker::new(self.dispatcher.clone(), interval, shutdown);
        Some(tokio::spawn(worker.run()))
    }
}

#[cfg(test)]
impl ServerState {
    /// 内存存储 + mock 传输 + 轮询策略
    pub(crate) fn for_tests(
        config: Config,
        transport: Arc<crate::peers::mock::MockTransport>,
        clock: Arc<crate::core::ManualClock>,
    ) -> Self {
        Self::with_components(
            config,
            NodeStorage::open_in_memory().unwrap(),
            transport,
            Arc::new(crate::peers::RoundRobinPolicy::new()),
            clock,
        )
    }
}
