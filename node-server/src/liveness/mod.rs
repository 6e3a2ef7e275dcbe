//! 存活监控
//!
//! 记录每个节点的心跳时间，并在查询时推导活跃集合。
//!
//! 活跃判定 = `status == active` 且 `now - last_seen` 在 60 秒窗口内。
//! 没有后台过期任务：崩溃节点在窗口过后自然从活跃集合中消失，
//! 存储中的 `status` 不会被自动改写。

use std::collections::BTreeSet;
use std::sync::Arc;

use shared::{NodeLiveness, NodeStatus};

use crate::core::Clock;
use crate::storage::{NodeStorage, StorageResult};

/// 存活监控器
#[derive(Clone, Debug)]
pub struct LivenessMonitor {
    storage: NodeStorage,
    clock: Arc<dyn Clock>,
}

impl LivenessMonitor {
    pub fn new(storage: NodeStorage, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// 记录一次心跳 (upsert: status=active, last_seen=now)
    pub fn heartbeat(&self, node_id: &str) -> StorageResult<NodeLiveness> {
        let row = NodeLiveness {
            node_id: node_id.to_string(),
            status: NodeStatus::Active,
            last_seen: self.clock.now_millis(),
        };
        self.storage.upsert_liveness(&row)?;
        tracing::trace!(node_id = %node_id, "Heartbeat recorded");
        Ok(row)
    }

    /// 窗口内活跃的节点 ID
    pub fn active_nodes(&self) -> StorageResult<BTreeSet<String>> {
        Ok(self
            .active_entries()?
            .into_iter()
            .map(|row| row.node_id)
            .collect())
    }

    /// 窗口内活跃的完整行 (按 node_id 排序)
    pub fn active_entries(&self) -> StorageResult<Vec<NodeLiveness>> {
        let now = self.clock.now_millis();
        Ok(self
            .storage
            .all_liveness()?
            .into_iter()
            .filter(|row| row.is_active_at(now))
            .collect())
    }

    pub fn lookup(&self, node_id: &str) -> StorageResult<Option<NodeLiveness>> {
        self.storage.get_liveness(node_id)
    }

    /// 显式标记为 inactive，返回节点是否存在
    pub fn mark_inactive(&self, node_id: &str) -> StorageResult<bool> {
        let updated = self
            .storage
            .set_liveness_status(node_id, NodeStatus::Inactive)?;
        if updated {
            tracing::info!(node_id = %node_id, "Node marked inactive");
        }
        Ok(updated)
    }
}
