//! 复制子系统
//!
//! # 组件
//!
//! - [`OperationLog`] - 本地变更的持久化操作日志
//! - [`Dispatcher`] - 把待传播条目推送给每个配置的对等节点
//! - [`SyncReceiver`] - 幂等地应用远端批次
//! - [`ReplicationWorker`] - 可选的定时 dispatch
//!
//! # 传播语义
//!
//! 每个条目只有一个 `propagated` 标志。一次 dispatch 对所有对等节点各尝试一次，
//! 无论成败都会把条目标记为已传播：当时不可达的节点不会在后续周期补收。

mod dispatcher;
mod error;
mod receiver;
mod worker;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use error::{ReplicationError, ReplicationResult};
pub use receiver::{EntryFailure, ReceiveReport, SyncReceiver};
pub use worker::ReplicationWorker;

use redb::WriteTransaction;
use serde_json::Value;
use shared::{Operation, OperationLogEntry};
use std::sync::Arc;

use crate::core::Clock;
use crate::storage::{NewLogEntry, NodeStorage, StorageError};

/// 操作日志
///
/// 复制关闭时 `append` 不写任何内容并返回 `None`，
/// 调用方不能假设条目一定存在。
#[derive(Clone, Debug)]
pub struct OperationLog {
    storage: NodeStorage,
    node_id: String,
    enabled: bool,
    clock: Arc<dyn Clock>,
}

impl OperationLog {
    pub fn new(
        storage: NodeStorage,
        node_id: impl Into<String>,
        enabled: bool,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            node_id: node_id.into(),
            enabled,
            clock,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 追加一条本地变更 (独立事务)
    pub fn append(
        &self,
        table: &str,
        operation: Operation,
        record_id: i64,
        payload: Value,
    ) -> ReplicationResult<Option<u64>> {
        if !self.enabled {
            return Ok(None);
        }
        let txn = self.storage.begin_write()?;
        let id = self.append_in(&txn, table, operation, record_id, payload)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(id)
    }

    /// 在调用方事务内追加，随该事务一起提交
    pub fn append_in(
        &self,
        txn: &WriteTransaction,
        table: &str,
        operation: Operation,
        record_id: i64,
        payload: Value,
    ) -> ReplicationResult<Option<u64>> {
        if !self.enabled {
            return Ok(None);
        }
        let entry = self.storage.append_entry(
            txn,
            NewLogEntry {
                table: table.to_string(),
                operation,
                record_id,
                payload: normalize_payload(operation, payload),
                origin_node: self.node_id.clone(),
                created_at: self.clock.now_millis(),
            },
        )?;
        tracing::debug!(
            entry_id = entry.id,
            table = %entry.table,
            operation = %entry.operation,
            record_id = entry.record_id,
            "Operation logged"
        );
        Ok(Some(entry.id))
    }

    /// 本节点产生且尚未传播的条目，按创建时间升序
    pub fn fetch_pending(&self) -> ReplicationResult<Vec<OperationLogEntry>> {
        Ok(self.storage.pending_entries(&self.node_id)?)
    }

    /// 标记为已传播 (幂等)；未知 ID 返回 NotFound
    pub fn mark_propagated(&self, entry_id: u64) -> ReplicationResult<()> {
        self.storage.mark_entry_propagated(entry_id)?;
        Ok(())
    }

    /// 一次事务内标记整批；任一 ID 未知则整批不变
    pub fn mark_all_propagated(&self, entry_ids: &[u64]) -> ReplicationResult<()> {
        self.storage.mark_entries_propagated(entry_ids)?;
        Ok(())
    }

    pub fn get(&self, entry_id: u64) -> ReplicationResult<Option<OperationLogEntry>> {
        Ok(self.storage.get_entry(entry_id)?)
    }

    /// 日志条目总数 (含已传播)
    pub fn count(&self) -> ReplicationResult<u64> {
        Ok(self.storage.get_stats()?.log_entry_count)
    }
}

/// DELETE carries no fields; a missing payload becomes an empty object
fn normalize_payload(operation: Operation, payload: Value) -> Value {
    match (operation, payload) {
        (Operation::Delete, _) | (_, Value::Null) => Value::Object(Default::default()),
        (_, payload) => payload,
    }
}
