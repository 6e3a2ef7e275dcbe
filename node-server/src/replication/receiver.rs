//! Sync receiver
//!
//! Applies remote operation log entries to the local records table. Each
//! entry runs in its own write transaction so a bad entry never rolls back
//! the ones before it. Applied entries are never re-logged locally, which
//! keeps a batch from bouncing back to its origin.

use serde::Serialize;
use serde_json::{Map, Value};
use shared::replication::MAX_SYNC_BATCH_ENTRIES;
use shared::util::format_millis;
use shared::{Operation, OperationLogEntry};

use super::{ReplicationError, ReplicationResult, normalize_payload};
use crate::storage::{NodeStorage, StorageError};

/// One entry the receiver could not apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFailure {
    pub entry_id: u64,
    pub origin_node: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReceiveReport {
    /// Entries processed without error, no-ops included
    pub applied_count: usize,
    pub failures: Vec<EntryFailure>,
}

/// What applying one entry did to the local store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    Created,
    Merged,
    Removed,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct SyncReceiver {
    storage: NodeStorage,
    node_id: String,
}

impl SyncReceiver {
    pub fn new(storage: NodeStorage, node_id: impl Into<String>) -> Self {
        Self {
            storage,
            node_id: node_id.into(),
        }
    }

    /// Apply a batch in array order
    ///
    /// Only an oversized batch fails as a whole; everything else is
    /// reported per entry.
    pub fn receive(&self, batch: &[OperationLogEntry]) -> ReplicationResult<ReceiveReport> {
        if batch.len() > MAX_SYNC_BATCH_ENTRIES {
            return Err(ReplicationError::BatchTooLarge {
                size: batch.len(),
                max: MAX_SYNC_BATCH_ENTRIES,
            });
        }

        let mut report = ReceiveReport::default();
        for entry in batch {
            match self.apply(entry) {
                Ok(applied) => {
                    tracing::debug!(
                        entry_id = entry.id,
                        origin = %entry.origin_node,
                        table = %entry.table,
                        operation = %entry.operation,
                        record_id = entry.record_id,
                        outcome = ?applied,
                        "Remote entry applied"
                    );
                    report.applied_count += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        entry_id = entry.id,
                        origin = %entry.origin_node,
                        created_at = %format_millis(entry.created_at),
                        "Failed to apply remote entry: {e}"
                    );
                    report.failures.push(EntryFailure {
                        entry_id: entry.id,
                        origin_node: entry.origin_node.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if !batch.is_empty() {
            tracing::info!(
                node = %self.node_id,
                received = batch.len(),
                applied = report.applied_count,
                failed = report.failures.len(),
                "Sync batch processed"
            );
        }
        Ok(report)
    }

    fn apply(&self, entry: &OperationLogEntry) -> ReplicationResult<Applied> {
        let payload = normalize_payload(entry.operation, entry.payload.clone());
        validate(entry, &payload)?;

        let txn = self.storage.begin_write()?;
        let existing = self
            .storage
            .get_record_txn(&txn, &entry.table, entry.record_id)?;

        let applied = match (entry.operation, existing) {
            (Operation::Insert, Some(_)) => Applied::Unchanged,
            (Operation::Insert, None) => {
                self.storage
                    .put_record(&txn, &entry.table, entry.record_id, &payload)?;
                Applied::Created
            }
            (Operation::Update, Some(current)) => {
                let merged = merge_fields(current, &payload);
                self.storage
                    .put_record(&txn, &entry.table, entry.record_id, &merged)?;
                Applied::Merged
            }
            (Operation::Update, None) => {
                self.storage
                    .put_record(&txn, &entry.table, entry.record_id, &payload)?;
                Applied::Created
            }
            (Operation::Delete, Some(_)) => {
                self.storage
                    .remove_record(&txn, &entry.table, entry.record_id)?;
                Applied::Removed
            }
            (Operation::Delete, None) => Applied::Unchanged,
        };

        if applied == Applied::Unchanged {
            txn.abort().map_err(StorageError::from)?;
        } else {
            txn.commit().map_err(StorageError::from)?;
        }
        Ok(applied)
    }
}

/// `payload` is the entry's payload after null/DELETE normalization
fn validate(entry: &OperationLogEntry, payload: &Value) -> ReplicationResult<()> {
    if entry.table.trim().is_empty() {
        return Err(ReplicationError::Validation(format!(
            "entry {} has an empty table name",
            entry.id
        )));
    }
    if !payload.is_object() {
        return Err(ReplicationError::Validation(format!(
            "entry {} {} payload must be an object",
            entry.id, entry.operation
        )));
    }
    Ok(())
}

/// Overlay `patch` fields on `current`; a non-object current value is replaced
fn merge_fields(current: Value, patch: &Value) -> Value {
    let mut fields = match current {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Value::Object(patch) = patch {
        for (key, value) in patch {
            fields.insert(key.clone(), value.clone());
        }
    }
    Value::Object(fields)
}
