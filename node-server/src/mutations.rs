//! 本地变更入口
//!
//! 领域 CRUD 层通过 [`LocalMutations`] 写入记录：记录本身与对应的操作日志
//! 条目在同一个 redb 事务中提交，二者要么同时存在，要么都不存在。

use serde_json::{Map, Value};
use shared::Operation;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use crate::replication::{OperationLog, ReplicationError};
use crate::storage::{NodeStorage, StorageError};

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("{table}/{record_id} already exists")]
    AlreadyExists { table: String, record_id: i64 },

    #[error("{table}/{record_id} not found")]
    NotFound { table: String, record_id: i64 },

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Replication(#[from] ReplicationError),
}

pub type MutationResult<T> = Result<T, MutationError>;

impl From<MutationError> for AppError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::AlreadyExists { table, record_id } => {
                AppError::with_message(ErrorCode::AlreadyExists, format!("{table}/{record_id} already exists"))
            }
            MutationError::NotFound { table, record_id } => {
                AppError::with_message(ErrorCode::RecordNotFound, format!("{table}/{record_id} not found"))
            }
            MutationError::Validation(msg) => AppError::validation(msg),
            MutationError::Storage(e) => AppError::database(e.to_string()),
            MutationError::Replication(e) => e.into(),
        }
    }
}

/// 变更结果：写入后的记录值与日志条目 ID (复制关闭时为 None)
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub record: Option<Value>,
    pub entry_id: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct LocalMutations {
    storage: NodeStorage,
    oplog: OperationLog,
}

impl LocalMutations {
    pub fn new(storage: NodeStorage, oplog: OperationLog) -> Self {
        Self { storage, oplog }
    }

    /// 新建记录；已存在时返回 AlreadyExists
    pub fn insert(&self, table: &str, record_id: i64, fields: Value) -> MutationResult<MutationOutcome> {
        let fields = object_payload(table, fields)?;

        let txn = self.storage.begin_write()?;
        if self.storage.get_record_txn(&txn, table, record_id)?.is_some() {
            return Err(MutationError::AlreadyExists {
                table: table.to_string(),
                record_id,
            });
        }
        self.storage.put_record(&txn, table, record_id, &fields)?;
        let entry_id = self
            .oplog
            .append_in(&txn, table, Operation::Insert, record_id, fields.clone())?;
        txn.commit().map_err(StorageError::from)?;

        Ok(MutationOutcome {
            record: Some(fields),
            entry_id,
        })
    }

    /// 合并字段到已有记录
    ///
    /// 日志里记录的是合并后的完整快照，而不只是改动字段。
    pub fn update(&self, table: &str, record_id: i64, fields: Value) -> MutationResult<MutationOutcome> {
        let patch = object_payload(table, fields)?;

        let txn = self.storage.begin_write()?;
        let Some(current) = self.storage.get_record_txn(&txn, table, record_id)? else {
            return Err(MutationError::NotFound {
                table: table.to_string(),
                record_id,
            });
        };

        let mut merged = match current {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Value::Object(patch) = patch {
            merged.extend(patch);
        }
        let merged = Value::Object(merged);

        self.storage.put_record(&txn, table, record_id, &merged)?;
        let entry_id = self
            .oplog
            .append_in(&txn, table, Operation::Update, record_id, merged.clone())?;
        txn.commit().map_err(StorageError::from)?;

        Ok(MutationOutcome {
            record: Some(merged),
            entry_id,
        })
    }

    pub fn delete(&self, table: &str, record_id: i64) -> MutationResult<MutationOutcome> {
        validate_table(table)?;

        let txn = self.storage.begin_write()?;
        if !self.storage.remove_record(&txn, table, record_id)? {
            return Err(MutationError::NotFound {
                table: table.to_string(),
                record_id,
            });
        }
        let entry_id =
            self.oplog
                .append_in(&txn, table, Operation::Delete, record_id, Value::Null)?;
        txn.commit().map_err(StorageError::from)?;

        Ok(MutationOutcome {
            record: None,
            entry_id,
        })
    }

    pub fn get(&self, table: &str, record_id: i64) -> MutationResult<Option<Value>> {
        Ok(self.storage.get_record(table, record_id)?)
    }

    pub fn list(&self, table: &str) -> MutationResult<Vec<(i64, Value)>> {
        Ok(self.storage.list_records(table)?)
    }
}

fn validate_table(table: &str) -> MutationResult<()> {
    if table.trim().is_empty() {
        return Err(MutationError::Validation("table name is empty".to_string()));
    }
    Ok(())
}

fn object_payload(table: &str, fields: Value) -> MutationResult<Value> {
    validate_table(table)?;
    if !fields.is_object() {
        return Err(MutationError::Validation(
            "record fields must be a JSON object".to_string(),
        ));
    }
    Ok(fields)
}
