//! redb-based local store of a node
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `oplog` | `entry_id` | `OperationLogEntry` | Operation log (append-only, propagated flag) |
//! | `oplog_pending` | `(created_at, entry_id)` | `origin_node` | Index of unpropagated entries |
//! | `sequence_counter` | `"oplog"` | `u64` | Last assigned entry id |
//! | `node_liveness` | `node_id` | `NodeLiveness` | Heartbeat rows |
//! | `records` | `(table, record_id)` | JSON object | Domain records replicated between nodes |
//!
//! # Concurrency
//!
//! redb serializes write transactions, so concurrent appends and heartbeats
//! from different request paths never interleave inside one row. Readers see
//! the last committed snapshot.

mod liveness;
mod oplog;
mod records;

pub use oplog::NewLogEntry;

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Operation log: key = entry id, value = JSON-serialized OperationLogEntry
const OPLOG_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("oplog");

/// Unpropagated entries: key = (created_at, entry_id), value = origin node
///
/// Rows leave the index when the entry is marked propagated, so a pending
/// scan never walks the propagated history.
const PENDING_TABLE: TableDefinition<(i64, u64), &str> = TableDefinition::new("oplog_pending");

/// Sequence counter: key = counter name, value = last assigned id
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

/// Liveness rows: key = node_id, value = JSON-serialized NodeLiveness
const LIVENESS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("node_liveness");

/// Domain records: key = (table, record_id), value = JSON object
const RECORDS_TABLE: TableDefinition<(&str, i64), &[u8]> = TableDefinition::new("records");

const OPLOG_SEQUENCE_KEY: &str = "oplog";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log entry not found: {0}")]
    EntryNotFound(u64),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for shared::error::AppError {
    fn from(err: StorageError) -> Self {
        shared::error::AppError::database(err.to_string())
    }
}

/// Node storage backed by redb
#[derive(Clone)]
pub struct NodeStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for NodeStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeStorage").finish_non_exhaustive()
    }
}

impl NodeStorage {
    /// Open or create the database at the given path
    ///
    /// Parent directories are created when missing. Commits are durable as
    /// soon as `commit()` returns.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;
        Self::init_tables(&db)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init_tables(&db)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn init_tables(db: &Database) -> StorageResult<()> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(OPLOG_TABLE)?;
            let _ = write_txn.open_table(PENDING_TABLE)?;
            let _ = write_txn.open_table(LIVENESS_TABLE)?;
            let _ = write_txn.open_table(RECORDS_TABLE)?;

            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(OPLOG_SEQUENCE_KEY)?.is_none() {
                seq_table.insert(OPLOG_SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let oplog_table = read_txn.open_table(OPLOG_TABLE)?;
        let pending_table = read_txn.open_table(PENDING_TABLE)?;
        let liveness_table = read_txn.open_table(LIVENESS_TABLE)?;
        let records_table = read_txn.open_table(RECORDS_TABLE)?;
        let seq_table = read_txn.open_table(SEQUENCE_TABLE)?;

        Ok(StorageStats {
            log_entry_count: oplog_table.len()?,
            pending_entry_count: pending_table.len()?,
            liveness_row_count: liveness_table.len()?,
            record_count: records_table.len()?,
            current_sequence: seq_table
                .get(OPLOG_SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0),
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageStats {
    pub log_entry_count: u64,
    pub pending_entry_count: u64,
    pub liveness_row_count: u64,
    pub record_count: u64,
    pub current_sequence: u64,
}
