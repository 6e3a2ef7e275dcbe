//! Domain records table
//!
//! Each row is the JSON field set of one record of one entity collection,
//! keyed by `(table, record_id)`.

use redb::{ReadableDatabase, ReadableTable, WriteTransaction};
use serde_json::Value;

use super::{NodeStorage, RECORDS_TABLE, StorageResult};

impl NodeStorage {
    /// Get a record (read-only)
    pub fn get_record(&self, table: &str, record_id: i64) -> StorageResult<Option<Value>> {
        let read_txn = self.db.begin_read()?;
        let records = read_txn.open_table(RECORDS_TABLE)?;
        match records.get((table, record_id))? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a record within a write transaction
    pub fn get_record_txn(
        &self,
        txn: &WriteTransaction,
        table: &str,
        record_id: i64,
    ) -> StorageResult<Option<Value>> {
        let records = txn.open_table(RECORDS_TABLE)?;
        match records.get((table, record_id))? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Store a record (within transaction), replacing any previous value
    pub fn put_record(
        &self,
        txn: &WriteTransaction,
        table: &str,
        record_id: i64,
        value: &Value,
    ) -> StorageResult<()> {
        let mut records = txn.open_table(RECORDS_TABLE)?;
        let bytes = serde_json::to_vec(value)?;
        records.insert((table, record_id), bytes.as_slice())?;
        Ok(())
    }

    /// Remove a record (within transaction)
    ///
    /// Returns whether a row existed.
    pub fn remove_record(
        &self,
        txn: &WriteTransaction,
        table: &str,
        record_id: i64,
    ) -> StorageResult<bool> {
        let mut records = txn.open_table(RECORDS_TABLE)?;
        let existed = records.remove((table, record_id))?.is_some();
        Ok(existed)
    }

    /// All records of one collection, ordered by id
    pub fn list_records(&self, table: &str) -> StorageResult<Vec<(i64, Value)>> {
        let read_txn = self.db.begin_read()?;
        let records = read_txn.open_table(RECORDS_TABLE)?;

        let mut rows = Vec::new();
        for result in records.range((table, i64::MIN)..=(table, i64::MAX))? {
            let (key, value) = result?;
            let (_, record_id) = key.value();
            rows.push((record_id, serde_json::from_slice(value.value())?));
        }
        Ok(rows)
    }
}
