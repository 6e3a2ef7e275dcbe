//! Operation log table

use redb::{ReadableDatabase, ReadableTable, Table, WriteTransaction};
use serde_json::Value;
use shared::{Operation, OperationLogEntry};

use super::{
    NodeStorage, OPLOG_SEQUENCE_KEY, OPLOG_TABLE, PENDING_TABLE, SEQUENCE_TABLE, StorageError,
    StorageResult,
};

/// Fields of an entry before the store assigns its id
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub table: String,
    pub operation: Operation,
    pub record_id: i64,
    pub payload: Value,
    pub origin_node: String,
    pub created_at: i64,
}

impl NodeStorage {
    /// Allocate the next id and insert the entry (within transaction)
    ///
    /// Counter bump and row insert commit together with `txn`.
    pub fn append_entry(
        &self,
        txn: &WriteTransaction,
        draft: NewLogEntry,
    ) -> StorageResult<OperationLogEntry> {
        let id = {
            let mut seq_table = txn.open_table(SEQUENCE_TABLE)?;
            let current = seq_table
                .get(OPLOG_SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0);
            let next = current + 1;
            seq_table.insert(OPLOG_SEQUENCE_KEY, next)?;
            next
        };

        let entry = OperationLogEntry {
            id,
            table: draft.table,
            operation: draft.operation,
            record_id: draft.record_id,
            payload: draft.payload,
            origin_node: draft.origin_node,
            created_at: draft.created_at,
            propagated: false,
        };

        let mut table = txn.open_table(OPLOG_TABLE)?;
        let value = serde_json::to_vec(&entry)?;
        table.insert(id, value.as_slice())?;

        let mut pending = txn.open_table(PENDING_TABLE)?;
        pending.insert((entry.created_at, id), entry.origin_node.as_str())?;
        Ok(entry)
    }

    /// Unpropagated entries produced by `origin_node`, oldest first
    ///
    /// Walks the pending index only; propagated history is never decoded.
    pub fn pending_entries(&self, origin_node: &str) -> StorageResult<Vec<OperationLogEntry>> {
        let read_txn = self.db.begin_read()?;
        let pending = read_txn.open_table(PENDING_TABLE)?;
        let table = read_txn.open_table(OPLOG_TABLE)?;

        let mut entries = Vec::new();
        for result in pending.iter()? {
            let (key, origin) = result?;
            if origin.value() != origin_node {
                continue;
            }
            let (_, entry_id) = key.value();
            let value = table
                .get(entry_id)?
                .ok_or(StorageError::EntryNotFound(entry_id))?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        Ok(entries)
    }

    /// Flip `propagated` to true
    ///
    /// Returns `false` when the entry was already propagated.
    pub fn mark_entry_propagated(&self, entry_id: u64) -> StorageResult<bool> {
        let txn = self.begin_write()?;
        let flipped = {
            let mut table = txn.open_table(OPLOG_TABLE)?;
            let mut pending = txn.open_table(PENDING_TABLE)?;
            flip_propagated(&mut table, &mut pending, entry_id)?
        };
        txn.commit()?;
        Ok(flipped)
    }

    /// Flip a whole dispatch cycle in one transaction
    ///
    /// An unknown id fails the call and nothing is flipped.
    pub fn mark_entries_propagated(&self, entry_ids: &[u64]) -> StorageResult<usize> {
        let txn = self.begin_write()?;
        let mut flipped = 0;
        {
            let mut table = txn.open_table(OPLOG_TABLE)?;
            let mut pending = txn.open_table(PENDING_TABLE)?;
            for &entry_id in entry_ids {
                if flip_propagated(&mut table, &mut pending, entry_id)? {
                    flipped += 1;
                }
            }
        }
        txn.commit()?;
        Ok(flipped)
    }

    /// Get a single entry by id
    pub fn get_entry(&self, entry_id: u64) -> StorageResult<Option<OperationLogEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OPLOG_TABLE)?;
        match table.get(entry_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }
}

fn flip_propagated(
    table: &mut Table<'_, u64, &'static [u8]>,
    pending: &mut Table<'_, (i64, u64), &'static str>,
    entry_id: u64,
) -> StorageResult<bool> {
    // Read and clone first to avoid borrow conflict
    let entry_opt = match table.get(entry_id)? {
        Some(value) => Some(serde_json::from_slice::<OperationLogEntry>(value.value())?),
        None => None,
    };

    let Some(mut entry) = entry_opt else {
        return Err(StorageError::EntryNotFound(entry_id));
    };

    if entry.propagated {
        return Ok(false);
    }
    entry.propagated = true;
    let new_value = serde_json::to_vec(&entry)?;
    table.insert(entry_id, new_value.as_slice())?;
    pending.remove((entry.created_at, entry_id))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(table: &str, record_id: i64, origin: &str, created_at: i64) -> NewLogEntry {
        NewLogEntry {
            table: table.to_string(),
            operation: Operation::Insert,
            record_id,
            payload: json!({"id": record_id}),
            origin_node: origin.to_string(),
            created_at,
        }
    }

    fn append(storage: &NodeStorage, entry: NewLogEntry) -> OperationLogEntry {
        let txn = storage.begin_write().unwrap();
        let stored = storage.append_entry(&txn, entry).unwrap();
        txn.commit().unwrap();
        stored
    }

    #[test]
    fn test_append_assigns_increasing_ids() {
        let storage = NodeStorage::open_in_memory().unwrap();

        let first = append(&storage, draft("clientes", 1, "nodo1", 100));
        let second = append(&storage, draft("clientes", 2, "nodo1", 100));

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(!first.propagated);
        assert_eq!(storage.get_entry(2).unwrap().unwrap(), second);
    }

    #[test]
    fn test_dropped_transaction_allocates_nothing() {
        let storage = NodeStorage::open_in_memory().unwrap();

        {
            let txn = storage.begin_write().unwrap();
            storage
                .append_entry(&txn, draft("clientes", 1, "nodo1", 1))
                .unwrap();
            // dropped without commit
        }

        let stored = append(&storage, draft("clientes", 2, "nodo1", 2));
        assert_eq!(stored.id, 1);
        assert!(storage.get_entry(2).unwrap().is_none());
    }

    #[test]
    fn test_pending_filters_origin_and_flag_and_orders() {
        let storage = NodeStorage::open_in_memory().unwrap();

        let late = append(&storage, draft("pedidos", 1, "nodo1", 300));
        let remote = append(&storage, draft("pedidos", 2, "nodo2", 100));
        let early = append(&storage, draft("pedidos", 3, "nodo1", 200));
        let done = append(&storage, draft("pedidos", 4, "nodo1", 50));
        storage.mark_entry_propagated(done.id).unwrap();

        let pending = storage.pending_entries("nodo1").unwrap();
        let ids: Vec<u64> = pending.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
        assert!(pending.iter().all(|e| e.id != remote.id));
    }

    #[test]
    fn test_mark_propagated_flips_once() {
        let storage = NodeStorage::open_in_memory().unwrap();
        let entry = append(&storage, draft("productos", 9, "nodo1", 1));

        assert!(storage.mark_entry_propagated(entry.id).unwrap());
        assert!(!storage.mark_entry_propagated(entry.id).unwrap());

        let stored = storage.get_entry(entry.id).unwrap().unwrap();
        assert!(stored.propagated);
        assert_eq!(stored.payload, entry.payload);
    }

    #[test]
    fn test_propagated_entries_leave_pending_index() {
        let storage = NodeStorage::open_in_memory().unwrap();
        let ids: Vec<u64> = (0..5)
            .map(|i| append(&storage, draft("clientes", i, "nodo1", 10 + i)).id)
            .collect();
        assert_eq!(storage.get_stats().unwrap().pending_entry_count, 5);

        assert_eq!(storage.mark_entries_propagated(&ids[..3]).unwrap(), 3);
        assert_eq!(storage.mark_entries_propagated(&ids[..4]).unwrap(), 1);

        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.pending_entry_count, 1);
        assert_eq!(stats.log_entry_count, 5);
        let pending: Vec<u64> = storage
            .pending_entries("nodo1")
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(pending, vec![ids[4]]);
        assert!(storage.get_entry(ids[0]).unwrap().unwrap().propagated);
    }

    #[test]
    fn test_mark_batch_with_unknown_id_flips_nothing() {
        let storage = NodeStorage::open_in_memory().unwrap();
        let entry = append(&storage, draft("clientes", 1, "nodo1", 1));

        let err = storage.mark_entries_propagated(&[entry.id, 99]).unwrap_err();
        assert!(matches!(err, StorageError::EntryNotFound(99)));
        assert_eq!(storage.pending_entries("nodo1").unwrap().len(), 1);
    }

    #[test]
    fn test_mark_propagated_unknown_id() {
        let storage = NodeStorage::open_in_memory().unwrap();
        let err = storage.mark_entry_propagated(42).unwrap_err();
        assert!(matches!(err, StorageError::EntryNotFound(42)));
    }
}
