//! Node liveness table

use redb::{ReadableDatabase, ReadableTable};
use shared::{NodeLiveness, NodeStatus};

use super::{LIVENESS_TABLE, NodeStorage, StorageResult};

impl NodeStorage {
    /// Insert or replace the row of `row.node_id`
    pub fn upsert_liveness(&self, row: &NodeLiveness) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(LIVENESS_TABLE)?;
            let value = serde_json::to_vec(row)?;
            table.insert(row.node_id.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_liveness(&self, node_id: &str) -> StorageResult<Option<NodeLiveness>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LIVENESS_TABLE)?;
        match table.get(node_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All rows ordered by node id
    pub fn all_liveness(&self) -> StorageResult<Vec<NodeLiveness>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LIVENESS_TABLE)?;

        let mut rows = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            rows.push(serde_json::from_slice(value.value())?);
        }
        Ok(rows)
    }

    /// Overwrite the stored status, keeping `last_seen`
    ///
    /// Returns `false` when the node has no row.
    pub fn set_liveness_status(&self, node_id: &str, status: NodeStatus) -> StorageResult<bool> {
        let txn = self.begin_write()?;
        let updated = {
            let mut table = txn.open_table(LIVENESS_TABLE)?;

            let row_opt = match table.get(node_id)? {
                Some(value) => Some(serde_json::from_slice::<NodeLiveness>(value.value())?),
                None => None,
            };

            match row_opt {
                Some(mut row) => {
                    row.status = status;
                    let new_value = serde_json::to_vec(&row)?;
                    table.insert(node_id, new_value.as_slice())?;
                    true
                }
                None => false,
            }
        };
        txn.commit()?;
        Ok(updated)
    }
}
