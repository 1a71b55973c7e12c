//! In-memory history store.

use super::{sort_records, HistoryRecord, PathHistoryStore};
use crate::error::StorageError;
use crate::types::NodeId;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: RwLock<BTreeMap<String, HistoryRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PathHistoryStore for MemoryHistoryStore {
    fn insert(&self, record: &HistoryRecord) -> Result<(), StorageError> {
        let mut records = self.records.write();
        if records.contains_key(&record.path) {
            return Err(StorageError::Duplicate(record.path.clone()));
        }
        records.insert(record.path.clone(), record.clone());
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Option<HistoryRecord>, StorageError> {
        Ok(self.records.read().get(path).cloned())
    }

    fn delete_path(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.records.write().remove(path).is_some())
    }

    fn delete_node(&self, node_id: NodeId) -> Result<usize, StorageError> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, r| r.node_id != node_id);
        Ok(before - records.len())
    }

    fn records_for(&self, node_id: NodeId) -> Result<Vec<HistoryRecord>, StorageError> {
        let mut found: Vec<HistoryRecord> = self
            .records
            .read()
            .values()
            .filter(|r| r.node_id == node_id)
            .cloned()
            .collect();
        sort_records(&mut found);
        Ok(found)
    }

    fn all(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        Ok(self.records.read().values().cloned().collect())
    }
}
