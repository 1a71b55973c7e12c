//! Sled-backed history store
//!
//! Two trees: `path_history` maps a path to its bincode-encoded record, and
//! `path_history_by_node` indexes `node_id (big-endian) ‖ path` with empty
//! values so a node's records can be found by prefix scan.

use super::{sort_records, HistoryRecord, PathHistoryStore};
use crate::error::StorageError;
use crate::types::NodeId;
use sled::{Db, Tree};
use std::path::Path;

const PATHS_TREE: &str = "path_history";
const BY_NODE_TREE: &str = "path_history_by_node";

pub struct SledHistoryStore {
    db: Db,
    paths: Tree,
    by_node: Tree,
}

fn node_key(node_id: NodeId, path: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + path.len());
    key.extend_from_slice(&node_id.to_be_bytes());
    key.extend_from_slice(path.as_bytes());
    key
}

fn decode(bytes: &[u8]) -> Result<HistoryRecord, StorageError> {
    Ok(bincode::deserialize(bytes)?)
}

impl SledHistoryStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    pub fn from_db(db: Db) -> Result<Self, StorageError> {
        let paths = db.open_tree(PATHS_TREE)?;
        let by_node = db.open_tree(BY_NODE_TREE)?;
        Ok(Self { db, paths, by_node })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl PathHistoryStore for SledHistoryStore {
    fn insert(&self, record: &HistoryRecord) -> Result<(), StorageError> {
        let value = bincode::serialize(record)?;
        let swapped =
            self.paths
                .compare_and_swap(record.path.as_bytes(), None as Option<&[u8]>, Some(value))?;
        if swapped.is_err() {
            return Err(StorageError::Duplicate(record.path.clone()));
        }
        self.by_node
            .insert(node_key(record.node_id, &record.path), &[] as &[u8])?;
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Option<HistoryRecord>, StorageError> {
        self.paths
            .get(path.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn delete_path(&self, path: &str) -> Result<bool, StorageError> {
        match self.paths.remove(path.as_bytes())? {
            Some(bytes) => {
                let record = decode(&bytes)?;
                self.by_node.remove(node_key(record.node_id, path))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_node(&self, node_id: NodeId) -> Result<usize, StorageError> {
        let mut removed = 0;
        for entry in self.by_node.scan_prefix(node_id.to_be_bytes()) {
            let (key, _) = entry?;
            let path = &key[8..];
            if self.paths.remove(path)?.is_some() {
                removed += 1;
            }
            self.by_node.remove(&key)?;
        }
        Ok(removed)
    }

    fn records_for(&self, node_id: NodeId) -> Result<Vec<HistoryRecord>, StorageError> {
        let mut records = Vec::new();
        for entry in self.by_node.scan_prefix(node_id.to_be_bytes()) {
            let (key, _) = entry?;
            if let Some(bytes) = self.paths.get(&key[8..])? {
                let record = decode(&bytes)?;
                if record.node_id == node_id {
                    records.push(record);
                }
            }
        }
        sort_records(&mut records);
        Ok(records)
    }

    fn all(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        self.paths
            .iter()
            .map(|entry| {
                let (_, bytes) = entry?;
                decode(&bytes)
            })
            .collect()
    }
}
