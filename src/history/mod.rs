//! Path history
//!
//! Previous locations of nodes, recorded when a node is renamed or moved and
//! consulted when a request path no longer resolves to a live node.

pub mod memory;
pub mod persistence;
pub mod recorder;
pub mod resolver;

pub use memory::MemoryHistoryStore;
pub use persistence::SledHistoryStore;
pub use recorder::{ListPathsOptions, PathHistory};
pub use resolver::{PathResolver, Redirect, Resolution};

use crate::error::StorageError;
use crate::types::{LanguageId, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A former path of a node. The path is unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub path: String,
    pub node_id: NodeId,
    /// [`DEFAULT_LANGUAGE`](crate::types::DEFAULT_LANGUAGE) for default-language paths
    pub language_id: LanguageId,
    pub created: DateTime<Utc>,
}

/// History storage. Every operation is a single atomic statement.
pub trait PathHistoryStore: Send + Sync {
    /// Fails with [`StorageError::Duplicate`] when the path is already recorded.
    fn insert(&self, record: &HistoryRecord) -> Result<(), StorageError>;

    fn get(&self, path: &str) -> Result<Option<HistoryRecord>, StorageError>;

    /// Returns whether a record was removed.
    fn delete_path(&self, path: &str) -> Result<bool, StorageError>;

    /// Remove every record of a node; returns how many were removed.
    fn delete_node(&self, node_id: NodeId) -> Result<usize, StorageError>;

    /// Records of a node, oldest first.
    fn records_for(&self, node_id: NodeId) -> Result<Vec<HistoryRecord>, StorageError>;

    fn all(&self) -> Result<Vec<HistoryRecord>, StorageError>;
}

/// Oldest first; ties broken by path so listings are stable.
pub(crate) fn sort_records(records: &mut [HistoryRecord]) {
    records.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.path.cmp(&b.path)));
}
