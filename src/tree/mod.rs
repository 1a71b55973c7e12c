//! Content tree collaborator
//!
//! The naming and history subsystems never own nodes. They read them through
//! [`TreeStore`] and learn about renames, moves and deletions through
//! [`TreeEvent`] notifications delivered to subscribed [`TreeListener`]s.

pub mod memory;
pub mod node;
pub mod snapshot;

pub use memory::{MemoryTree, ROOT_ID};
pub use node::{Node, TITLE_FIELD};
pub use snapshot::TreeSnapshot;

use crate::error::StorageError;
use crate::types::{LanguageId, NodeId};
use std::collections::BTreeMap;

/// Name column addressed by an existence query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NameColumn {
    Default,
    Language(LanguageId),
}

/// Tree storage interface consumed by the core
pub trait TreeStore: Send + Sync {
    fn get(&self, id: NodeId) -> Result<Option<Node>, StorageError>;

    /// Live lookup of a path. Never consults path history.
    fn find_by_path(
        &self,
        path: &str,
        language: Option<LanguageId>,
    ) -> Result<Option<Node>, StorageError>;

    /// Current live path of a node (`/` for the root, no trailing slash).
    fn path_of(
        &self,
        id: NodeId,
        language: Option<LanguageId>,
    ) -> Result<Option<String>, StorageError>;

    fn children_of(&self, id: NodeId) -> Result<Vec<Node>, StorageError>;

    /// True when the node or one of its ancestors is trashed.
    fn is_in_trash(&self, id: NodeId) -> Result<bool, StorageError>;

    /// Number of nodes other than `exclude` carrying `name` in `column`,
    /// restricted to children of `parent` when given.
    ///
    /// Fails with [`StorageError::SchemaMismatch`] when the column does not exist.
    fn count_named(
        &self,
        name: &str,
        column: NameColumn,
        parent: Option<NodeId>,
        exclude: Option<NodeId>,
    ) -> Result<usize, StorageError>;

    /// Add a missing name column.
    fn upgrade_schema(&self, column: NameColumn) -> Result<(), StorageError>;

    /// Persist a new node. Sibling name collisions fail with
    /// [`StorageError::Duplicate`].
    fn insert(&self, node: Node) -> Result<NodeId, StorageError>;
}

/// A node's placement before a rename or move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub node_id: NodeId,
    /// Set when the node changed parent
    pub previous_parent: Option<NodeId>,
    /// Set when the default name changed
    pub previous_name: Option<String>,
    /// Effective previous names for languages whose name changed
    pub previous_language_names: BTreeMap<LanguageId, String>,
}

impl Relocation {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            previous_parent: None,
            previous_name: None,
            previous_language_names: BTreeMap::new(),
        }
    }
}

/// Change notification published by tree storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    Relocated(Relocation),
    /// Permanent deletion
    Deleted { node_id: NodeId },
}

pub trait TreeListener: Send + Sync {
    fn on_event(&self, event: &TreeEvent);
}

/// Normalized path segments: empty segments dropped, no leading/trailing slash.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').map(str::trim).filter(|s| !s.is_empty())
}

/// Join a parent path and a child name.
pub fn join_path(parent_path: &str, name: &str) -> String {
    if parent_path == "/" || parent_path.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent_path.trim_end_matches('/'), name)
    }
}
