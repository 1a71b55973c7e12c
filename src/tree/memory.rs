//! In-memory tree storage
//!
//! Reference [`TreeStore`] used by the CLI and the tests. Sibling names are
//! enforced unique per name column, the same guarantee a relational host gets
//! from a unique index on `(parent, name)`.

use super::{
    path_segments, Node, NameColumn, Relocation, TreeEvent, TreeListener, TreeSnapshot, TreeStore,
};
use crate::error::StorageError;
use crate::types::{LanguageId, NodeId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Weak};

/// Id of the root node every tree starts with
pub const ROOT_ID: NodeId = 1;

struct TreeState {
    nodes: BTreeMap<NodeId, Node>,
    next_id: NodeId,
    language_columns: BTreeSet<LanguageId>,
}

fn column_name(node: &Node, column: NameColumn) -> Option<&str> {
    match column {
        NameColumn::Default => Some(node.name.as_str()),
        NameColumn::Language(language) => node.language_names.get(&language).map(String::as_str),
    }
}

fn validate_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name.contains('/') {
        return Err(StorageError::InvalidPath(format!("invalid node name {:?}", name)));
    }
    Ok(())
}

impl TreeState {
    fn node(&self, id: NodeId) -> Result<&Node, StorageError> {
        self.nodes.get(&id).ok_or(StorageError::NodeNotFound(id))
    }

    fn path_of(&self, id: NodeId, language: Option<LanguageId>) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = self.nodes.get(&id)?;
        while let Some(parent) = current.parent {
            segments.push(current.name_in(language));
            if segments.len() > self.nodes.len() {
                return None;
            }
            current = self.nodes.get(&parent)?;
        }
        segments.reverse();
        Some(format!("/{}", segments.join("/")))
    }

    fn count_named(
        &self,
        name: &str,
        column: NameColumn,
        parent: Option<NodeId>,
        exclude: Option<NodeId>,
    ) -> usize {
        self.nodes
            .values()
            .filter(|n| exclude.map_or(true, |e| n.id != Some(e)))
            .filter(|n| parent.map_or(true, |p| n.parent == Some(p)))
            .filter(|n| column_name(n, column) == Some(name))
            .count()
    }

    fn check_unique(&self, node: &Node, parent: NodeId) -> Result<(), StorageError> {
        if self.count_named(&node.name, NameColumn::Default, Some(parent), node.id) > 0 {
            return Err(StorageError::Duplicate(format!(
                "name {:?} already used under parent {}",
                node.name, parent
            )));
        }
        for (language, name) in &node.language_names {
            let column = NameColumn::Language(*language);
            if !name.is_empty() && self.count_named(name, column, Some(parent), node.id) > 0 {
                return Err(StorageError::Duplicate(format!(
                    "name {:?} already used under parent {} for language {}",
                    name, parent, language
                )));
            }
        }
        Ok(())
    }

    fn is_same_or_descendant(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.nodes.get(&cur).and_then(|n| n.parent);
        }
        false
    }

    fn in_trash(&self, id: NodeId) -> bool {
        let mut current = self.nodes.get(&id);
        let mut steps = 0;
        while let Some(node) = current {
            if node.trashed {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = node.parent.and_then(|p| self.nodes.get(&p));
        }
        false
    }
}

/// In-memory [`TreeStore`] that publishes [`TreeEvent`]s on relocation and deletion
pub struct MemoryTree {
    state: RwLock<TreeState>,
    listeners: RwLock<Vec<Weak<dyn TreeListener>>>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    /// Tree holding only the root node
    pub fn new() -> Self {
        let mut root = Node::new(ROOT_ID, chrono::DateTime::<chrono::Utc>::default());
        root.id = Some(ROOT_ID);
        root.parent = None;
        let mut nodes = BTreeMap::new();
        nodes.insert(ROOT_ID, root);
        Self {
            state: RwLock::new(TreeState {
                nodes,
                next_id: ROOT_ID + 1,
                language_columns: BTreeSet::new(),
            }),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Declare language name columns up front.
    pub fn with_language_columns(self, columns: impl IntoIterator<Item = LanguageId>) -> Self {
        self.state.write().language_columns.extend(columns);
        self
    }

    /// Rebuild a tree from a snapshot, re-checking sibling uniqueness.
    pub fn from_snapshot(snapshot: TreeSnapshot) -> Result<Self, StorageError> {
        let tree = Self::new().with_language_columns(snapshot.language_columns);
        {
            let mut state = tree.state.write();
            for node in snapshot.nodes {
                let id = node.id.ok_or_else(|| {
                    StorageError::InvalidPath(format!("snapshot node {:?} has no id", node.name))
                })?;
                state.language_columns.extend(node.language_names.keys().copied());
                state.next_id = state.next_id.max(id + 1);
                state.nodes.insert(id, node);
            }
            state.next_id = state.next_id.max(snapshot.next_id);
            for node in state.nodes.values() {
                if let Some(parent) = node.parent {
                    state.node(parent)?;
                    state.check_unique(node, parent)?;
                }
            }
        }
        Ok(tree)
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        let state = self.state.read();
        TreeSnapshot {
            next_id: state.next_id,
            language_columns: state.language_columns.iter().copied().collect(),
            nodes: state
                .nodes
                .values()
                .filter(|n| n.id != Some(ROOT_ID))
                .cloned()
                .collect(),
        }
    }

    /// Subscribe to change events. The tree keeps only a weak reference.
    pub fn subscribe<L: TreeListener + 'static>(&self, listener: &Arc<L>) {
        let weak: Weak<L> = Arc::downgrade(listener);
        let weak: Weak<dyn TreeListener> = weak;
        self.listeners.write().push(weak);
    }

    pub fn len(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rename(&self, id: NodeId, name: &str) -> Result<(), StorageError> {
        validate_name(name)?;
        let previous = {
            let mut state = self.state.write();
            let node = state.node(id)?;
            let parent = node.parent.ok_or_else(|| {
                StorageError::InvalidPath("the root node cannot be renamed".to_string())
            })?;
            if node.name == name {
                return Ok(());
            }
            let mut renamed = node.clone();
            let previous = std::mem::replace(&mut renamed.name, name.to_string());
            state.check_unique(&renamed, parent)?;
            state.nodes.insert(id, renamed);
            previous
        };

        let mut relocation = Relocation::new(id);
        relocation.previous_name = Some(previous);
        self.publish(TreeEvent::Relocated(relocation));
        Ok(())
    }

    pub fn rename_language(
        &self,
        id: NodeId,
        language: LanguageId,
        name: &str,
    ) -> Result<(), StorageError> {
        validate_name(name)?;
        let previous = {
            let mut state = self.state.write();
            let node = state.node(id)?;
            let parent = node.parent.ok_or_else(|| {
                StorageError::InvalidPath("the root node cannot be renamed".to_string())
            })?;
            let previous = node.name_in(Some(language)).to_string();
            if previous == name {
                return Ok(());
            }
            let mut renamed = node.clone();
            renamed.language_names.insert(language, name.to_string());
            state.check_unique(&renamed, parent)?;
            state.language_columns.insert(language);
            state.nodes.insert(id, renamed);
            previous
        };

        let mut relocation = Relocation::new(id);
        relocation.previous_language_names.insert(language, previous);
        self.publish(TreeEvent::Relocated(relocation));
        Ok(())
    }

    pub fn move_to(&self, id: NodeId, new_parent: NodeId) -> Result<(), StorageError> {
        let previous = {
            let mut state = self.state.write();
            state.node(new_parent)?;
            let node = state.node(id)?;
            let previous = node.parent.ok_or_else(|| {
                StorageError::InvalidPath("the root node cannot be moved".to_string())
            })?;
            if previous == new_parent {
                return Ok(());
            }
            if state.is_same_or_descendant(new_parent, id) {
                return Err(StorageError::InvalidPath(format!(
                    "cannot move node {} below itself",
                    id
                )));
            }
            let mut moved = node.clone();
            moved.parent = Some(new_parent);
            state.check_unique(&moved, new_parent)?;
            state.nodes.insert(id, moved);
            previous
        };

        let mut relocation = Relocation::new(id);
        relocation.previous_parent = Some(previous);
        self.publish(TreeEvent::Relocated(relocation));
        Ok(())
    }

    /// Flag a node as trashed. Trashed nodes stay addressable by id.
    pub fn trash(&self, id: NodeId) -> Result<(), StorageError> {
        let mut state = self.state.write();
        if id == ROOT_ID {
            return Err(StorageError::InvalidPath("the root node cannot be trashed".to_string()));
        }
        let node = state.nodes.get_mut(&id).ok_or(StorageError::NodeNotFound(id))?;
        node.trashed = true;
        Ok(())
    }

    /// Permanently delete a node and its descendants, deepest first.
    pub fn delete(&self, id: NodeId) -> Result<Vec<NodeId>, StorageError> {
        let removed = {
            let mut state = self.state.write();
            if id == ROOT_ID {
                return Err(StorageError::InvalidPath("the root node cannot be deleted".to_string()));
            }
            state.node(id)?;

            let mut order = vec![id];
            let mut cursor = 0;
            while cursor < order.len() {
                let current = order[cursor];
                order.extend(
                    state
                        .nodes
                        .values()
                        .filter(|n| n.parent == Some(current))
                        .filter_map(|n| n.id),
                );
                cursor += 1;
            }
            order.reverse();
            for node_id in &order {
                state.nodes.remove(node_id);
            }
            order
        };

        for node_id in &removed {
            self.publish(TreeEvent::Deleted { node_id: *node_id });
        }
        Ok(removed)
    }

    fn publish(&self, event: TreeEvent) {
        let listeners: Vec<Arc<dyn TreeListener>> = {
            let mut listeners = self.listeners.write();
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in listeners {
            listener.on_event(&event);
        }
    }
}

impl TreeStore for MemoryTree {
    fn get(&self, id: NodeId) -> Result<Option<Node>, StorageError> {
        Ok(self.state.read().nodes.get(&id).cloned())
    }

    fn find_by_path(
        &self,
        path: &str,
        language: Option<LanguageId>,
    ) -> Result<Option<Node>, StorageError> {
        let state = self.state.read();
        let mut current = ROOT_ID;
        for segment in path_segments(path) {
            let child = state
                .nodes
                .values()
                .find(|n| n.parent == Some(current) && n.name_in(language) == segment);
            match child.and_then(|c| c.id) {
                Some(id) => current = id,
                None => return Ok(None),
            }
        }
        Ok(state.nodes.get(&current).cloned())
    }

    fn path_of(
        &self,
        id: NodeId,
        language: Option<LanguageId>,
    ) -> Result<Option<String>, StorageError> {
        Ok(self.state.read().path_of(id, language))
    }

    fn children_of(&self, id: NodeId) -> Result<Vec<Node>, StorageError> {
        let state = self.state.read();
        state.node(id)?;
        Ok(state
            .nodes
            .values()
            .filter(|n| n.parent == Some(id))
            .cloned()
            .collect())
    }

    fn is_in_trash(&self, id: NodeId) -> Result<bool, StorageError> {
        Ok(self.state.read().in_trash(id))
    }

    fn count_named(
        &self,
        name: &str,
        column: NameColumn,
        parent: Option<NodeId>,
        exclude: Option<NodeId>,
    ) -> Result<usize, StorageError> {
        let state = self.state.read();
        if let NameColumn::Language(language) = column {
            if !state.language_columns.contains(&language) {
                return Err(StorageError::SchemaMismatch(format!(
                    "no name column for language {}",
                    language
                )));
            }
        }
        Ok(state.count_named(name, column, parent, exclude))
    }

    fn upgrade_schema(&self, column: NameColumn) -> Result<(), StorageError> {
        if let NameColumn::Language(language) = column {
            self.state.write().language_columns.insert(language);
        }
        Ok(())
    }

    fn insert(&self, mut node: Node) -> Result<NodeId, StorageError> {
        validate_name(&node.name)?;
        let mut state = self.state.write();
        let parent = node
            .parent
            .ok_or_else(|| StorageError::InvalidPath("a new node needs a parent".to_string()))?;
        state.node(parent)?;
        if node.id.is_some() {
            return Err(StorageError::InvalidPath(format!(
                "node {:?} is already persisted",
                node.name
            )));
        }
        state.check_unique(&node, parent)?;

        let id = state.next_id;
        state.next_id += 1;
        node.id = Some(id);
        state.language_columns.extend(node.language_names.keys().copied());
        state.nodes.insert(id, node);
        Ok(id)
    }
}
