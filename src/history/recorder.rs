//! Recording former paths
//!
//! [`PathHistory`] writes history records, either directly through
//! [`PathHistory::record_old_path`] or as a [`TreeListener`] reacting to
//! renames, moves and deletions.

use super::{HistoryRecord, PathHistoryStore};
use crate::clock::{Clock, SystemClock};
use crate::config::HistoryConfig;
use crate::error::StorageError;
use crate::language::LanguageProvider;
use crate::sanitize::{CharsetMode, DefaultSanitizer, NameSanitizer};
use crate::tree::{join_path, Node, Relocation, TreeEvent, TreeListener, TreeStore};
use crate::types::{LanguageId, NodeId, DEFAULT_LANGUAGE};
use chrono::Duration;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct ListPathsOptions {
    /// Only records of this language; `None` lists all
    pub language: Option<LanguageId>,
}

pub struct PathHistory {
    store: Arc<dyn PathHistoryStore>,
    tree: Arc<dyn TreeStore>,
    languages: Option<Arc<dyn LanguageProvider>>,
    sanitizer: Arc<dyn NameSanitizer>,
    charset: CharsetMode,
    clock: Arc<dyn Clock>,
    config: HistoryConfig,
}

impl PathHistory {
    pub fn new(
        store: Arc<dyn PathHistoryStore>,
        tree: Arc<dyn TreeStore>,
        config: HistoryConfig,
    ) -> Self {
        Self {
            store,
            tree,
            languages: None,
            sanitizer: Arc::new(DefaultSanitizer::default()),
            charset: CharsetMode::default(),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_languages(mut self, languages: Arc<dyn LanguageProvider>) -> Self {
        self.languages = Some(languages);
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn NameSanitizer>, charset: CharsetMode) -> Self {
        self.sanitizer = sanitizer;
        self.charset = charset;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn PathHistoryStore> {
        &self.store
    }

    fn language_id(&self, language: Option<LanguageId>) -> LanguageId {
        match (language, &self.languages) {
            (Some(l), Some(provider)) if provider.is_default(l) => DEFAULT_LANGUAGE,
            (Some(l), _) => l,
            (None, _) => DEFAULT_LANGUAGE,
        }
    }

    /// Record `path` as a former location of `node_id`.
    ///
    /// A path already recorded keeps its first owner. Any record equal to the
    /// node's current live path is removed afterwards, since the live node
    /// shadows it. Returns whether a record was written and kept.
    pub fn record_old_path(
        &self,
        node_id: NodeId,
        path: &str,
        language: Option<LanguageId>,
    ) -> Result<bool, StorageError> {
        let path = self.sanitizer.path_name(path, self.charset);
        if path == "/" {
            debug!(node_id, "Not recording the root path");
            return Ok(false);
        }
        let language_id = self.language_id(language);
        let record = HistoryRecord {
            path: path.clone(),
            node_id,
            language_id,
            created: self.clock.now(),
        };

        let inserted = match self.store.insert(&record) {
            Ok(()) => {
                info!(node_id, path = %path, language_id, "Recorded former path");
                true
            }
            Err(StorageError::Duplicate(_)) => {
                debug!(node_id, path = %path, "Path already in history, keeping first owner");
                false
            }
            Err(e) => return Err(e),
        };

        let mut live_paths = BTreeSet::new();
        if let Some(live) = self.tree.path_of(node_id, None)? {
            live_paths.insert(live);
        }
        if language_id != DEFAULT_LANGUAGE {
            if let Some(live) = self.tree.path_of(node_id, Some(language_id))? {
                live_paths.insert(live);
            }
        }
        for live in &live_paths {
            if self.store.delete_path(live)? {
                debug!(node_id, path = %live, "Dropped history record shadowed by live path");
            }
        }
        Ok(inserted && !live_paths.contains(&path))
    }

    /// Forget every former path of a node.
    pub fn purge(&self, node_id: NodeId) -> Result<usize, StorageError> {
        let removed = self.store.delete_node(node_id)?;
        if removed > 0 {
            info!(node_id, removed, "Purged path history");
        }
        Ok(removed)
    }

    /// Former paths of a node, oldest first.
    pub fn list_paths(
        &self,
        node_id: NodeId,
        options: &ListPathsOptions,
    ) -> Result<Vec<HistoryRecord>, StorageError> {
        let mut records = self.store.records_for(node_id)?;
        if let Some(language) = options.language {
            let language_id = self.language_id(Some(language));
            records.retain(|r| r.language_id == language_id);
        }
        Ok(records)
    }

    pub fn list_path_strings(
        &self,
        node_id: NodeId,
        options: &ListPathsOptions,
    ) -> Result<Vec<String>, StorageError> {
        Ok(self
            .list_paths(node_id, options)?
            .into_iter()
            .map(|r| r.path)
            .collect())
    }

    fn on_relocated(&self, relocation: &Relocation) -> Result<(), StorageError> {
        let node_id = relocation.node_id;
        let node = match self.tree.get(node_id)? {
            Some(node) => node,
            None => return Ok(()),
        };
        let age = self.clock.now().signed_duration_since(node.created);
        if age < Duration::seconds(self.config.min_age_secs as i64) {
            debug!(node_id, "Node too young for path history");
            return Ok(());
        }
        if self.tree.is_in_trash(node_id)? {
            debug!(node_id, "Node in trash, not recording path history");
            return Ok(());
        }

        let parent = match relocation.previous_parent.or(node.parent) {
            Some(parent) => parent,
            None => return Ok(()),
        };
        let previous_name = relocation.previous_name.as_deref().unwrap_or(&node.name);
        let previous_default = match self.tree.path_of(parent, None)? {
            Some(parent_path) => join_path(&parent_path, previous_name),
            None => return Ok(()),
        };
        let current_default = self.tree.path_of(node_id, None)?;
        if current_default.as_deref() != Some(previous_default.as_str()) {
            self.record_old_path(node_id, &previous_default, None)?;
        }

        for language in self.alternate_languages(&node, relocation) {
            let previous_name = relocation
                .previous_language_names
                .get(&language)
                .map(String::as_str)
                .unwrap_or_else(|| node.name_in(Some(language)));
            let previous = match self.tree.path_of(parent, Some(language))? {
                Some(parent_path) => join_path(&parent_path, previous_name),
                None => continue,
            };
            let current = self.tree.path_of(node_id, Some(language))?;
            if previous != previous_default && current.as_deref() != Some(previous.as_str()) {
                self.record_old_path(node_id, &previous, Some(language))?;
            }
        }
        Ok(())
    }

    fn alternate_languages(&self, node: &Node, relocation: &Relocation) -> BTreeSet<LanguageId> {
        match &self.languages {
            Some(provider) => provider
                .alternate_languages()
                .into_iter()
                .map(|l| l.id)
                .collect(),
            None => node
                .language_names
                .keys()
                .chain(relocation.previous_language_names.keys())
                .copied()
                .filter(|l| *l != DEFAULT_LANGUAGE)
                .collect(),
        }
    }
}

impl TreeListener for PathHistory {
    fn on_event(&self, event: &TreeEvent) {
        let (node_id, result) = match event {
            TreeEvent::Relocated(relocation) => {
                (relocation.node_id, self.on_relocated(relocation))
            }
            TreeEvent::Deleted { node_id } => (*node_id, self.purge(*node_id).map(|_| ())),
        };
        if let Err(e) = result {
            error!(node_id, error = %e, "Failed to update path history");
        }
    }
}
