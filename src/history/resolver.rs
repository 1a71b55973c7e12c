//! Resolving former paths
//!
//! A request path that matches no live node is looked up in the history. When
//! the full path was never recorded, trailing segments are peeled off until an
//! ancestor's former path matches; the peeled segments are then re-attached
//! to that ancestor's current path and looked up live. A live miss there
//! starts another round from the reconstructed path, up to a depth cap.

use super::PathHistoryStore;
use crate::config::HistoryConfig;
use crate::error::{ResolveError, StorageError};
use crate::sanitize::{CharsetMode, DefaultSanitizer, NameSanitizer};
use crate::tree::{join_path, Node, TreeStore};
use crate::types::{LanguageId, NodeId, DEFAULT_LANGUAGE};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a history lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// `language` is set when the matching record was language-tagged
    Found {
        node: Node,
        language: Option<LanguageId>,
    },
    NotFound,
    /// The reconstruction chain hit the depth cap
    DepthExceeded,
}

/// Where a former path now lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub node_id: NodeId,
    pub language: Option<LanguageId>,
    /// Current live path in `language`
    pub location: String,
}

pub struct PathResolver {
    store: Arc<dyn PathHistoryStore>,
    tree: Arc<dyn TreeStore>,
    sanitizer: Arc<dyn NameSanitizer>,
    charset: CharsetMode,
    max_segments: usize,
}

impl PathResolver {
    pub fn new(
        store: Arc<dyn PathHistoryStore>,
        tree: Arc<dyn TreeStore>,
        config: &HistoryConfig,
    ) -> Self {
        Self {
            store,
            tree,
            sanitizer: Arc::new(DefaultSanitizer::default()),
            charset: CharsetMode::default(),
            max_segments: config.max_segments,
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn NameSanitizer>, charset: CharsetMode) -> Self {
        self.sanitizer = sanitizer;
        self.charset = charset;
        self
    }

    pub fn resolve(&self, path: &str) -> Result<Resolution, StorageError> {
        self.resolve_at(path, 0)
    }

    /// One resolution round; `depth` counts reconstructions already attempted.
    pub fn resolve_at(&self, path: &str, depth: usize) -> Result<Resolution, StorageError> {
        if depth >= self.max_segments {
            warn!(path = %path, depth, "Path history resolution exceeded its depth cap");
            return Ok(Resolution::DepthExceeded);
        }
        let path = self.sanitizer.path_name(path, self.charset);
        if path == "/" {
            return Ok(Resolution::NotFound);
        }

        let mut remaining = path.as_str();
        let mut peeled: Vec<&str> = Vec::new();
        let mut lookups = 0;
        let record = loop {
            lookups += 1;
            if let Some(record) = self.store.get(remaining)? {
                break record;
            }
            let cut = match remaining.rfind('/') {
                Some(cut) if cut > 0 && lookups < self.max_segments => cut,
                _ => {
                    debug!(path = %path, lookups, "No path history match");
                    return Ok(Resolution::NotFound);
                }
            };
            peeled.push(&remaining[cut + 1..]);
            remaining = &remaining[..cut];
        };

        let language = Some(record.language_id).filter(|l| *l != DEFAULT_LANGUAGE);
        let matched = match self.live_node(record.node_id)? {
            Some(node) => node,
            None => return Ok(Resolution::NotFound),
        };
        if peeled.is_empty() {
            debug!(path = %path, node_id = record.node_id, "Path history hit");
            return Ok(Resolution::Found {
                node: matched,
                language,
            });
        }

        let live_base = match self.tree.path_of(record.node_id, language)? {
            Some(base) => base,
            None => return Ok(Resolution::NotFound),
        };
        peeled.reverse();
        let candidate = join_path(&live_base, &peeled.join("/"));
        if candidate == path {
            return Ok(Resolution::NotFound);
        }
        debug!(path = %path, candidate = %candidate, depth, "Trying reconstructed path");

        if let Some(node) = self.tree.find_by_path(&candidate, language)? {
            if let Some(id) = node.id {
                if !self.tree.is_in_trash(id)? {
                    return Ok(Resolution::Found { node, language });
                }
            }
        }
        self.resolve_at(&candidate, depth + 1)
    }

    fn live_node(&self, node_id: NodeId) -> Result<Option<Node>, StorageError> {
        if self.tree.is_in_trash(node_id)? {
            return Ok(None);
        }
        self.tree.get(node_id)
    }

    /// Redirect target for a former path, if it leads to a live node.
    ///
    /// Hitting the depth cap is an error rather than `None`, so callers can
    /// tell a loop in the history apart from a path nobody ever used.
    pub fn resolve_path(&self, path: &str) -> Result<Option<Redirect>, ResolveError> {
        let (node, language) = match self.resolve(path)? {
            Resolution::Found { node, language } => (node, language),
            Resolution::NotFound => return Ok(None),
            Resolution::DepthExceeded => {
                return Err(ResolveError::DepthExceeded {
                    path: path.to_string(),
                    depth: self.max_segments,
                })
            }
        };
        let node_id = match node.id {
            Some(id) => id,
            None => return Ok(None),
        };
        Ok(self
            .tree
            .path_of(node_id, language)?
            .map(|location| Redirect {
                node_id,
                language,
                location,
            }))
    }
}
