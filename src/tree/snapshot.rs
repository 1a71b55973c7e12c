//! JSON snapshot of a tree, used by the CLI to keep the tree between runs.

use super::Node;
use crate::error::StorageError;
use crate::types::{LanguageId, NodeId};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeSnapshot {
    #[serde(default)]
    pub next_id: NodeId,
    #[serde(default)]
    pub language_columns: Vec<LanguageId>,
    /// Every node except the root
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl TreeSnapshot {
    /// Load a snapshot; a missing file yields an empty tree.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
