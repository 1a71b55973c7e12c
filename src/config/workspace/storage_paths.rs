//! StorageConfig and resolve_paths for workspace storage.

use crate::config::xdg;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_HISTORY_PATH: &str = ".pathmark/history";
const DEFAULT_TREE_FILE: &str = "tree.json";

fn default_history_path() -> PathBuf {
    PathBuf::from(DEFAULT_HISTORY_PATH)
}

fn default_tree_file() -> PathBuf {
    PathBuf::from(DEFAULT_TREE_FILE)
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path history database (relative to workspace root). The default lives
    /// in the XDG data directory instead of the workspace.
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,

    /// Tree snapshot file (relative to workspace root)
    #[serde(default = "default_tree_file")]
    pub tree_file: PathBuf,
}

/// Resolved storage locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub history: PathBuf,
    pub tree: PathBuf,
}

impl StorageConfig {
    /// Resolve storage paths to actual filesystem locations.
    pub fn resolve_paths(&self, workspace_root: &Path) -> Result<StoragePaths, ApiError> {
        let history = if self.history_path == Path::new(DEFAULT_HISTORY_PATH) {
            xdg::workspace_data_dir(workspace_root)?.join("history")
        } else {
            workspace_root.join(&self.history_path)
        };

        Ok(StoragePaths {
            history,
            tree: workspace_root.join(&self.tree_file),
        })
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
            tree_file: default_tree_file(),
        }
    }
}
