//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::PathmarkConfig;
use crate::error::ApiError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration for a workspace.
    pub fn load(workspace_root: &Path) -> Result<PathmarkConfig, ApiError> {
        let config = MergeService::load(workspace_root)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<PathmarkConfig, ApiError> {
        let config = MergeService::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default() -> PathmarkConfig {
        PathmarkConfig::default()
    }
}
