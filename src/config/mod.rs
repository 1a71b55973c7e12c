//! Configuration
//!
//! Explicit configuration values handed to each component at construction.
//! Loaded in layers (defaults, global file, workspace `pathmark.toml`,
//! `PATHMARK__*` environment) through [`ConfigLoader`].

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;
pub mod workspace;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;
pub use workspace::{StorageConfig, StoragePaths};

use crate::error::ApiError;
use crate::language::Language;
use crate::logging::LoggingConfig;
use crate::naming::STAMP_DIGITS;
use crate::sanitize::CharsetMode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;
pub const DEFAULT_MIN_AGE_SECS: u64 = 120;
pub const DEFAULT_MAX_SEGMENTS: usize = 10;

/// Name generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Delimiter placed before numeric suffixes
    pub delimiter: char,
    /// Word delimiters recognized when truncating
    pub delimiters: Vec<char>,
    /// Placeholder name used when nothing better is available
    pub untitled: String,
    pub charset: CharsetMode,
    pub max_length: usize,
    /// Ceiling on existence checks for one unique name search
    pub max_attempts: usize,
    pub random_min_length: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            delimiter: '-',
            delimiters: vec!['-', '_', '.'],
            untitled: "untitled".to_string(),
            charset: CharsetMode::Ascii,
            max_length: 128,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            random_min_length: 6,
        }
    }
}

/// Path history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Nodes younger than this do not get history records
    pub min_age_secs: u64,
    /// Segment peel cap and recursion depth cap of the resolver
    pub max_segments: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            min_age_secs: DEFAULT_MIN_AGE_SECS,
            max_segments: DEFAULT_MAX_SEGMENTS,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathmarkConfig {
    pub naming: NamingConfig,
    pub history: HistoryConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    /// Languages; empty disables multi-language naming
    pub languages: Vec<Language>,
}

impl PathmarkConfig {
    pub fn validate(&self) -> Result<(), ApiError> {
        let naming = &self.naming;
        if naming.delimiters.is_empty() {
            return Err(ApiError::ConfigError(
                "naming.delimiters must not be empty".to_string(),
            ));
        }
        if !naming.delimiters.contains(&naming.delimiter) {
            return Err(ApiError::ConfigError(format!(
                "naming.delimiter {:?} must be one of naming.delimiters",
                naming.delimiter
            )));
        }
        if naming.delimiter.is_ascii_digit() {
            return Err(ApiError::ConfigError(
                "naming.delimiter must not be a digit".to_string(),
            ));
        }
        if naming.untitled.trim().is_empty() {
            return Err(ApiError::ConfigError(
                "naming.untitled must not be empty".to_string(),
            ));
        }
        // room for the delimiter and a full time stamp
        if naming.max_length < STAMP_DIGITS + 1 {
            return Err(ApiError::ConfigError(format!(
                "naming.max_length must be at least {}",
                STAMP_DIGITS + 1
            )));
        }
        if naming.max_attempts == 0 || naming.random_min_length == 0 {
            return Err(ApiError::ConfigError(
                "naming.max_attempts and naming.random_min_length must be positive".to_string(),
            ));
        }
        if self.history.max_segments == 0 {
            return Err(ApiError::ConfigError(
                "history.max_segments must be positive".to_string(),
            ));
        }
        if !self.languages.is_empty() && self.languages.iter().filter(|l| l.is_default).count() != 1
        {
            return Err(ApiError::ConfigError(
                "exactly one configured language must be the default".to_string(),
            ));
        }
        Ok(())
    }

    /// TOML rendering, used to seed a workspace config file.
    pub fn to_toml(&self) -> Result<String, ApiError> {
        toml::to_string_pretty(self)
            .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e)))
    }
}
