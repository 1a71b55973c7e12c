//! Error types
//!
//! Every failure surfaced by the crate is attributable to one of a small set of
//! kinds (see [`ErrorKind`]) so hosts can decide between a 404, a log line, or a
//! hard failure of the request.

use crate::types::NodeId;
use thiserror::Error;

/// Storage layer errors (tree storage and path history storage)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A uniqueness constraint rejected the write
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    /// The query referenced a column the store does not have yet
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
}

impl StorageError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StorageError::Duplicate(_))
    }
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        match err {
            sled::Error::Io(e) => StorageError::IoError(e),
            other => StorageError::Database(other.to_string()),
        }
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Name generation errors
#[derive(Debug, Error)]
pub enum NamingError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("No unique name found after {attempts} attempts (last candidate: {last})")]
    Exhausted { attempts: usize, last: String },

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
}

/// Former-path resolution errors
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Reconstructed paths kept missing live nodes until the depth cap
    #[error("Resolution of {path} stopped at depth {depth}")]
    DepthExceeded { path: String, depth: usize },
}

/// Top-level error used by configuration, logging and the CLI
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Naming error: {0}")]
    Naming(#[from] NamingError),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Path resolution exceeded its depth budget: {0}")]
    ResolutionExhausted(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Storage(e) => ApiError::StorageError(e),
            ResolveError::DepthExceeded { path, .. } => ApiError::ResolutionExhausted(path),
        }
    }
}

/// Failure attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Uniqueness constraint violation
    Conflict,
    /// Store is on an older schema
    SchemaMismatch,
    /// Input that could not be interpreted
    MalformedInput,
    /// An iteration or recursion budget ran out
    Exhausted,
    Storage,
    Config,
    NotFound,
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Duplicate(_) => ErrorKind::Conflict,
            StorageError::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            StorageError::InvalidPath(_) => ErrorKind::MalformedInput,
            StorageError::NodeNotFound(_) => ErrorKind::NotFound,
            StorageError::IoError(_)
            | StorageError::Database(_)
            | StorageError::Serialization(_) => ErrorKind::Storage,
        }
    }
}

impl NamingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NamingError::Storage(e) => e.kind(),
            NamingError::Exhausted { .. } => ErrorKind::Exhausted,
            NamingError::NodeNotFound(_) => ErrorKind::NotFound,
        }
    }
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::Storage(e) => e.kind(),
            ResolveError::DepthExceeded { .. } => ErrorKind::Exhausted,
        }
    }
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::ConfigError(_) => ErrorKind::Config,
            ApiError::StorageError(e) => e.kind(),
            ApiError::Naming(e) => e.kind(),
            ApiError::NodeNotFound(_) | ApiError::PathNotFound(_) => ErrorKind::NotFound,
            ApiError::ResolutionExhausted(_) => ErrorKind::Exhausted,
            ApiError::InvalidInput(_) => ErrorKind::MalformedInput,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_attributed_through_wrappers() {
        let dup = ApiError::from(NamingError::from(StorageError::Duplicate("/a".into())));
        assert_eq!(dup.kind(), ErrorKind::Conflict);

        let exhausted = ApiError::from(NamingError::Exhausted {
            attempts: 3,
            last: "page-3".into(),
        });
        assert_eq!(exhausted.kind(), ErrorKind::Exhausted);

        assert!(StorageError::Duplicate("x".into()).is_duplicate());
        assert!(!StorageError::Database("x".into()).is_duplicate());
    }

    #[test]
    fn test_depth_cap_maps_to_resolution_exhausted() {
        let err = ApiError::from(ResolveError::DepthExceeded {
            path: "/x/q".into(),
            depth: 3,
        });
        assert!(matches!(&err, ApiError::ResolutionExhausted(path) if path == "/x/q"));
        assert_eq!(err.kind(), ErrorKind::Exhausted);
    }
}
