use std::path::PathBuf;
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Allocation failed: {0}")]
    AllocationFailed(String),
    #[error("Capacity overflow while growing {0}")]
    CapacityOverflow(&'static str),
    #[error("Thread pool unavailable: {0}")]
    PoolUnavailable(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Chunk search failed: {0}")]
    ChunkFailed(String),
}

impl SearchError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn allocation_failed(msg: impl Into<String>) -> Self {
        Self::AllocationFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn chunk_failed(msg: impl Into<String>) -> Self {
        Self::ChunkFailed(msg.into())
    }

    /// Process exit status the CLI layer maps errors to. Any error is an
    /// unrecoverable condition for the invocation that produced it.
    pub fn exit_code(&self) -> i32 {
        2
    }
}
