//! Error types for logrot-state.

use std::path::PathBuf;
use thiserror::Error;

/// State store error types.
#[derive(Debug, Error)]
pub enum StateError {
    /// IO error while reading or writing the state file.
    #[error("state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The state path names a directory.
    #[error("state path {0} is a directory")]
    IsDirectory(PathBuf),
}

/// Result type for state operations.
pub type Result<T> = std::result::Result<T, StateError>;
