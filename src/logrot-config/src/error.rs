//! Error types for logrot-config.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration error types.
///
/// Every variant raised while reading a file carries the file and the
/// 1-based line of the offending text.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error while reading a configuration file or directory.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Keyword is not part of the directive table.
    #[error("{path}:{line}: unknown directive '{directive}'")]
    UnknownDirective {
        path: PathBuf,
        line: usize,
        directive: String,
    },

    /// Directive needs an argument that was not given.
    #[error("{path}:{line}: '{directive}' requires an argument")]
    MissingArgument {
        path: PathBuf,
        line: usize,
        directive: String,
    },

    /// Directive argument could not be parsed.
    #[error("{path}:{line}: invalid argument '{value}' for '{directive}': {reason}")]
    InvalidArgument {
        path: PathBuf,
        line: usize,
        directive: String,
        value: String,
        reason: String,
    },

    /// Structural problem: stray brace, nested section, bad quoting.
    #[error("{path}:{line}: {message}")]
    Syntax {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A section was opened and never closed.
    #[error("{path}:{line}: section is missing its closing '}}'")]
    UnterminatedSection { path: PathBuf, line: usize },

    /// A script block was opened and never closed with `endscript`.
    #[error("{path}:{line}: script block is missing 'endscript'")]
    UnterminatedScript { path: PathBuf, line: usize },

    /// `include` target does not exist.
    #[error("{path}:{line}: include target {target} does not exist")]
    IncludeNotFound {
        path: PathBuf,
        line: usize,
        target: PathBuf,
    },

    /// A file includes itself, directly or through other files.
    #[error("include cycle detected at {0}")]
    IncludeCycle(PathBuf),

    /// A path pattern is not a valid glob.
    #[error("invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
