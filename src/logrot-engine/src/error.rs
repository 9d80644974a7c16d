//! Error types for logrot-engine.

use std::path::PathBuf;

use logrot_config::ScriptKind;
use logrot_state::StateError;
use thiserror::Error;

/// Why one file's rotation was abandoned.
#[derive(Debug, Error)]
pub enum RotateError {
    /// A filesystem operation failed.
    #[error("cannot {op} {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rotated name is already taken.
    #[error("destination {0} already exists")]
    DestinationExists(PathBuf),

    /// External compressor failed.
    #[error("compressor {command} failed on {path} (exit {status:?}): {stderr}")]
    Compressor {
        command: String,
        path: PathBuf,
        status: Option<i32>,
        stderr: String,
    },

    /// A lifecycle script failed under the skip-file policy.
    #[error("{kind} script failed for {path}")]
    Script { kind: ScriptKind, path: PathBuf },

    /// Recording the rotation date failed.
    #[error(transparent)]
    State(#[from] StateError),
}

impl RotateError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| RotateError::Io { op, path, source }
    }
}

/// Result type for rotation operations.
pub type Result<T> = std::result::Result<T, RotateError>;

/// Mail delivery error.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot run mail command {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("mail command {command} exited with {status:?}: {stderr}")]
    Failed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },
}
