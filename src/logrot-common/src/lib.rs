//! Shared collaborators for the logrot crates.
//!
//! Nothing in here makes rotation decisions. These are the thin I/O
//! wrappers the engine talks to through narrow interfaces:
//! - `script` - lifecycle script execution (`ScriptRunner`)
//! - `path_utils` - home expansion, lexical normalisation, separator folding
//! - `size` - human-readable size arguments (`10k`, `5M`, `1G`)

pub mod path_utils;
pub mod script;
pub mod size;

pub use path_utils::{
    PathError, PathResult, expand_home_path, normalize_path, normalize_separators,
    resolve_against,
};
pub use script::{ScriptOutput, ScriptRunner, ShellScriptRunner, DEFAULT_SHELL};
pub use size::{SizeParseError, parse_size};

use thiserror::Error;

/// Errors raised while materialising or spawning a lifecycle script.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Script has no lines to execute")]
    Empty,
    #[error("Failed to spawn shell {shell}: {source}")]
    Spawn {
        shell: String,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScriptError>;
