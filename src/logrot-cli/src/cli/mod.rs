//! CLI argument parsing and run dispatch.
//!
//! - `args` - command-line argument structures
//! - `handlers` - load configuration, rotate, map the outcome to an exit code

pub mod args;
pub mod handlers;

pub use args::{Cli, DEFAULT_STATE_FILE, LogLevel, default_state_path};
pub use handlers::{Outcome, run};
