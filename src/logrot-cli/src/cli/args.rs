//! Command-line argument definitions.

use std::path::PathBuf;

use clap::Parser;

use logrot_common::DEFAULT_SHELL;
use logrot_engine::{DEFAULT_MAIL_COMMAND, ScriptFailurePolicy};

/// File name of the state ledger under the per-user data directory.
pub const DEFAULT_STATE_FILE: &str = "logrot.status";

/// Log verbosity level for CLI output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Only show errors
    Error,
    /// Show warnings and errors
    Warn,
    /// Show informational messages, warnings, and errors (default)
    #[default]
    Info,
    /// Show debug messages and above
    Debug,
    /// Show all messages including trace-level details
    Trace,
}

impl LogLevel {
    /// Convert to tracing filter string.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Option<LogLevel> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

/// Rotate, compress, and prune log files according to configuration files.
#[derive(Debug, Parser)]
#[command(name = "logrot")]
#[command(author, version)]
#[command(about = "Rotate, compress and prune log files", long_about = None)]
pub struct Cli {
    /// Configuration files or directories, read in order
    #[arg(required = true, value_name = "CONFIG")]
    pub configs: Vec<PathBuf>,

    /// Dry run: log every action without touching files, state or scripts
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Rotate every matched file, even when not due
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// State file recording the last rotation date of each log
    #[arg(short = 's', long = "state", env = "LOGROT_STATE", value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Command used to mail rotated logs
    #[arg(short = 'm', long = "mail", default_value = DEFAULT_MAIL_COMMAND, value_name = "COMMAND")]
    pub mail: String,

    /// Also write all log output to this file
    #[arg(short = 'l', long = "log", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Enable verbose output (same as --log-level debug)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Enable trace-level output
    #[arg(long = "trace")]
    pub trace: bool,

    /// Log level for console output
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// What a failing lifecycle script does: continue or skip-file
    #[arg(long = "script-error", default_value_t = ScriptFailurePolicy::Continue, value_name = "POLICY")]
    pub script_error: ScriptFailurePolicy,

    /// Shell used to run lifecycle scripts
    #[arg(long = "shell", default_value = DEFAULT_SHELL, value_name = "PATH")]
    pub shell: PathBuf,
}

impl Cli {
    /// Console level: `--trace`, then `--verbose`/`--debug`, then
    /// `LOGROT_LOG_LEVEL`, then `--log-level`.
    pub fn effective_log_level(&self) -> LogLevel {
        if self.trace {
            LogLevel::Trace
        } else if self.verbose || self.debug {
            LogLevel::Debug
        } else if let Ok(env_level) = std::env::var("LOGROT_LOG_LEVEL") {
            LogLevel::from_str_loose(&env_level).unwrap_or(self.log_level)
        } else {
            self.log_level
        }
    }

    /// `--state`/`LOGROT_STATE`, else the per-user default.
    pub fn state_path(&self) -> PathBuf {
        self.state.clone().unwrap_or_else(default_state_path)
    }
}

/// `<data_local_dir>/logrot/logrot.status`, or `./logrot.status` when the
/// platform has no data directory.
pub fn default_state_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("logrot").join(DEFAULT_STATE_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE))
}
