//! logrot - rotate, compress and prune log files.
//!
//! Parses arguments, installs the tracing subscriber and hands off to
//! `cli::run`. The process exit code tells the scheduler how the run went:
//! 0 success, 1 failures, 2 usage error, 3 configuration error,
//! 4 nothing matched.

use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use logrot_cli::cli::{Cli, LogLevel, Outcome, run};

/// Guard that ensures the log file is flushed when dropped.
struct LogFileGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

fn env_filter(level: LogLevel) -> EnvFilter {
    let level = level.as_filter_str();
    let filter = if std::env::var("RUST_LOG").is_ok() {
        format!(
            "error,logrot={level},logrot_cli={level},logrot_engine={level},\
             logrot_config={level},logrot_state={level},logrot_common={level}"
        )
    } else {
        level.to_string()
    };
    EnvFilter::new(filter)
}

/// Console logging on stderr, plus an optional plain-text log file.
fn init_logging(level: LogLevel, log_file: Option<&Path>) -> Result<Option<LogFileGuard>> {
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);
            (Some(layer), Some(LogFileGuard { _guard: guard }))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(console)
        .with(file_layer)
        .init();

    Ok(guard)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _log_guard = match init_logging(cli.effective_log_level(), cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e:#}");
            return Outcome::Failed.into();
        }
    };

    match run(&cli) {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Run aborted");
            Outcome::Failed.into()
        }
    }
}
