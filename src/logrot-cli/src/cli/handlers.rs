//! Run execution: configuration, state, rotation, exit status.

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use logrot_common::ShellScriptRunner;
use logrot_config::Config;
use logrot_engine::{CommandMailer, RunContext, RunOptions, RunSummary, Rotator, SystemClock};
use logrot_state::StateStore;

use super::args::Cli;

/// How a run ended, as seen by the calling scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Some file or lifecycle script failed.
    Failed,
    /// Configuration could not be loaded; nothing was rotated.
    ConfigError,
    /// No section matched an existing file.
    NothingMatched,
}

impl Outcome {
    pub fn code(self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::Failed => 1,
            Outcome::ConfigError => 3,
            Outcome::NothingMatched => 4,
        }
    }

    /// "Nothing matched" wins over per-file failures.
    pub fn from_summary(summary: &RunSummary) -> Self {
        if !summary.matched_any() {
            Outcome::NothingMatched
        } else if summary.has_failures() {
            Outcome::Failed
        } else {
            Outcome::Success
        }
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        ExitCode::from(outcome.code())
    }
}

/// Load configuration, open the state file and rotate.
///
/// Configuration errors are reported and turned into
/// [`Outcome::ConfigError`]; a state file that cannot be opened is an error.
pub fn run(cli: &Cli) -> Result<Outcome> {
    let config = match Config::load(cli.configs.as_slice()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration error");
            return Ok(Outcome::ConfigError);
        }
    };
    info!(sections = config.sections.len(), "Configuration loaded");

    let state_path = cli.state_path();
    let state = if cli.debug {
        StateStore::open_read_only(&state_path)
    } else {
        StateStore::open(&state_path)
    }
    .with_context(|| format!("Failed to open state file {}", state_path.display()))?;

    let clock = SystemClock;
    let scripts = ShellScriptRunner::new(&cli.shell);
    let mailer = CommandMailer::new(cli.mail.clone());
    let options = RunOptions {
        force: cli.force,
        dry_run: cli.debug,
        script_failure: cli.script_error,
    };

    let mut ctx = RunContext::new(config.sections, state, &clock, &scripts, &mailer, options);
    let summary = Rotator::run(&mut ctx);

    let outcome = Outcome::from_summary(&summary);
    if outcome == Outcome::NothingMatched {
        warn!("No log files matched any configuration section");
    }
    Ok(outcome)
}
