//! Lifecycle script execution.
//!
//! Each script block from the configuration (`prerotate`, `postrotate`,
//! `preremove`, `firstaction`, `lastaction`) is written to a temporary file and
//! run through a shell with the affected log path as `$1`. Stdout and stderr
//! are captured separately so the caller can log them at different levels.
//!
//! There is no timeout: a script that never exits blocks the run.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::debug;

use crate::{Result, ScriptError};

/// Shell used when none is configured.
#[cfg(unix)]
pub const DEFAULT_SHELL: &str = "/bin/sh";
#[cfg(windows)]
pub const DEFAULT_SHELL: &str = "cmd.exe";

/// Output streams from a finished script, kept separate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutput {
    /// Standard output content
    pub stdout: String,
    /// Standard error content
    pub stderr: String,
    /// Exit code, `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl ScriptOutput {
    /// Create from process output
    pub fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        }
    }

    /// A script that exited 0 without writing to stderr.
    pub fn succeeded() -> Self {
        Self {
            exit_code: Some(0),
            ..Self::default()
        }
    }

    /// Check if there was any stderr output
    pub fn has_stderr(&self) -> bool {
        !self.stderr.trim().is_empty()
    }

    /// A script fails on a non-zero exit status or on any stderr output.
    pub fn is_failure(&self) -> bool {
        self.exit_code != Some(0) || self.has_stderr()
    }
}

/// Runs a lifecycle script and reports what it printed.
///
/// The rotation core only needs pass/fail plus the captured streams; the
/// shell mechanics stay behind this trait so tests can substitute a recorder.
pub trait ScriptRunner {
    /// Execute `lines` as one script with `arg` as its first positional argument.
    fn run(&self, lines: &[String], arg: &str) -> Result<ScriptOutput>;
}

/// Materialises scripts as temporary files and runs them with a shell.
#[derive(Debug, Clone)]
pub struct ShellScriptRunner {
    shell: PathBuf,
}

impl Default for ShellScriptRunner {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl ShellScriptRunner {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub fn shell(&self) -> &Path {
        &self.shell
    }

    fn command_for(&self, script: &Path, arg: &str) -> Command {
        let mut command = Command::new(&self.shell);
        if cfg!(windows) {
            command.arg("/C");
        }
        command.arg(script).arg(arg);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command
    }
}

impl ScriptRunner for ShellScriptRunner {
    fn run(&self, lines: &[String], arg: &str) -> Result<ScriptOutput> {
        if lines.iter().all(|l| l.trim().is_empty()) {
            return Err(ScriptError::Empty);
        }

        let suffix = if cfg!(windows) { ".cmd" } else { ".sh" };
        let mut file = tempfile::Builder::new()
            .prefix("logrot-")
            .suffix(suffix)
            .tempfile()?;
        for line in lines {
            writeln!(file, "{}", line)?;
        }
        file.flush()?;

        debug!(
            shell = %self.shell.display(),
            script = %file.path().display(),
            arg,
            "Running lifecycle script"
        );

        let output = self
            .command_for(file.path(), arg)
            .output()
            .map_err(|source| ScriptError::Spawn {
                shell: self.shell.display().to_string(),
                source,
            })?;

        Ok(ScriptOutput::from_output(&output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_failure_rules() {
        assert!(!ScriptOutput::succeeded().is_failure());

        let nonzero = ScriptOutput {
            exit_code: Some(1),
            ..ScriptOutput::default()
        };
        assert!(nonzero.is_failure());

        let noisy = ScriptOutput {
            stderr: "warning: disk almost full\n".to_string(),
            exit_code: Some(0),
            ..ScriptOutput::default()
        };
        assert!(noisy.is_failure());

        let signalled = ScriptOutput::default();
        assert!(signalled.is_failure());
    }

    #[test]
    fn test_empty_script_is_rejected() {
        let runner = ShellScriptRunner::default();
        let err = runner.run(&["   ".to_string()], "").unwrap_err();
        assert!(matches!(err, ScriptError::Empty));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_runner_passes_argument() {
        let runner = ShellScriptRunner::default();
        let lines = vec!["echo \"rotating $1\"".to_string()];
        let output = runner.run(&lines, "/var/log/app.log").unwrap();

        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout.trim(), "rotating /var/log/app.log");
        assert!(!output.is_failure());
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_runner_reports_stderr_and_status() {
        let runner = ShellScriptRunner::default();
        let lines = vec!["echo oops >&2".to_string(), "exit 3".to_string()];
        let output = runner.run(&lines, "").unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stderr.trim(), "oops");
        assert!(output.is_failure());
    }

    #[test]
    fn test_missing_shell_is_spawn_error() {
        let runner = ShellScriptRunner::new("/definitely/not/a/shell");
        let err = runner.run(&["true".to_string()], "").unwrap_err();
        assert!(matches!(err, ScriptError::Spawn { .. }));
    }
}
