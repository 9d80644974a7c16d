//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, TimeZone};
use tempfile::TempDir;

use logrot_common::{ScriptOutput, ScriptRunner};
use logrot_config::{ConfigParser, Section};
use logrot_engine::{
    FixedClock, MailError, MailRequest, Mailer, RunContext, RunOptions, RunSummary, Rotator,
};
use logrot_state::StateStore;

/// One recorded script invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCall {
    /// First non-blank line of the script, trimmed.
    pub script: String,
    pub arg: String,
}

/// Records invocations instead of spawning a shell. A script whose body
/// contains `exit 1` reports failure.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<ScriptCall>>,
}

impl RecordingRunner {
    pub fn calls(&self) -> Vec<ScriptCall> {
        self.calls.borrow().clone()
    }

    /// `(script, arg)` pairs, for compact assertions.
    pub fn summary(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .map(|c| (c.script, c.arg))
            .collect()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl ScriptRunner for RecordingRunner {
    fn run(&self, lines: &[String], arg: &str) -> logrot_common::Result<ScriptOutput> {
        let script = lines
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
            .unwrap_or_default()
            .to_string();
        self.calls.borrow_mut().push(ScriptCall {
            script,
            arg: arg.to_string(),
        });

        if lines.iter().any(|l| l.trim() == "exit 1") {
            Ok(ScriptOutput {
                exit_code: Some(1),
                ..ScriptOutput::default()
            })
        } else {
            Ok(ScriptOutput::succeeded())
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: RefCell<Vec<MailRequest>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<MailRequest> {
        self.sent.borrow().clone()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, request: &MailRequest) -> Result<(), MailError> {
        self.sent.borrow_mut().push(request.clone());
        Ok(())
    }
}

pub fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

/// A scratch log directory, a state file and deterministic collaborators.
pub struct Harness {
    pub root: TempDir,
    pub clock: FixedClock,
    pub scripts: RecordingRunner,
    pub mailer: RecordingMailer,
}

impl Harness {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("logs")).unwrap();
        Self {
            root,
            clock: FixedClock::new(local(2024, 3, 7, 12)),
            scripts: RecordingRunner::default(),
            mailer: RecordingMailer::default(),
        }
    }

    pub fn logs(&self) -> PathBuf {
        self.root.path().join("logs")
    }

    pub fn log(&self, name: &str) -> PathBuf {
        self.logs().join(name)
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.path().join("state").join("logrot.status")
    }

    pub fn write_log(&self, name: &str, content: &str) -> PathBuf {
        let path = self.log(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.log(name)).unwrap()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.log(name).exists()
    }

    /// Sorted file names in the log directory.
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.logs())
            .unwrap()
            .flatten()
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    /// Parse configuration text; `{logs}` expands to the log directory.
    pub fn sections(&self, text: &str) -> Vec<Section> {
        let text = text.replace("{logs}", &self.logs().to_string_lossy());
        let mut parser = ConfigParser::new();
        parser
            .parse_str(&self.root.path().join("test.conf"), &text)
            .unwrap();
        parser.finish().sections
    }

    pub fn run_with(&self, text: &str, options: RunOptions) -> RunSummary {
        let state = if options.dry_run {
            StateStore::open_read_only(self.state_path()).unwrap()
        } else {
            StateStore::open(self.state_path()).unwrap()
        };
        let mut ctx = RunContext::new(
            self.sections(text),
            state,
            &self.clock,
            &self.scripts,
            &self.mailer,
            options,
        );
        Rotator::run(&mut ctx)
    }

    pub fn run(&self, text: &str) -> RunSummary {
        self.run_with(text, RunOptions::default())
    }

    pub fn force(&self, text: &str) -> RunSummary {
        self.run_with(
            text,
            RunOptions {
                force: true,
                ..RunOptions::default()
            },
        )
    }

    pub fn set_mtime(&self, name: &str, when: DateTime<Local>) {
        let file = fs::File::options().write(true).open(self.log(name)).unwrap();
        file.set_modified(SystemTime::from(when)).unwrap();
    }
}

pub fn is_gzip(path: &Path) -> bool {
    logrot_engine::compress::is_gzip(path).unwrap()
}
