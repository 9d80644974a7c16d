//! Per-invocation state handed to the rotator.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use logrot_common::ScriptRunner;
use logrot_config::Section;
use logrot_state::StateStore;

use crate::clock::Clock;
use crate::mail::Mailer;

/// What a failing lifecycle script does to the rotation it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptFailurePolicy {
    /// Log it, keep rotating, report failure in the exit status.
    #[default]
    Continue,
    /// A failing `firstaction` or `prerotate` abandons the files it covers.
    SkipFile,
}

impl ScriptFailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptFailurePolicy::Continue => "continue",
            ScriptFailurePolicy::SkipFile => "skip-file",
        }
    }
}

impl fmt::Display for ScriptFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "continue" => Ok(ScriptFailurePolicy::Continue),
            "skip-file" | "skip" => Ok(ScriptFailurePolicy::SkipFile),
            other => Err(format!("unknown script failure policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub force: bool,
    /// Log every planned mutation instead of performing it.
    pub dry_run: bool,
    pub script_failure: ScriptFailurePolicy,
}

/// Everything one run needs.
///
/// Built once per invocation; `seen` implements first-match-wins across
/// sections and persists across repeated `Rotator::run` calls on the same
/// context.
pub struct RunContext<'a> {
    pub sections: Vec<Section>,
    pub state: StateStore,
    pub seen: HashSet<PathBuf>,
    pub clock: &'a dyn Clock,
    pub scripts: &'a dyn ScriptRunner,
    pub mailer: &'a dyn Mailer,
    pub options: RunOptions,
}

impl<'a> RunContext<'a> {
    pub fn new(
        sections: Vec<Section>,
        state: StateStore,
        clock: &'a dyn Clock,
        scripts: &'a dyn ScriptRunner,
        mailer: &'a dyn Mailer,
        options: RunOptions,
    ) -> Self {
        Self {
            sections,
            state,
            seen: HashSet::new(),
            clock,
            scripts,
            mailer,
            options,
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Existing files matched by some section.
    pub matched: usize,
    pub rotated: usize,
    /// Present but not due, or suppressed as duplicates.
    pub skipped: usize,
    /// Missing without `missingok`, duplicates, I/O failures.
    pub failed: usize,
    pub script_failures: usize,
}

impl RunSummary {
    pub fn matched_any(&self) -> bool {
        self.matched > 0
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.script_failures > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_failure_policy_parse() {
        assert_eq!(
            "continue".parse::<ScriptFailurePolicy>().unwrap(),
            ScriptFailurePolicy::Continue
        );
        assert_eq!(
            "Skip-File".parse::<ScriptFailurePolicy>().unwrap(),
            ScriptFailurePolicy::SkipFile
        );
        assert!("abort".parse::<ScriptFailurePolicy>().is_err());
    }

    #[test]
    fn test_summary_flags() {
        let mut summary = RunSummary::default();
        assert!(!summary.matched_any());
        assert!(!summary.has_failures());
        summary.script_failures = 1;
        assert!(summary.has_failures());
    }
}
