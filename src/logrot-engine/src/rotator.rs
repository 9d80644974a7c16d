//! The run driver.
//!
//! One run goes through four phases:
//!
//! 1. evaluate every path of every section and queue the due ones
//! 2. `firstaction` for each section with queued files
//! 3. rotate each queue, honouring `sharedscripts`
//! 4. `lastaction` for each section with queued files

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use logrot_config::{Policy, ScriptKind, expand_pattern, expands_broadly};

use crate::context::{RunContext, RunSummary, ScriptFailurePolicy};
use crate::eligibility::{FileStatus, Verdict, evaluate};
use crate::error::RotateError;
use crate::naming::NameTemplate;

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Drop candidates that are rotated copies of another candidate, or that
/// carry the compression extension. Applied to glob and directory matches
/// so archives are never rotated as live logs.
pub(crate) fn without_rotated(files: Vec<PathBuf>, policy: &Policy) -> Vec<PathBuf> {
    let compressed = format!(".{}", policy.compression.extension);
    let templates: Vec<(Option<&Path>, NameTemplate)> = files
        .iter()
        .map(|f| (f.parent(), NameTemplate::for_policy(&file_name(f), policy)))
        .collect();

    files
        .iter()
        .enumerate()
        .filter(|(idx, candidate)| {
            let name = file_name(candidate);
            if name.ends_with(compressed.as_str()) {
                debug!(path = %candidate.display(), "Skipping compressed archive");
                return false;
            }
            let rotated_copy = templates.iter().enumerate().any(|(other, (dir, template))| {
                other != *idx && *dir == candidate.parent() && template.parse(&name).is_some()
            });
            if rotated_copy {
                debug!(path = %candidate.display(), "Skipping rotated copy");
            }
            !rotated_copy
        })
        .map(|(_, candidate)| candidate.clone())
        .collect()
}

/// Expand every pattern of a section; broad matches lose rotated copies.
fn section_files(patterns: &[String], policy: &Policy) -> logrot_config::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let matched = expand_pattern(pattern)?;
        if expands_broadly(pattern) {
            files.extend(without_rotated(matched, policy));
        } else {
            files.extend(matched);
        }
    }
    Ok(files)
}

/// Due files of one section.
struct Batch {
    /// Section patterns joined by spaces; the argument of shared scripts.
    label: String,
    policy: Policy,
    files: Vec<PathBuf>,
    /// Cleared when a failing `firstaction` abandons the section.
    active: bool,
}

pub struct Rotator<'c, 'a> {
    pub(crate) ctx: &'c mut RunContext<'a>,
    pub(crate) summary: RunSummary,
}

impl<'c, 'a> Rotator<'c, 'a> {
    /// Process every section of `ctx` once.
    pub fn run(ctx: &'c mut RunContext<'a>) -> RunSummary {
        let mut rotator = Rotator {
            ctx,
            summary: RunSummary::default(),
        };

        let mut batches = rotator.collect();
        rotator.first_actions(&mut batches);
        for batch in batches.iter().filter(|b| b.active) {
            rotator.rotate_batch(batch);
        }
        rotator.last_actions(&batches);

        info!(
            matched = rotator.summary.matched,
            rotated = rotator.summary.rotated,
            skipped = rotator.summary.skipped,
            failed = rotator.summary.failed,
            script_failures = rotator.summary.script_failures,
            "Run finished"
        );
        rotator.summary
    }

    fn collect(&mut self) -> Vec<Batch> {
        let ctx = &mut *self.ctx;
        let summary = &mut self.summary;
        let now = ctx.clock.now();
        let mut batches = Vec::new();

        for section in &ctx.sections {
            let files = match section_files(&section.patterns, &section.policy) {
                Ok(files) => files,
                Err(e) => {
                    error!(
                        config = %section.source.display(),
                        line = section.line,
                        error = %e,
                        "Cannot expand section paths"
                    );
                    summary.failed += 1;
                    continue;
                }
            };

            let policy = &section.policy;
            let mut queue = Vec::new();
            for path in files {
                if !ctx.seen.insert(path.clone()) {
                    if policy.ignore_duplicates {
                        debug!(path = %path.display(), "Ignoring duplicate log entry");
                        summary.skipped += 1;
                    } else {
                        error!(
                            path = %path.display(),
                            config = %section.source.display(),
                            line = section.line,
                            "Duplicate log entry, already handled by an earlier section"
                        );
                        summary.failed += 1;
                    }
                    continue;
                }

                let status = match FileStatus::probe(&path) {
                    Ok(status) => status,
                    Err(e) => {
                        error!(path = %path.display(), error = %e, "Cannot stat log");
                        summary.failed += 1;
                        continue;
                    }
                };
                if status.exists {
                    summary.matched += 1;
                }

                let last = ctx.state.last_rotation_at(&path);
                match evaluate(&status, policy, last, now, ctx.options.force) {
                    Verdict::Rotate(trigger) => {
                        debug!(path = %path.display(), ?trigger, "Log is due");
                        queue.push(path);
                    }
                    Verdict::Skip(hold) => {
                        debug!(path = %path.display(), ?hold, last_rotation = %last, "Log not due");
                        summary.skipped += 1;
                    }
                    Verdict::Missing { allowed: true } => {
                        debug!(path = %path.display(), "Log missing, skipping (missingok)");
                    }
                    Verdict::Missing { allowed: false } => {
                        error!(path = %path.display(), "Log does not exist");
                        summary.failed += 1;
                    }
                }
            }

            if !queue.is_empty() {
                batches.push(Batch {
                    label: section.patterns.join(" "),
                    policy: policy.clone(),
                    files: queue,
                    active: true,
                });
            }
        }
        batches
    }

    fn first_actions(&mut self, batches: &mut [Batch]) {
        for batch in batches.iter_mut() {
            let Some(lines) = batch.policy.script(ScriptKind::FirstAction) else {
                continue;
            };
            if !self.run_script(ScriptKind::FirstAction, lines, "") && self.skip_on_failure() {
                warn!(section = %batch.label, "firstaction failed, skipping section");
                self.summary.skipped += batch.files.len();
                batch.active = false;
            }
        }
    }

    fn last_actions(&mut self, batches: &[Batch]) {
        for batch in batches.iter().filter(|b| b.active) {
            if let Some(lines) = batch.policy.script(ScriptKind::LastAction) {
                self.run_script(ScriptKind::LastAction, lines, "");
            }
        }
    }

    fn rotate_batch(&mut self, batch: &Batch) {
        let policy = &batch.policy;
        let shared = policy.scripts.shared;

        if shared {
            if let Some(lines) = policy.script(ScriptKind::PreRotate) {
                if !self.run_script(ScriptKind::PreRotate, lines, &batch.label)
                    && self.skip_on_failure()
                {
                    warn!(section = %batch.label, "Shared prerotate failed, skipping section");
                    self.summary.skipped += batch.files.len();
                    return;
                }
            }
        }

        let mut rotated_any = false;
        for path in &batch.files {
            match self.rotate_file(policy, path, shared) {
                Ok(()) => {
                    self.summary.rotated += 1;
                    rotated_any = true;
                }
                Err(e @ RotateError::Script { .. }) => {
                    warn!(path = %path.display(), error = %e, "Skipping rotation");
                    self.summary.skipped += 1;
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Rotation failed");
                    self.summary.failed += 1;
                }
            }
        }

        if shared && rotated_any {
            if let Some(lines) = policy.script(ScriptKind::PostRotate) {
                self.run_script(ScriptKind::PostRotate, lines, &batch.label);
            }
        }
    }

    pub(crate) fn skip_on_failure(&self) -> bool {
        self.ctx.options.script_failure == ScriptFailurePolicy::SkipFile
    }

    /// Run one lifecycle script; `false` when it failed.
    pub(crate) fn run_script(&mut self, kind: ScriptKind, lines: &[String], arg: &str) -> bool {
        if lines.iter().all(|l| l.trim().is_empty()) {
            return true;
        }
        if self.ctx.options.dry_run {
            info!(script = %kind, arg, "Would run script");
            return true;
        }

        match self.ctx.scripts.run(lines, arg) {
            Ok(output) => {
                for line in output.stdout.lines() {
                    debug!(script = %kind, "{}", line);
                }
                if output.has_stderr() {
                    error!(script = %kind, arg, stderr = output.stderr.trim(), "Script wrote to stderr");
                }
                if output.is_failure() {
                    error!(script = %kind, arg, exit_code = ?output.exit_code, "Script failed");
                    self.summary.script_failures += 1;
                    false
                } else {
                    true
                }
            }
            Err(e) => {
                error!(script = %kind, arg, error = %e, "Cannot run script");
                self.summary.script_failures += 1;
                false
            }
        }
    }
}
