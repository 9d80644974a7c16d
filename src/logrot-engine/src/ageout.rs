//! Age-out and renumbering of previously rotated files.
//!
//! Runs before each rotation event, against the set of rotated files as it
//! is at that moment:
//!
//! 1. files older than `maxage` days are deleted regardless of count
//! 2. date-named files beyond the retention count are deleted, oldest first
//! 3. numbered files beyond the retention count are deleted, the rest move
//!    up one slot, highest number first so no rename overwrites a file that
//!    has not moved yet
//!
//! A renamed file that is still uncompressed is compressed when compression
//! is on; that is how `delaycompress` catches up one cycle late.

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Local, TimeDelta};
use tracing::{debug, info, warn};

use logrot_config::Policy;

use crate::compress::{compress_file, is_gzip};
use crate::error::{Result, RotateError};
use crate::naming::{DatePattern, NameTemplate, RotatedName, Suffix};
use crate::rotator::Rotator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgeOutStep {
    Remove(RotatedName),
    Rename { from: RotatedName, to: RotatedName },
}

/// Steps for numbered files, in execution order.
///
/// A file numbered `n` is removed when `n >= start + rotate - 1`, since the
/// rotation that follows fills slot `start`. `rotate == 0` keeps everything.
/// Files numbered below `start` are left alone.
pub fn plan_numeric(mut existing: Vec<RotatedName>, rotate: u32, start: u32) -> Vec<AgeOutStep> {
    existing.retain(|name| name.index().is_some_and(|n| n >= start));
    existing.sort_by(|a, b| {
        b.index()
            .cmp(&a.index())
            .then_with(|| a.is_compressed().cmp(&b.is_compressed()))
    });

    let limit = (rotate > 0).then(|| start.saturating_add(rotate - 1));
    existing
        .into_iter()
        .filter_map(|name| {
            let n = name.index()?;
            Some(match limit {
                Some(limit) if n >= limit => AgeOutStep::Remove(name),
                _ => AgeOutStep::Rename {
                    to: name.with_index(n.saturating_add(1)),
                    from: name,
                },
            })
        })
        .collect()
}

fn date_text(name: &RotatedName) -> &str {
    match &name.suffix {
        Suffix::Date(date) => date,
        Suffix::Index(_) => "",
    }
}

/// Removals for date-named files: keep the newest `rotate - 1` so the
/// rotation that follows brings the total to `rotate`.
pub fn plan_dated(
    mut existing: Vec<RotatedName>,
    rotate: u32,
    pattern: &DatePattern,
) -> Vec<AgeOutStep> {
    if rotate == 0 {
        return Vec::new();
    }
    existing.sort_by(|a, b| newest_first(pattern, a, b));
    existing
        .into_iter()
        .skip(rotate as usize - 1)
        .map(AgeOutStep::Remove)
        .collect()
}

fn newest_first(pattern: &DatePattern, a: &RotatedName, b: &RotatedName) -> Ordering {
    pattern.compare(date_text(b), date_text(a))
}

/// Rotated files of `template` in `dir`, excluding the live file.
fn list_rotated(template: &NameTemplate, dir: &Path, live: &Path) -> Result<Vec<RotatedName>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(RotateError::io("list", dir)(e)),
    };

    let mut rotated = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path == live || !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(parsed) = template.parse(name) {
            rotated.push(parsed);
        }
    }
    Ok(rotated)
}

fn modified(path: &Path) -> Option<DateTime<Local>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Local>::from)
}

impl Rotator<'_, '_> {
    pub(crate) fn age_out(
        &mut self,
        policy: &Policy,
        template: &NameTemplate,
        dir: &Path,
        live: &Path,
        now: DateTime<Local>,
    ) -> Result<()> {
        let mut rotated = list_rotated(template, dir, live)?;
        debug!(dir = %dir.display(), count = rotated.len(), "Found rotated files");

        if policy.max_age > 0 {
            let cutoff = now - TimeDelta::days(i64::from(policy.max_age));
            let (expired, kept): (Vec<_>, Vec<_>) = rotated
                .into_iter()
                .partition(|name| modified(&dir.join(name.to_string())).is_some_and(|m| m < cutoff));
            for name in expired {
                info!(file = %name, max_age = policy.max_age, "Rotated log exceeded maxage");
                self.remove_rotated(policy, &dir.join(name.to_string()))?;
            }
            rotated = kept;
        }

        match template.date_pattern() {
            Some(pattern) => {
                let plan = plan_dated(rotated.clone(), policy.rotate, pattern);
                let removed: Vec<RotatedName> = plan
                    .into_iter()
                    .filter_map(|step| match step {
                        AgeOutStep::Remove(name) => Some(name),
                        AgeOutStep::Rename { .. } => None,
                    })
                    .collect();
                for name in &removed {
                    self.remove_rotated(policy, &dir.join(name.to_string()))?;
                }
                if policy.compression.enabled {
                    for name in rotated.iter().filter(|n| !removed.contains(n)) {
                        self.compress_aged(policy, dir, name)?;
                    }
                }
            }
            None => {
                for step in plan_numeric(rotated, policy.rotate, template.start()) {
                    match step {
                        AgeOutStep::Remove(name) => {
                            self.remove_rotated(policy, &dir.join(name.to_string()))?;
                        }
                        AgeOutStep::Rename { from, to } => self.renumber(policy, dir, &from, &to)?,
                    }
                }
            }
        }
        Ok(())
    }

    fn renumber(
        &mut self,
        policy: &Policy,
        dir: &Path,
        from: &RotatedName,
        to: &RotatedName,
    ) -> Result<()> {
        let src = dir.join(from.to_string());
        let dst = dir.join(to.to_string());
        if self.ctx.options.dry_run {
            info!(src = %src.display(), dst = %dst.display(), "Would renumber");
            return Ok(());
        }

        if dst.exists() {
            warn!(path = %dst.display(), "Removing file in the way of renumbering");
            fs::remove_file(&dst).map_err(RotateError::io("remove", &dst))?;
        }
        fs::rename(&src, &dst).map_err(RotateError::io("rename", &src))?;
        debug!(src = %src.display(), dst = %dst.display(), "Renumbered");

        if policy.compression.enabled {
            self.compress_aged(policy, dir, to)?;
        }
        Ok(())
    }

    /// Compress an already rotated file that is still plain.
    fn compress_aged(&mut self, policy: &Policy, dir: &Path, name: &RotatedName) -> Result<()> {
        if name.is_compressed() {
            return Ok(());
        }
        let src = dir.join(name.to_string());
        if is_gzip(&src).map_err(RotateError::io("read", &src))? {
            return Ok(());
        }
        let dst = dir.join(name.with_compression(&policy.compression.extension).to_string());
        if self.ctx.options.dry_run {
            info!(src = %src.display(), dst = %dst.display(), "Would compress");
            return Ok(());
        }
        compress_file(&src, &dst, &policy.compression)
    }
}
