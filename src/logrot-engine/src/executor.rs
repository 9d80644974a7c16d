//! One rotation event, end to end.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use logrot_common::resolve_against;
use logrot_config::{CreateMode, Disposition, MailTiming, Policy, Recreate, ScriptKind};

use crate::compress::compress_file;
use crate::error::{Result, RotateError};
use crate::mail::MailRequest;
use crate::naming::NameTemplate;
use crate::rotator::Rotator;
use crate::shred::shred_file;

/// Rename, falling back to copy + remove across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(from = %from.display(), to = %to.display(), "Cross-device move, copying");
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        other => other,
    }
}

/// Fresh empty log after a rename. An existing file (recreated by the
/// application in the meantime) is left alone.
fn create_empty(path: &Path, mode: &CreateMode) -> io::Result<()> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "Log already recreated");
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Some(bits) = mode.mode {
            fs::set_permissions(path, fs::Permissions::from_mode(bits))?;
        }
    }
    if mode.owner.is_some() || mode.group.is_some() {
        debug!(
            path = %path.display(),
            owner = ?mode.owner,
            group = ?mode.group,
            "Ownership is not changed"
        );
    }
    Ok(())
}

impl Rotator<'_, '_> {
    /// Rotate `path` under `policy`. With `shared`, pre/post-rotate scripts
    /// belong to the section and are not run here.
    pub(crate) fn rotate_file(&mut self, policy: &Policy, path: &Path, shared: bool) -> Result<()> {
        let dry_run = self.ctx.options.dry_run;
        let now = self.ctx.clock.now();
        let arg = path.to_string_lossy().to_string();
        info!(path = %path.display(), dry_run, "Rotating log");

        if !shared {
            if let Some(lines) = policy.script(ScriptKind::PreRotate) {
                if !self.run_script(ScriptKind::PreRotate, lines, &arg) && self.skip_on_failure() {
                    return Err(RotateError::Script {
                        kind: ScriptKind::PreRotate,
                        path: path.to_path_buf(),
                    });
                }
            }
        }

        let dest_dir = self.destination_dir(policy, path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let template = NameTemplate::for_policy(&file_name, policy);

        self.age_out(policy, &template, &dest_dir, path, now)?;

        let name = template.current(now);
        let target = dest_dir.join(name.to_string());
        let compressed = policy
            .compression
            .immediate()
            .then(|| dest_dir.join(name.with_compression(&policy.compression.extension).to_string()));

        // A dry run renumbered nothing, so numbered slots still look taken.
        if !dry_run || template.is_dated() {
            if target.exists() {
                return Err(RotateError::DestinationExists(target));
            }
            if let Some(compressed) = compressed.as_ref().filter(|p| p.exists()) {
                return Err(RotateError::DestinationExists(compressed.clone()));
            }
        }

        if policy.mail.timing == MailTiming::First {
            self.mail(policy, path, path);
        }

        self.dispose(policy, path, &target)?;

        let rotated = match compressed {
            Some(compressed) => {
                if dry_run {
                    info!(src = %target.display(), dst = %compressed.display(), "Would compress");
                } else {
                    compress_file(&target, &compressed, &policy.compression)?;
                }
                compressed
            }
            None => target,
        };

        if policy.mail.timing == MailTiming::Last {
            self.mail(policy, path, &rotated);
        }

        if !dry_run {
            if policy.schedule.is_sub_daily() {
                self.ctx.state.set_last_rotation_at(path, now.naive_local())?;
            } else {
                self.ctx.state.set_last_rotation(path, now.date_naive())?;
            }
        }

        if !shared {
            if let Some(lines) = policy.script(ScriptKind::PostRotate) {
                self.run_script(ScriptKind::PostRotate, lines, &arg);
            }
        }

        info!(path = %path.display(), rotated = %rotated.display(), "Rotated log");
        Ok(())
    }

    /// `olddir` when usable, otherwise the log's own directory.
    fn destination_dir(&mut self, policy: &Policy, path: &Path) -> Result<PathBuf> {
        let log_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let Some(olddir) = policy.olddir.as_deref() else {
            return Ok(log_dir);
        };

        let dir = resolve_against(&log_dir, olddir);
        if dir.is_dir() {
            return Ok(dir);
        }
        if !policy.create_olddir {
            debug!(olddir = %dir.display(), "olddir missing, rotating in place");
            return Ok(log_dir);
        }
        if self.ctx.options.dry_run {
            info!(olddir = %dir.display(), "Would create olddir");
        } else {
            fs::create_dir_all(&dir).map_err(RotateError::io("create directory", &dir))?;
            info!(olddir = %dir.display(), "Created olddir");
        }
        Ok(dir)
    }

    fn dispose(&mut self, policy: &Policy, path: &Path, target: &Path) -> Result<()> {
        let dry_run = self.ctx.options.dry_run;
        match policy.disposition {
            Disposition::Copy | Disposition::CopyTruncate => {
                let truncate = policy.disposition == Disposition::CopyTruncate;
                if dry_run {
                    info!(src = %path.display(), dst = %target.display(), truncate, "Would copy");
                    return Ok(());
                }
                fs::copy(path, target).map_err(RotateError::io("copy", path))?;
                if truncate {
                    OpenOptions::new()
                        .write(true)
                        .open(path)
                        .and_then(|f| f.set_len(0))
                        .map_err(RotateError::io("truncate", path))?;
                }
            }
            Disposition::Rename => {
                if dry_run {
                    info!(src = %path.display(), dst = %target.display(), "Would rename");
                    if let Recreate::Create(_) = policy.recreate {
                        info!(path = %path.display(), "Would create empty log");
                    }
                    return Ok(());
                }
                move_file(path, target).map_err(RotateError::io("rename", path))?;
                if let Recreate::Create(mode) = &policy.recreate {
                    create_empty(path, mode).map_err(RotateError::io("create", path))?;
                }
            }
        }
        Ok(())
    }

    /// Mail `file` if the policy has an address; failures are only logged.
    fn mail(&mut self, policy: &Policy, log: &Path, file: &Path) {
        let Some(address) = policy.mail.address.as_deref() else {
            return;
        };
        if self.ctx.options.dry_run {
            info!(address, file = %file.display(), "Would mail log");
            return;
        }
        let request = MailRequest::new(address, log, file, &policy.mail.smtp);
        match self.ctx.mailer.send(&request) {
            Ok(()) => info!(address, file = %file.display(), "Mailed log"),
            Err(e) => error!(address, file = %file.display(), error = %e, "Mail failed"),
        }
    }

    /// Delete a rotated file: `preremove`, then shred or unlink.
    pub(crate) fn remove_rotated(&mut self, policy: &Policy, path: &Path) -> Result<()> {
        if let Some(lines) = policy.script(ScriptKind::PreRemove) {
            let arg = path.to_string_lossy().to_string();
            if !self.run_script(ScriptKind::PreRemove, lines, &arg) && self.skip_on_failure() {
                info!(path = %path.display(), "Keeping rotated log, preremove failed");
                return Ok(());
            }
        }
        if self.ctx.options.dry_run {
            info!(path = %path.display(), shred = policy.shred.enabled, "Would remove");
            return Ok(());
        }

        if policy.shred.enabled {
            shred_file(path, policy.shred.cycles).map_err(RotateError::io("shred", path))?;
        } else {
            fs::remove_file(path).map_err(RotateError::io("remove", path))?;
        }
        info!(path = %path.display(), "Removed rotated log");
        Ok(())
    }
}
