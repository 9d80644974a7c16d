//! Mailing rotated logs.
//!
//! Delivery sits behind [`Mailer`]; the default [`CommandMailer`] pipes the
//! file to a `mail(1)`-style command. SMTP settings from the configuration
//! travel with each request for mailers that speak SMTP themselves.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use logrot_config::SmtpSettings;

use crate::error::MailError;

/// Mail command used when none is given.
pub const DEFAULT_MAIL_COMMAND: &str = "/usr/bin/mail";

/// One log file to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailRequest {
    pub address: String,
    pub subject: String,
    /// File whose contents form the message body.
    pub file: PathBuf,
    pub smtp: SmtpSettings,
}

impl MailRequest {
    pub fn new(address: &str, log: &Path, file: &Path, smtp: &SmtpSettings) -> Self {
        Self {
            address: address.to_string(),
            subject: log.display().to_string(),
            file: file.to_path_buf(),
            smtp: smtp.clone(),
        }
    }
}

pub trait Mailer {
    fn send(&self, request: &MailRequest) -> Result<(), MailError>;
}

/// Runs `<command> -s <subject> <address>` with the file on stdin.
#[derive(Debug, Clone)]
pub struct CommandMailer {
    command: String,
}

impl Default for CommandMailer {
    fn default() -> Self {
        Self::new(DEFAULT_MAIL_COMMAND)
    }
}

impl CommandMailer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Mailer for CommandMailer {
    fn send(&self, request: &MailRequest) -> Result<(), MailError> {
        let body = File::open(&request.file).map_err(|source| MailError::Read {
            path: request.file.clone(),
            source,
        })?;

        debug!(
            command = %self.command,
            address = %request.address,
            file = %request.file.display(),
            "Mailing log"
        );
        let output = Command::new(&self.command)
            .arg("-s")
            .arg(&request.subject)
            .arg(&request.address)
            .stdin(Stdio::from(body))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| MailError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(MailError::Failed {
                command: self.command.clone(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
