//! Policy records: every directive that applies to one configuration section.
//!
//! A `Policy` starts as a copy of the global defaults accumulated so far and
//! is then mutated by each directive line of its section, in order. Paired
//! directives (`create`/`nocreate`, `copy`/`copytruncate`/…) write the same
//! field, so the last one seen wins.

use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Constants
// ============================================================================

/// Default compression extension (without the leading dot).
pub const DEFAULT_COMPRESS_EXT: &str = "gz";

/// Default `dateformat` used by `dateext`.
pub const DEFAULT_DATE_FORMAT: &str = "-%Y%m%d";

/// Default first numeric slot.
pub const DEFAULT_START: u32 = 1;

/// Default number of overwrite passes for `shred`.
pub const DEFAULT_SHRED_CYCLES: u32 = 3;

/// Default SMTP port.
pub const DEFAULT_SMTP_PORT: u16 = 25;

// ============================================================================
// Scheduling
// ============================================================================

/// Time-based rotation schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Schedule {
    /// Only size thresholds or `--force` trigger rotation.
    #[default]
    None,
    /// Every N minutes.
    Minutes(u32),
    Hourly,
    Daily,
    /// Weekly, optionally pinned to a weekday (0 = Sunday … 6 = Saturday).
    Weekly(Option<u8>),
    /// Monthly, optionally pinned to a day of the month (1-31).
    Monthly(Option<u8>),
    Yearly,
}

impl Schedule {
    /// Schedules that need the time of day of the last rotation.
    pub fn is_sub_daily(&self) -> bool {
        matches!(self, Schedule::Minutes(_) | Schedule::Hourly)
    }
}

// ============================================================================
// Disposition
// ============================================================================

/// What happens to the live file when it is rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposition {
    /// Move the live file to its rotated name.
    #[default]
    Rename,
    /// Copy the live file and leave the original untouched.
    Copy,
    /// Copy the live file, then truncate the original in place.
    CopyTruncate,
}

impl Disposition {
    pub fn copies(&self) -> bool {
        matches!(self, Disposition::Copy | Disposition::CopyTruncate)
    }
}

/// Attributes for the empty file made by `create`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateMode {
    /// Octal permission bits (applied on Unix only).
    pub mode: Option<u32>,
    /// Accepted for compatibility; ownership is not changed.
    pub owner: Option<String>,
    pub group: Option<String>,
}

/// Whether a fresh log file is created after a rename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Recreate {
    /// Leave the original path absent.
    #[default]
    Leave,
    Create(CreateMode),
}

// ============================================================================
// Naming
// ============================================================================

/// Reference instant used when expanding the date format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateShift {
    Now,
    Yesterday,
    HourAgo,
}

/// How rotated files are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    /// Use a formatted date instead of a number.
    pub dateext: bool,
    pub dateformat: String,
    pub dateyesterday: bool,
    pub datehourago: bool,
    /// Number given to the most recent rotated file.
    pub start: u32,
    /// Suffix kept after the rotation suffix (`app.1.log`), with leading dot.
    pub extension: Option<String>,
    /// Suffix appended outermost (`app.log.1.bak`), with leading dot.
    pub add_extension: Option<String>,
}

impl Default for Naming {
    fn default() -> Self {
        Self {
            dateext: false,
            dateformat: DEFAULT_DATE_FORMAT.to_string(),
            dateyesterday: false,
            datehourago: false,
            start: DEFAULT_START,
            extension: None,
            add_extension: None,
        }
    }
}

impl Naming {
    /// `dateyesterday` wins over `datehourago` when both are set.
    pub fn date_shift(&self) -> DateShift {
        if self.dateyesterday {
            DateShift::Yesterday
        } else if self.datehourago {
            DateShift::HourAgo
        } else {
            DateShift::Now
        }
    }
}

// ============================================================================
// Compression
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compression {
    pub enabled: bool,
    /// External compressor; the built-in gzip encoder is used when unset.
    pub command: Option<String>,
    pub options: Vec<String>,
    /// Parsed for compatibility, never invoked.
    pub uncompress_command: Option<String>,
    /// Extension without the leading dot.
    pub extension: String,
    /// Leave the newest rotated file uncompressed until the next cycle.
    pub delay: bool,
}

impl Default for Compression {
    fn default() -> Self {
        Self {
            enabled: false,
            command: None,
            options: Vec::new(),
            uncompress_command: None,
            extension: DEFAULT_COMPRESS_EXT.to_string(),
            delay: false,
        }
    }
}

impl Compression {
    /// Compress right after the rotation event (not deferred).
    pub fn immediate(&self) -> bool {
        self.enabled && !self.delay
    }
}

// ============================================================================
// Deletion
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shred {
    pub enabled: bool,
    pub cycles: u32,
}

impl Default for Shred {
    fn default() -> Self {
        Self {
            enabled: false,
            cycles: DEFAULT_SHRED_CYCLES,
        }
    }
}

// ============================================================================
// Scripts
// ============================================================================

/// The lifecycle points at which a script block can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    PreRotate,
    PostRotate,
    PreRemove,
    FirstAction,
    LastAction,
}

impl ScriptKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "prerotate" => Some(ScriptKind::PreRotate),
            "postrotate" => Some(ScriptKind::PostRotate),
            "preremove" => Some(ScriptKind::PreRemove),
            "firstaction" => Some(ScriptKind::FirstAction),
            "lastaction" => Some(ScriptKind::LastAction),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            ScriptKind::PreRotate => "prerotate",
            ScriptKind::PostRotate => "postrotate",
            ScriptKind::PreRemove => "preremove",
            ScriptKind::FirstAction => "firstaction",
            ScriptKind::LastAction => "lastaction",
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scripts {
    pub prerotate: Option<Vec<String>>,
    pub postrotate: Option<Vec<String>>,
    pub preremove: Option<Vec<String>>,
    pub firstaction: Option<Vec<String>>,
    pub lastaction: Option<Vec<String>>,
    /// Run pre/post-rotate once per section instead of once per file.
    pub shared: bool,
}

impl Scripts {
    pub fn get(&self, kind: ScriptKind) -> Option<&[String]> {
        let slot = match kind {
            ScriptKind::PreRotate => &self.prerotate,
            ScriptKind::PostRotate => &self.postrotate,
            ScriptKind::PreRemove => &self.preremove,
            ScriptKind::FirstAction => &self.firstaction,
            ScriptKind::LastAction => &self.lastaction,
        };
        slot.as_deref()
    }

    pub fn set(&mut self, kind: ScriptKind, lines: Vec<String>) {
        let slot = match kind {
            ScriptKind::PreRotate => &mut self.prerotate,
            ScriptKind::PostRotate => &mut self.postrotate,
            ScriptKind::PreRemove => &mut self.preremove,
            ScriptKind::FirstAction => &mut self.firstaction,
            ScriptKind::LastAction => &mut self.lastaction,
        };
        *slot = Some(lines);
    }
}

// ============================================================================
// Mail
// ============================================================================

/// Which file gets mailed: the live file before rotation, or the rotated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MailTiming {
    First,
    #[default]
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub server: Option<String>,
    pub port: u16,
    pub ssl: bool,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            server: None,
            port: DEFAULT_SMTP_PORT,
            ssl: false,
            user: None,
            password: None,
            from: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailSettings {
    pub address: Option<String>,
    pub timing: MailTiming,
    pub smtp: SmtpSettings,
}

// ============================================================================
// Policy
// ============================================================================

/// All directives in effect for one configuration section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Rotated files kept; 0 keeps every rotated file.
    pub rotate: u32,
    pub schedule: Schedule,
    /// Rotate when the file is at least this large.
    pub size: Option<u64>,
    /// Never rotate below this size, whatever else says so.
    pub minsize: Option<u64>,
    /// Rotate at this size even when the schedule is not due.
    pub maxsize: Option<u64>,
    pub if_empty: bool,
    pub missing_ok: bool,
    /// Days since last write before a file may rotate (0 = off).
    pub min_age: u32,
    /// Days after which rotated files are deleted (0 = off).
    pub max_age: u32,
    pub disposition: Disposition,
    pub recreate: Recreate,
    pub naming: Naming,
    pub compression: Compression,
    pub olddir: Option<PathBuf>,
    pub create_olddir: bool,
    pub shred: Shred,
    pub scripts: Scripts,
    pub mail: MailSettings,
    pub ignore_duplicates: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            rotate: 0,
            schedule: Schedule::None,
            size: None,
            minsize: None,
            maxsize: None,
            if_empty: true,
            missing_ok: false,
            min_age: 0,
            max_age: 0,
            disposition: Disposition::Rename,
            recreate: Recreate::Leave,
            naming: Naming::default(),
            compression: Compression::default(),
            olddir: None,
            create_olddir: true,
            shred: Shred::default(),
            scripts: Scripts::default(),
            mail: MailSettings::default(),
            ignore_duplicates: false,
        }
    }
}

impl Policy {
    pub fn script(&self, kind: ScriptKind) -> Option<&[String]> {
        self.scripts.get(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults() {
        let policy = Policy::default();
        assert_eq!(policy.rotate, 0);
        assert!(policy.if_empty);
        assert!(!policy.missing_ok);
        assert!(policy.create_olddir);
        assert_eq!(policy.disposition, Disposition::Rename);
        assert_eq!(policy.recreate, Recreate::Leave);
        assert_eq!(policy.compression.extension, "gz");
        assert_eq!(policy.naming.start, 1);
        assert_eq!(policy.naming.dateformat, "-%Y%m%d");
        assert_eq!(policy.mail.timing, MailTiming::Last);
    }

    #[test]
    fn test_date_shift_precedence() {
        let mut naming = Naming::default();
        assert_eq!(naming.date_shift(), DateShift::Now);

        naming.datehourago = true;
        assert_eq!(naming.date_shift(), DateShift::HourAgo);

        naming.dateyesterday = true;
        assert_eq!(naming.date_shift(), DateShift::Yesterday);
    }

    #[test]
    fn test_scripts_get_set() {
        let mut scripts = Scripts::default();
        assert!(scripts.get(ScriptKind::PostRotate).is_none());

        scripts.set(ScriptKind::PostRotate, vec!["kill -HUP 1".to_string()]);
        assert_eq!(
            scripts.get(ScriptKind::PostRotate),
            Some(&["kill -HUP 1".to_string()][..])
        );
    }

    #[test]
    fn test_script_kind_keywords_round_trip() {
        for kind in [
            ScriptKind::PreRotate,
            ScriptKind::PostRotate,
            ScriptKind::PreRemove,
            ScriptKind::FirstAction,
            ScriptKind::LastAction,
        ] {
            assert_eq!(ScriptKind::from_keyword(kind.keyword()), Some(kind));
        }
        assert_eq!(ScriptKind::from_keyword("endscript"), None);
    }
}
