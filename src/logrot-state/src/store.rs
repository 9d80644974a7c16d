use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::{debug, info, warn};

use logrot_common::normalize_separators;

use crate::atomic::atomic_write;
use crate::error::{Result, StateError};

/// The two comment lines every state file starts with.
pub const STATE_HEADER: &str = "# logrot state file\n# \"<path>\" <year>-<month>-<day>[-<hour>:<minute>:<second>]\n";

/// Date reported for paths that were never rotated.
pub fn epoch() -> NaiveDate {
    NaiveDate::default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    /// `time` is only recorded for sub-day schedules.
    Entry {
        path: String,
        date: NaiveDate,
        time: Option<NaiveTime>,
    },
    /// Comments, blanks and lines that did not parse; written back verbatim.
    Verbatim(String),
}

fn parse_time(field: &str) -> Option<NaiveTime> {
    let mut parts = field.split(':');
    let hour = parts.next()?.parse::<u32>().ok()?;
    let minute = parts.next()?.parse::<u32>().ok()?;
    let second = parts.next().map_or(Some(0), |s| s.parse::<u32>().ok())?;
    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Lenient parse of `"<path>" Y-M-D[-H:M:S]`; an unreadable time is dropped.
fn parse_line(line: &str) -> Option<(String, NaiveDate, Option<NaiveTime>)> {
    let rest = line.trim().strip_prefix('"')?;
    let close = rest.rfind('"')?;
    let path = &rest[..close];
    let date = rest[close + 1..].split_whitespace().next()?;

    let mut fields = date.split('-');
    let year = fields.next()?.parse::<i32>().ok()?;
    let month = fields.next()?.parse::<u32>().ok()?;
    let day = fields.next()?.parse::<u32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = fields.next().and_then(parse_time);

    (!path.is_empty()).then(|| (path.to_string(), date, time))
}

fn format_stamp(date: NaiveDate, time: Option<NaiveTime>) -> String {
    let mut out = format!("{}-{}-{}", date.year(), date.month(), date.day());
    if let Some(time) = time {
        out.push_str(&format!("-{}:{}:{}", time.hour(), time.minute(), time.second()));
    }
    out
}

fn same_path(a: &str, b: &str) -> bool {
    normalize_separators(a) == normalize_separators(b)
}

/// In-memory copy of the state file, written back on every change.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    lines: Vec<Line>,
    read_only: bool,
}

impl StateStore {
    /// Open the state file, creating it with its header when missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.is_dir() {
            return Err(StateError::IsDirectory(path));
        }
        if !path.exists() {
            info!(path = %path.display(), "Creating state file");
            atomic_write(&path, STATE_HEADER.as_bytes()).map_err(|source| StateError::Io {
                path: path.clone(),
                source,
            })?;
        }
        Self::load(path, false)
    }

    /// Open without ever touching the disk; updates stay in memory.
    pub fn open_read_only(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.is_dir() {
            return Err(StateError::IsDirectory(path));
        }
        if !path.exists() {
            debug!(path = %path.display(), "State file absent, starting empty");
            return Ok(Self {
                path,
                lines: Vec::new(),
                read_only: true,
            });
        }
        Self::load(path, true)
    }

    fn load(path: PathBuf, read_only: bool) -> Result<Self> {
        let text = fs::read_to_string(&path).map_err(|source| StateError::Io {
            path: path.clone(),
            source,
        })?;

        let lines = text
            .lines()
            .enumerate()
            .map(|(idx, raw)| {
                let trimmed = raw.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    return Line::Verbatim(raw.to_string());
                }
                match parse_line(raw) {
                    Some((path, date, time)) => Line::Entry { path, date, time },
                    None => {
                        warn!(line = idx + 1, content = raw, "Ignoring malformed state line");
                        Line::Verbatim(raw.to_string())
                    }
                }
            })
            .collect();

        Ok(Self {
            path,
            lines,
            read_only,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn lookup(&self, log: &Path) -> Option<(NaiveDate, Option<NaiveTime>)> {
        let wanted = log.to_string_lossy();
        self.lines.iter().find_map(|line| match line {
            Line::Entry { path, date, time } if same_path(path, &wanted) => Some((*date, *time)),
            _ => None,
        })
    }

    /// Last rotation date of `log`, or the epoch when never rotated.
    pub fn last_rotation(&self, log: &Path) -> NaiveDate {
        self.lookup(log).map_or_else(epoch, |(date, _)| date)
    }

    /// Last rotation instant of `log`. Entries without a recorded time
    /// count from midnight.
    pub fn last_rotation_at(&self, log: &Path) -> NaiveDateTime {
        match self.lookup(log) {
            Some((date, time)) => date.and_time(time.unwrap_or(NaiveTime::MIN)),
            None => epoch().and_time(NaiveTime::MIN),
        }
    }

    /// Record `date` for `log` and rewrite the whole file.
    pub fn set_last_rotation(&mut self, log: &Path, date: NaiveDate) -> Result<()> {
        self.record(log, date, None)
    }

    /// Record date and time of day, for schedules finer than a day.
    pub fn set_last_rotation_at(&mut self, log: &Path, at: NaiveDateTime) -> Result<()> {
        self.record(log, at.date(), Some(at.time().with_nanosecond(0).unwrap_or(at.time())))
    }

    fn record(&mut self, log: &Path, date: NaiveDate, time: Option<NaiveTime>) -> Result<()> {
        let wanted = log.to_string_lossy();
        let existing = self.lines.iter_mut().find_map(|line| match line {
            Line::Entry { path, date, time } if same_path(path, &wanted) => Some((date, time)),
            _ => None,
        });
        match existing {
            Some((slot_date, slot_time)) => {
                *slot_date = date;
                *slot_time = time;
            }
            None => self.lines.push(Line::Entry {
                path: wanted.to_string(),
                date,
                time,
            }),
        }

        if self.read_only {
            debug!(log = %log.display(), date = %date, "Not writing state (read-only)");
            return Ok(());
        }
        self.save()
    }

    /// Tracked paths and dates, in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, NaiveDate)> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { path, date, .. } => Some((path.as_str(), *date)),
            Line::Verbatim(_) => None,
        })
    }

    fn render(&self) -> String {
        let mut out = String::new();
        if self.lines.is_empty() {
            out.push_str(STATE_HEADER);
        }
        for line in &self.lines {
            match line {
                Line::Entry { path, date, time } => {
                    out.push('"');
                    out.push_str(path);
                    out.push_str("\" ");
                    out.push_str(&format_stamp(*date, *time));
                }
                Line::Verbatim(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out
    }

    fn save(&self) -> Result<()> {
        atomic_write(&self.path, self.render().as_bytes()).map_err(|source| StateError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
