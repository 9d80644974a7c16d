//! Rotated file names.
//!
//! A rotated name is parsed once into a [`RotatedName`] and formatted back
//! from it, so renumbering never does string surgery:
//!
//! ```text
//! numeric:  <base>.<N>[<extension>][<addextension>][.<compressext>]
//! date:     <base><date>[<extension>][<addextension>][.<compressext>]
//! ```
//!
//! `<base>` is the live file name with a configured `extension` removed.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Datelike, Local, TimeDelta, Timelike};
use regex::Regex;
use tracing::warn;

use logrot_config::{Compression, DateShift, Naming, Policy};

/// The rotation part of a rotated name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suffix {
    Index(u32),
    /// Expanded `dateformat`, including any literal separators.
    Date(String),
}

/// A rotated file name split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedName {
    pub base: String,
    pub suffix: Suffix,
    /// Preserved extension, with leading dot.
    pub extension: Option<String>,
    /// Appended extension, with leading dot.
    pub add_extension: Option<String>,
    /// Compression extension, without leading dot.
    pub compression: Option<String>,
}

impl RotatedName {
    pub fn index(&self) -> Option<u32> {
        match self.suffix {
            Suffix::Index(n) => Some(n),
            Suffix::Date(_) => None,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.compression.is_some()
    }

    /// Same name in another numeric slot.
    pub fn with_index(&self, index: u32) -> Self {
        Self {
            suffix: Suffix::Index(index),
            ..self.clone()
        }
    }

    pub fn with_compression(&self, ext: &str) -> Self {
        Self {
            compression: Some(ext.to_string()),
            ..self.clone()
        }
    }
}

impl fmt::Display for RotatedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)?;
        match &self.suffix {
            Suffix::Index(n) => write!(f, ".{n}")?,
            Suffix::Date(date) => f.write_str(date)?,
        }
        if let Some(ext) = &self.extension {
            f.write_str(ext)?;
        }
        if let Some(ext) = &self.add_extension {
            f.write_str(ext)?;
        }
        if let Some(ext) = &self.compression {
            write!(f, ".{ext}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Date formats
// ============================================================================

/// Expand `%Y %m %d %H %M %s` and `%%`; any other `%x` is kept literally.
pub fn expand_date_format(format: &str, instant: DateTime<Local>) -> String {
    let mut out = String::with_capacity(format.len() + 8);
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('Y') => out.push_str(&format!("{:04}", instant.year())),
            Some('m') => out.push_str(&format!("{:02}", instant.month())),
            Some('d') => out.push_str(&format!("{:02}", instant.day())),
            Some('H') => out.push_str(&format!("{:02}", instant.hour())),
            Some('M') => out.push_str(&format!("{:02}", instant.minute())),
            Some('s') => out.push_str(&instant.timestamp().to_string()),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

/// The instant a date suffix describes.
pub fn reference_instant(shift: DateShift, now: DateTime<Local>) -> DateTime<Local> {
    match shift {
        DateShift::Now => now,
        DateShift::Yesterday => now - TimeDelta::days(1),
        DateShift::HourAgo => now - TimeDelta::hours(1),
    }
}

/// Matches expansions of one `dateformat` and orders them by time.
#[derive(Debug, Clone)]
pub struct DatePattern {
    /// `None` when the format could not be turned into a pattern; then
    /// nothing matches and date-named files are never pruned.
    regex: Option<Regex>,
    /// Token letter for each capture group, in order.
    fields: Vec<char>,
}

impl DatePattern {
    pub fn new(format: &str) -> Self {
        let mut pattern = String::from("^");
        let mut fields = Vec::new();
        let mut chars = format.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                pattern.push_str(&regex::escape(&c.to_string()));
                continue;
            }
            match chars.next() {
                Some('Y') => {
                    pattern.push_str(r"(\d{4})");
                    fields.push('Y');
                }
                Some(t @ ('m' | 'd' | 'H' | 'M')) => {
                    pattern.push_str(r"(\d{2})");
                    fields.push(t);
                }
                Some('s') => {
                    pattern.push_str(r"(\d+)");
                    fields.push('s');
                }
                Some('%') => pattern.push('%'),
                Some(other) => {
                    pattern.push('%');
                    pattern.push_str(&regex::escape(&other.to_string()));
                }
                None => pattern.push('%'),
            }
        }
        pattern.push('$');

        let regex = match Regex::new(&pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(format, error = %e, "Cannot match rotated names for date format");
                None
            }
        };
        Self { regex, fields }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(text))
    }

    /// Chronological sort key: epoch seconds first, then calendar fields.
    fn key(&self, text: &str) -> [u64; 6] {
        let mut key = [0u64; 6];
        if let Some(caps) = self.regex.as_ref().and_then(|r| r.captures(text)) {
            for (field, group) in self.fields.iter().zip(caps.iter().skip(1)) {
                let value = group
                    .and_then(|m| m.as_str().parse::<u64>().ok())
                    .unwrap_or(0);
                let slot = match field {
                    's' => 0,
                    'Y' => 1,
                    'm' => 2,
                    'd' => 3,
                    'H' => 4,
                    _ => 5,
                };
                key[slot] = value;
            }
        }
        key
    }

    /// Order two expansions of this format, oldest first.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.key(a).cmp(&self.key(b)).then_with(|| a.cmp(b))
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Naming rules for one live file under one policy.
#[derive(Debug, Clone)]
pub struct NameTemplate {
    base: String,
    extension: Option<String>,
    add_extension: Option<String>,
    compress_ext: String,
    start: u32,
    date: Option<(DatePattern, String, DateShift)>,
}

impl NameTemplate {
    pub fn new(file_name: &str, naming: &Naming, compression: &Compression) -> Self {
        let (base, extension) = match naming.extension.as_deref() {
            Some(ext) if file_name.len() > ext.len() && file_name.ends_with(ext) => (
                file_name[..file_name.len() - ext.len()].to_string(),
                Some(ext.to_string()),
            ),
            _ => (file_name.to_string(), None),
        };
        let date = naming.dateext.then(|| {
            (
                DatePattern::new(&naming.dateformat),
                naming.dateformat.clone(),
                naming.date_shift(),
            )
        });
        Self {
            base,
            extension,
            add_extension: naming.add_extension.clone(),
            compress_ext: compression.extension.clone(),
            start: naming.start,
            date,
        }
    }

    pub fn for_policy(file_name: &str, policy: &Policy) -> Self {
        Self::new(file_name, &policy.naming, &policy.compression)
    }

    pub fn is_dated(&self) -> bool {
        self.date.is_some()
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn date_pattern(&self) -> Option<&DatePattern> {
        self.date.as_ref().map(|(pattern, _, _)| pattern)
    }

    /// Name for the file rotated right now, without compression.
    pub fn current(&self, now: DateTime<Local>) -> RotatedName {
        let suffix = match &self.date {
            Some((_, format, shift)) => {
                Suffix::Date(expand_date_format(format, reference_instant(*shift, now)))
            }
            None => Suffix::Index(self.start),
        };
        RotatedName {
            base: self.base.clone(),
            suffix,
            extension: self.extension.clone(),
            add_extension: self.add_extension.clone(),
            compression: None,
        }
    }

    /// Recognise a previously rotated file produced by this template.
    pub fn parse(&self, candidate: &str) -> Option<RotatedName> {
        let mut rest = candidate;

        let compressed_suffix = format!(".{}", self.compress_ext);
        let compression = match rest.strip_suffix(compressed_suffix.as_str()) {
            Some(stripped) => {
                rest = stripped;
                Some(self.compress_ext.clone())
            }
            None => None,
        };

        // Files rotated before `addextension` was configured lack it.
        let add_extension = match self.add_extension.as_deref() {
            Some(ext) => match rest.strip_suffix(ext) {
                Some(stripped) => {
                    rest = stripped;
                    Some(ext.to_string())
                }
                None => None,
            },
            None => None,
        };

        if let Some(ext) = self.extension.as_deref() {
            rest = rest.strip_suffix(ext)?;
        }

        let tail = rest.strip_prefix(self.base.as_str())?;
        let suffix = match &self.date {
            Some((pattern, _, _)) => {
                if !pattern.matches(tail) {
                    return None;
                }
                Suffix::Date(tail.to_string())
            }
            None => {
                let digits = tail.strip_prefix('.')?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                Suffix::Index(digits.parse().ok()?)
            }
        };

        Some(RotatedName {
            base: self.base.clone(),
            suffix,
            extension: self.extension.clone(),
            add_extension,
            compression,
        })
    }
}

/// Destination file name for rotating `file_name` under `policy` at `now`.
pub fn compute_rotated_name(policy: &Policy, file_name: &str, now: DateTime<Local>) -> String {
    NameTemplate::for_policy(file_name, policy)
        .current(now)
        .to_string()
}
