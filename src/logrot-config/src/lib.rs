//! Configuration for logrot.
//!
//! Parses logrotate-style configuration text into an ordered list of
//! [`Section`]s, each carrying a fully resolved [`Policy`]. Global
//! directives seed the policy of every section opened after them, and
//! `include` splices other files (or whole directories) in place.
//!
//! ```text
//! compress
//! rotate 4
//!
//! /var/log/app/*.log {
//!     daily
//!     missingok
//!     postrotate
//!         kill -HUP $(cat /run/app.pid)
//!     endscript
//! }
//! ```

pub mod directive;
pub mod error;
pub mod parser;
pub mod paths;
pub mod policy;
pub mod taboo;

#[cfg(test)]
mod tests;

pub use error::{ConfigError, Result};
pub use parser::{Config, ConfigParser, Section, tokenize};
pub use paths::{expand_pattern, expand_patterns, expands_broadly};
pub use policy::{
    Compression, CreateMode, DateShift, Disposition, MailSettings, MailTiming, Naming, Policy,
    Recreate, Schedule, ScriptKind, Scripts, Shred, SmtpSettings,
};
pub use taboo::TabooList;
