//! Rotation state ledger.
//!
//! A flat text file remembering the calendar date each log was last
//! rotated. Logs on hourly or minute schedules also get the time of day:
//!
//! ```text
//! # logrot state file
//! # "<path>" <year>-<month>-<day>[-<hour>:<minute>:<second>]
//! "/var/log/app.log" 2024-3-7
//! "/var/log/busy.log" 2024-3-7-13:5:0
//! ```
//!
//! Unknown paths report the Unix epoch so every schedule finds them due.

mod atomic;
pub mod error;
mod store;

pub use error::{Result, StateError};
pub use store::{STATE_HEADER, StateStore, epoch};
