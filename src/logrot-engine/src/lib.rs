//! Rotation engine for logrot.
//!
//! Given parsed configuration sections and the state ledger, decides which
//! logs are due and rotates them:
//!
//! - `eligibility` - the due/not-due decision for one file
//! - `naming` - rotated file names, parsed into and formatted from a model
//! - `ageout` - retention, renumbering, deferred compression
//! - `executor` - one rotation event
//! - `rotator` - the whole run: discovery, duplicates, shared scripts
//!
//! Everything runs on the calling thread; scripts and compressors are
//! awaited before the next step.

pub mod ageout;
pub mod clock;
pub mod compress;
pub mod context;
pub mod eligibility;
pub mod error;
mod executor;
pub mod mail;
pub mod naming;
pub mod rotator;
pub mod shred;

pub use clock::{Clock, FixedClock, SystemClock};
pub use context::{RunContext, RunOptions, RunSummary, ScriptFailurePolicy};
pub use eligibility::{FileStatus, Hold, Trigger, Verdict, evaluate, should_rotate};
pub use error::{MailError, Result, RotateError};
pub use mail::{CommandMailer, DEFAULT_MAIL_COMMAND, MailRequest, Mailer};
pub use naming::{NameTemplate, RotatedName, Suffix, compute_rotated_name};
pub use rotator::Rotator;
