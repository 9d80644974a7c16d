//! Whether a log file is due for rotation.
//!
//! Checks run in a fixed order and the first decisive one wins:
//!
//! 1. missing file
//! 2. `minage` (not overridden by force)
//! 3. empty file under `notifempty` (not overridden by force)
//! 4. force
//! 5. `minsize` veto
//! 6. `maxsize`
//! 7. `size`
//! 8. time schedule, measured from the last rotation date
//!
//! Day-granular schedules only see the date of the last rotation, so their
//! elapsed time counts from midnight. Hourly and minute schedules get the
//! recorded time of day as well.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeDelta};

use logrot_config::{Policy, Schedule};

/// What the evaluator needs to know about a live log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStatus {
    pub exists: bool,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
}

impl FileStatus {
    pub fn missing() -> Self {
        Self {
            exists: false,
            size: 0,
            modified: None,
        }
    }

    /// Stat `path`; a missing file is a status, not an error.
    pub fn probe(path: &Path) -> io::Result<Self> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Self {
                exists: true,
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Local>::from),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::missing()),
            Err(e) => Err(e),
        }
    }
}

/// Why a file is rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Forced,
    MaxSize,
    Size,
    Schedule,
}

/// Why a present file is left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hold {
    TooYoung,
    Empty,
    BelowMinSize,
    NotDue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Rotate(Trigger),
    Skip(Hold),
    /// The file is absent; `allowed` reflects `missingok`.
    Missing { allowed: bool },
}

impl Verdict {
    pub fn is_rotate(&self) -> bool {
        matches!(self, Verdict::Rotate(_))
    }
}

/// Decide whether the file described by `status` rotates now.
pub fn evaluate(
    status: &FileStatus,
    policy: &Policy,
    last_rotation: NaiveDateTime,
    now: DateTime<Local>,
    force: bool,
) -> Verdict {
    if !status.exists {
        return Verdict::Missing {
            allowed: policy.missing_ok,
        };
    }

    if policy.min_age > 0 {
        if let Some(modified) = status.modified {
            let age_days = (now - modified).num_days();
            if age_days < i64::from(policy.min_age) {
                return Verdict::Skip(Hold::TooYoung);
            }
        }
    }

    if status.size == 0 && !policy.if_empty {
        return Verdict::Skip(Hold::Empty);
    }

    if force {
        return Verdict::Rotate(Trigger::Forced);
    }

    if let Some(minsize) = policy.minsize {
        if status.size < minsize {
            return Verdict::Skip(Hold::BelowMinSize);
        }
    }

    if let Some(maxsize) = policy.maxsize {
        if status.size >= maxsize {
            return Verdict::Rotate(Trigger::MaxSize);
        }
    }

    if let Some(size) = policy.size {
        if status.size >= size {
            return Verdict::Rotate(Trigger::Size);
        }
    }

    if schedule_due(policy.schedule, last_rotation, now) {
        Verdict::Rotate(Trigger::Schedule)
    } else {
        Verdict::Skip(Hold::NotDue)
    }
}

/// `ShouldRotate` in boolean form.
pub fn should_rotate(
    status: &FileStatus,
    policy: &Policy,
    last_rotation: NaiveDateTime,
    now: DateTime<Local>,
    force: bool,
) -> bool {
    evaluate(status, policy, last_rotation, now, force).is_rotate()
}

fn weekday_number(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}

/// Time-window check. Weekly and monthly rollover compare calendar
/// numbers, not elapsed weeks or months.
pub fn schedule_due(schedule: Schedule, last: NaiveDateTime, now: DateTime<Local>) -> bool {
    let today = now.date_naive();
    let last_rotation = last.date();
    let elapsed = now.naive_local() - last;
    let one_day = TimeDelta::days(1);

    match schedule {
        Schedule::None => false,
        Schedule::Minutes(n) => elapsed >= TimeDelta::minutes(i64::from(n)),
        Schedule::Hourly => elapsed > TimeDelta::hours(1),
        Schedule::Daily => elapsed > one_day,
        Schedule::Weekly(weekday) => {
            elapsed > TimeDelta::days(7)
                || match weekday {
                    Some(day) => weekday_number(today) == u32::from(day) && elapsed >= one_day,
                    None => weekday_number(today) < weekday_number(last_rotation),
                }
        }
        Schedule::Monthly(day) => match day {
            Some(day) => today.day() == u32::from(day) && elapsed >= one_day,
            None => (today.year(), today.month()) != (last_rotation.year(), last_rotation.month()),
        },
        Schedule::Yearly => today.year() != last_rotation.year(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    /// Midnight of the given day, as recorded for day-granular schedules.
    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    fn present(size: u64, modified: DateTime<Local>) -> FileStatus {
        FileStatus {
            exists: true,
            size,
            modified: Some(modified),
        }
    }

    #[test]
    fn test_missing_file() {
        let mut policy = Policy::default();
        let now = at(2024, 3, 7, 12);
        assert_eq!(
            evaluate(&FileStatus::missing(), &policy, date(2024, 1, 1), now, true),
            Verdict::Missing { allowed: false }
        );
        policy.missing_ok = true;
        assert_eq!(
            evaluate(&FileStatus::missing(), &policy, date(2024, 1, 1), now, true),
            Verdict::Missing { allowed: true }
        );
    }

    #[test]
    fn test_minage_beats_force() {
        let policy = Policy {
            min_age: 3,
            ..Policy::default()
        };
        let now = at(2024, 3, 7, 12);
        let status = present(100, at(2024, 3, 6, 12));
        assert_eq!(
            evaluate(&status, &policy, date(1970, 1, 1), now, true),
            Verdict::Skip(Hold::TooYoung)
        );

        let old = present(100, at(2024, 3, 1, 12));
        assert!(should_rotate(&old, &policy, date(1970, 1, 1), now, true));
    }

    #[test]
    fn test_notifempty_beats_force() {
        let policy = Policy {
            if_empty: false,
            ..Policy::default()
        };
        let now = at(2024, 3, 7, 12);
        assert_eq!(
            evaluate(&present(0, now), &policy, date(1970, 1, 1), now, true),
            Verdict::Skip(Hold::Empty)
        );
        assert!(should_rotate(&present(0, now), &Policy::default(), date(1970, 1, 1), now, true));
    }

    #[test]
    fn test_size_thresholds() {
        let now = at(2024, 3, 7, 12);
        let last = date(2024, 3, 7);

        let sized = Policy {
            size: Some(100),
            ..Policy::default()
        };
        assert_eq!(
            evaluate(&present(100, now), &sized, last, now, false),
            Verdict::Rotate(Trigger::Size)
        );
        assert_eq!(
            evaluate(&present(99, now), &sized, last, now, false),
            Verdict::Skip(Hold::NotDue)
        );

        let capped = Policy {
            maxsize: Some(50),
            schedule: Schedule::Yearly,
            ..Policy::default()
        };
        assert_eq!(
            evaluate(&present(60, now), &capped, last, now, false),
            Verdict::Rotate(Trigger::MaxSize)
        );
    }

    #[test]
    fn test_minsize_vetoes_schedule() {
        let policy = Policy {
            minsize: Some(1000),
            schedule: Schedule::Daily,
            ..Policy::default()
        };
        let now = at(2024, 3, 7, 12);
        assert_eq!(
            evaluate(&present(10, now), &policy, date(1970, 1, 1), now, false),
            Verdict::Skip(Hold::BelowMinSize)
        );
        assert_eq!(
            evaluate(&present(1000, now), &policy, date(1970, 1, 1), now, false),
            Verdict::Rotate(Trigger::Schedule)
        );
    }

    #[test]
    fn test_never_rotated_file_is_due_for_any_schedule() {
        let now = at(2024, 3, 7, 12);
        for schedule in [
            Schedule::Minutes(5),
            Schedule::Hourly,
            Schedule::Daily,
            Schedule::Weekly(None),
            Schedule::Monthly(None),
            Schedule::Yearly,
        ] {
            assert!(schedule_due(schedule, date(1970, 1, 1), now), "{schedule:?}");
        }
        assert!(!schedule_due(Schedule::None, date(1970, 1, 1), now));
    }

    #[test]
    fn test_daily_and_hourly() {
        assert!(!schedule_due(Schedule::Daily, date(2024, 3, 7), at(2024, 3, 7, 23)));
        assert!(!schedule_due(Schedule::Daily, date(2024, 3, 7), at(2024, 3, 8, 0)));
        assert!(schedule_due(Schedule::Daily, date(2024, 3, 7), at(2024, 3, 8, 1)));

        assert!(!schedule_due(Schedule::Hourly, date(2024, 3, 7), at(2024, 3, 7, 1)));
        assert!(schedule_due(Schedule::Hourly, date(2024, 3, 7), at(2024, 3, 7, 2)));
    }

    #[test]
    fn test_weekly_rollover_and_pinned_day() {
        // 2024-03-07 is a Thursday, 2024-03-10 a Sunday.
        let thursday = date(2024, 3, 7);
        assert!(!schedule_due(Schedule::Weekly(None), thursday, at(2024, 3, 9, 12)));
        assert!(schedule_due(Schedule::Weekly(None), thursday, at(2024, 3, 10, 12)));
        assert!(schedule_due(Schedule::Weekly(None), thursday, at(2024, 3, 15, 12)));

        assert!(schedule_due(Schedule::Weekly(Some(0)), thursday, at(2024, 3, 10, 12)));
        assert!(!schedule_due(Schedule::Weekly(Some(1)), thursday, at(2024, 3, 10, 12)));
        assert!(!schedule_due(Schedule::Weekly(Some(4)), thursday, at(2024, 3, 7, 12)));
    }

    #[test]
    fn test_monthly_and_yearly() {
        let last = date(2024, 3, 7);
        assert!(!schedule_due(Schedule::Monthly(None), last, at(2024, 3, 31, 12)));
        assert!(schedule_due(Schedule::Monthly(None), last, at(2024, 4, 1, 0)));
        assert!(schedule_due(Schedule::Monthly(Some(15)), last, at(2024, 3, 15, 12)));
        assert!(!schedule_due(Schedule::Monthly(Some(15)), last, at(2024, 3, 16, 12)));

        assert!(!schedule_due(Schedule::Yearly, last, at(2024, 12, 31, 12)));
        assert!(schedule_due(Schedule::Yearly, last, at(2025, 1, 1, 0)));
    }

    #[test]
    fn test_hourly_counts_from_recorded_time() {
        let last = at(2024, 3, 7, 12).naive_local();
        let later = |minutes| at(2024, 3, 7, 12) + TimeDelta::minutes(minutes);
        assert!(!schedule_due(Schedule::Hourly, last, later(5)));
        assert!(!schedule_due(Schedule::Hourly, last, later(60)));
        assert!(schedule_due(Schedule::Hourly, last, later(61)));

        assert!(!schedule_due(Schedule::Minutes(15), last, later(10)));
        assert!(schedule_due(Schedule::Minutes(15), last, later(15)));
    }

    #[test]
    fn test_minutes() {
        let last = date(2024, 3, 7);
        assert!(!schedule_due(Schedule::Minutes(90), last, at(2024, 3, 7, 1)));
        assert!(schedule_due(Schedule::Minutes(90), last, at(2024, 3, 7, 2)));
    }
}
