//! Schedule predictions for the orchestrator's periodic actions.
//!
//! Mining runs on fixed wall-clock boundaries (every N hours from midnight);
//! submission runs once a day at a fixed hour after the last recorded
//! submission.

use chrono::{DateTime, Days, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike};

const GAP_STEP_MINUTES: i64 = 15;

/// Longest DST gap bridged, in steps.
const MAX_GAP_STEPS: i64 = 8;

/// Map a wall-clock time into `tz`.
///
/// Ambiguous times take the earlier instant. Times skipped by a DST gap
/// resolve to the first valid wall-clock time after the gap.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    (0..=MAX_GAP_STEPS).find_map(|step| {
        let candidate = naive.checked_add_signed(TimeDelta::minutes(GAP_STEP_MINUTES * step))?;
        tz.from_local_datetime(&candidate).earliest()
    })
}

/// Next multiple-of-`interval_hours` boundary strictly after `now`.
///
/// Boundaries are counted from local midnight in `now`'s zone. When `now`
/// sits exactly on a boundary, the following boundary is returned.
/// `interval_hours` must divide 24; returns `None` otherwise. A boundary
/// skipped by a DST gap moves to the end of the gap.
pub fn next_mining_after<Tz: TimeZone>(now: &DateTime<Tz>, interval_hours: u32) -> Option<DateTime<Tz>> {
    if interval_hours == 0 || 24 % interval_hours != 0 {
        return None;
    }

    let next_hour = (now.hour() / interval_hours + 1) * interval_hours;
    let date = now.date_naive();
    let naive = if next_hour >= 24 {
        date.checked_add_days(Days::new(1))?.and_time(NaiveTime::MIN)
    } else {
        date.and_hms_opt(next_hour, 0, 0)?
    };

    resolve_local(&now.timezone(), naive)
}

/// Next submission time: the day after `last`, at `hour:00:00`.
pub fn next_submission_after<Tz: TimeZone>(last: &DateTime<Tz>, hour: u32) -> Option<DateTime<Tz>> {
    let naive = last
        .date_naive()
        .checked_add_days(Days::new(1))?
        .and_hms_opt(hour, 0, 0)?;
    resolve_local(&last.timezone(), naive)
}

/// Parse a persisted ISO-8601 submission date.
///
/// Accepts RFC 3339 with an offset, a naive date-time (read in the host's
/// local zone) or a bare date.
#[must_use]
pub fn parse_submission_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed);
    }
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })?;
    resolve_local(&Local, naive).map(|dt| dt.fixed_offset())
}
