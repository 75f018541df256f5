//! Log line normalization.
//!
//! Turns raw lines from the orchestrator's own log file or from the container
//! log stream into [`ActivityRecord`]s. Two shapes are recognized:
//!
//! - local: `2025-08-10 21:48:18,314 - INFO - message`
//! - remote: `time=2025-08-10T21:48:18.314Z level=INFO source=server.go:637 msg="message"`
//!
//! Anything else is kept verbatim with [`Severity::Unknown`]. Normalization
//! never fails; a line that cannot be picked apart degrades to the verbatim
//! form instead of being dropped.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};

use super::models::{ActivityRecord, Severity};

const LOCAL_SEPARATOR: &str = " - ";
const RULE_PREFIX: &str = "---";
const TIME_FIELD: &str = "time=";
const MSG_FIELD: &str = "msg=\"";

/// Timestamp layouts used by the local log writer, tried in order.
const LOCAL_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S,%3f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Where a batch of lines came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// The orchestrator's log file.
    Local,
    /// An externally hosted (container) log stream.
    Remote,
}

/// Normalize raw lines into activity records.
///
/// The returned iterator is lazy and single-pass: each raw line is visited
/// once, and normalizing again requires supplying the lines again.
pub fn normalize<I>(lines: I, kind: SourceKind, now: DateTime<FixedOffset>) -> Normalized<I::IntoIter>
where
    I: IntoIterator<Item = String>,
{
    Normalized {
        lines: lines.into_iter(),
        kind,
        now,
    }
}

/// Newest record of a tail, if any line survives normalization.
pub fn newest<I>(lines: I, kind: SourceKind, now: DateTime<FixedOffset>) -> Option<ActivityRecord>
where
    I: IntoIterator<Item = String>,
{
    normalize(lines, kind, now).last()
}

/// Lazy iterator returned by [`normalize`].
#[derive(Debug)]
pub struct Normalized<I> {
    lines: I,
    kind: SourceKind,
    now: DateTime<FixedOffset>,
}

impl<I> Iterator for Normalized<I>
where
    I: Iterator<Item = String>,
{
    type Item = ActivityRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = self.lines.next()?;
            if let Some(record) = normalize_line(&raw, self.kind, self.now) {
                return Some(record);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.lines.size_hint().1)
    }
}

/// Normalize a single line. `None` means the line is skipped (blank or a rule).
#[must_use]
pub fn normalize_line(raw: &str, kind: SourceKind, now: DateTime<FixedOffset>) -> Option<ActivityRecord> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with(RULE_PREFIX) {
        return None;
    }

    let parsed = match kind {
        SourceKind::Local => parse_local(line, now).or_else(|| parse_remote(line)),
        SourceKind::Remote => parse_remote(line).or_else(|| parse_local(line, now)),
    };

    Some(parsed.unwrap_or_else(|| {
        tracing::trace!(len = line.len(), "Unrecognized log line kept verbatim");
        ActivityRecord {
            timestamp: now,
            raw_timestamp: None,
            message: line.to_string(),
            severity: Severity::Unknown,
        }
    }))
}

/// `<timestamp> - <level> - <message>`, split on the first two separators.
///
/// The timestamp text is kept verbatim; parsing it is best-effort.
fn parse_local(line: &str, now: DateTime<FixedOffset>) -> Option<ActivityRecord> {
    let mut parts = line.splitn(3, LOCAL_SEPARATOR);
    let timestamp = parts.next()?.trim();
    let level = parts.next()?.trim();
    let message = parts.next()?.trim();

    Some(ActivityRecord {
        timestamp: parse_local_timestamp(timestamp).unwrap_or(now),
        raw_timestamp: Some(timestamp.to_string()),
        message: message.to_string(),
        severity: Severity::classify(level),
    })
}

/// `time=<ts> ... msg="<message>"`.
fn parse_remote(line: &str) -> Option<ActivityRecord> {
    let (head, after_msg) = line.split_once(MSG_FIELD)?;
    let time_start = head.find(TIME_FIELD)? + TIME_FIELD.len();
    let timestamp = head[time_start..].split(' ').next()?;
    let message = after_msg.trim_end_matches('"');

    let parsed = DateTime::parse_from_rfc3339(&zulu_to_offset(timestamp)).ok()?;

    Some(ActivityRecord {
        timestamp: parsed,
        raw_timestamp: Some(timestamp.to_string()),
        message: message.to_string(),
        severity: Severity::classify(line),
    })
}

fn zulu_to_offset(timestamp: &str) -> String {
    timestamp
        .strip_suffix('Z')
        .map_or_else(|| timestamp.to_string(), |base| format!("{base}+00:00"))
}

/// Best-effort parse of a local log timestamp.
///
/// Offset-less timestamps are read in the host's local zone.
fn parse_local_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&zulu_to_offset(text)) {
        return Some(parsed);
    }
    LOCAL_TIMESTAMP_FORMATS.iter().find_map(|format| {
        let naive = NaiveDateTime::parse_from_str(text, format).ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.fixed_offset())
    })
}
