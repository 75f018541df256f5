//! Result statistics.
//!
//! Counts the artifacts the orchestrator writes into its results directory.

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde_json::Value;

use super::models::{ResultFile, ResultStatistics};
use super::signals::ResultsScanner;

/// Window for the "recent" counters.
pub const RECENT_WINDOW: TimeDelta = TimeDelta::hours(24);

/// Whether a parsed result carries anything.
///
/// `null`, `""`, `[]` and `{}` are empty; every other value counts.
#[must_use]
pub fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Fold a listing into counts.
#[must_use]
pub fn summarize(files: &[ResultFile], now: DateTime<FixedOffset>) -> ResultStatistics {
    let cutoff = now - RECENT_WINDOW;
    files.iter().fold(ResultStatistics::default(), |mut stats, file| {
        stats.total_generated += 1;
        if file.parsed_successfully {
            stats.successful += 1;
        } else {
            stats.failed += 1;
        }
        if file.modified_at > cutoff {
            stats.last_24h_generated += 1;
            if file.parsed_successfully {
                stats.last_24h_successful += 1;
            }
        }
        stats
    })
}

/// Scan and count. A failed scan yields all-zero statistics.
pub async fn collect(scanner: &dyn ResultsScanner, now: DateTime<FixedOffset>) -> ResultStatistics {
    match scanner.list_result_files().await {
        Ok(files) => summarize(&files, now),
        Err(e) => {
            tracing::warn!(code = e.error_code(), error = %e, "Could not scan results");
            ResultStatistics::default()
        }
    }
}
