//! Robot-mode output (JSON and Markdown).
//!
//! JSON output is wrapped in a versioned envelope so consumers can detect
//! schema changes. Markdown is terse `key: value` lists.

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::core::models::{
    ActionOutcome, ActivityRecord, AuthSummary, GpuStatus, ResultStatistics, ServiceStatus, StatusSnapshot,
    SystemReport,
};
use crate::error::Result;

/// Schema identifier carried by every JSON envelope.
pub const SCHEMA_VERSION: &str = "orchwatch.v1";

/// Envelope for all JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotOutput<T> {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub command: String,
    pub data: T,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl<T> RobotOutput<T> {
    pub fn new(command: impl Into<String>, data: T) -> Self {
        Self::with_errors(command, data, Vec::new())
    }

    pub fn with_errors(command: impl Into<String>, data: T, errors: Vec<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            command: command.into(),
            data,
            errors,
        }
    }
}

/// Serialize `data` inside an envelope for `command`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json<T: Serialize>(command: &str, data: &T, pretty: bool) -> Result<String> {
    let output = RobotOutput::new(command, data);
    Ok(if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    })
}

fn fmt_time(time: Option<&DateTime<FixedOffset>>) -> String {
    time.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S %:z").to_string())
}

fn push_snapshot_md(out: &mut String, snapshot: &StatusSnapshot) {
    let _ = writeln!(out, "- status: {}", snapshot.status);
    let _ = writeln!(out, "- source: {}", source_label(snapshot));
    let _ = writeln!(out, "- process_alive: {}", snapshot.process_alive);
    if let Some(age) = snapshot.log_staleness_seconds {
        let _ = writeln!(out, "- log_age_seconds: {age}");
    }
    if let Some(activity) = &snapshot.last_activity {
        let _ = writeln!(out, "- last_activity: [{}] {}", activity.severity, activity.message);
    }
    let _ = writeln!(out, "- next_mining: {}", fmt_time(snapshot.next_scheduled_mining.as_ref()));
    let _ = writeln!(
        out,
        "- next_submission: {}",
        fmt_time(snapshot.next_scheduled_submission.as_ref())
    );
    match &snapshot.gpu_probe {
        Some(GpuStatus::Available { info, memory_percent }) => {
            let _ = writeln!(
                out,
                "- gpu: {} {memory_percent:.1}% mem, {}% util, {}C",
                info.name, info.utilization_percent, info.temperature_c
            );
        }
        Some(GpuStatus::Unavailable { reason }) => {
            let _ = writeln!(out, "- gpu: unavailable ({reason})");
        }
        None => {}
    }
    if let Some(remote) = &snapshot.remote_connectivity {
        let _ = writeln!(out, "- remote: {} ({})", remote.label(), remote.message());
    }
}

const fn source_label(snapshot: &StatusSnapshot) -> &'static str {
    match snapshot.activity_source {
        crate::core::models::ActivitySource::Local => "local",
        crate::core::models::ActivitySource::Remote => "remote",
        crate::core::models::ActivitySource::None => "none",
    }
}

/// # Errors
///
/// Never fails; returns `Result` for symmetry with the JSON renderers.
pub fn render_status_md(snapshot: &StatusSnapshot) -> Result<String> {
    let mut out = String::from("## Orchestrator\n");
    push_snapshot_md(&mut out, snapshot);
    Ok(out)
}

fn push_activity_md(out: &mut String, records: &[ActivityRecord]) {
    if records.is_empty() {
        out.push_str("- no_activity\n");
        return;
    }
    out.push_str("| time | level | message |\n|------|-------|---------|\n");
    for record in records {
        let time = record.raw_timestamp.as_deref().unwrap_or("-");
        let message = record.message.replace('|', "\\|");
        let _ = writeln!(out, "| {time} | {} | {message} |", record.severity);
    }
}

/// # Errors
///
/// Never fails.
pub fn render_activity_md(records: &[ActivityRecord]) -> Result<String> {
    let mut out = String::from("## Activity\n");
    push_activity_md(&mut out, records);
    Ok(out)
}

/// # Errors
///
/// Never fails.
pub fn render_logs_md(lines: &[String]) -> Result<String> {
    let mut out = String::from("## Logs\n```\n");
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("```\n");
    Ok(out)
}

fn push_stats_md(out: &mut String, stats: &ResultStatistics) {
    let _ = writeln!(out, "- total: {}", stats.total_generated);
    let _ = writeln!(out, "- successful: {}", stats.successful);
    let _ = writeln!(out, "- failed: {}", stats.failed);
    let _ = writeln!(out, "- last_24h: {}", stats.last_24h_generated);
    let _ = writeln!(out, "- last_24h_successful: {}", stats.last_24h_successful);
}

/// # Errors
///
/// Never fails.
pub fn render_stats_md(stats: &ResultStatistics) -> Result<String> {
    let mut out = String::from("## Results\n");
    push_stats_md(&mut out, stats);
    Ok(out)
}

/// # Errors
///
/// Never fails.
pub fn render_action_md(outcome: &ActionOutcome) -> Result<String> {
    let mut out = format!("## Action {}\n", outcome.kind);
    let _ = writeln!(out, "- success: {}", outcome.success);
    if let Some(code) = outcome.exit_code {
        let _ = writeln!(out, "- exit_code: {code}");
    }
    for (label, text) in [("stdout", &outcome.stdout), ("stderr", &outcome.stderr)] {
        if !text.trim().is_empty() {
            let _ = write!(out, "\n### {label}\n```\n{}\n```\n", text.trim_end());
        }
    }
    Ok(out)
}

/// # Errors
///
/// Never fails.
pub fn render_auth_md(summary: &AuthSummary) -> Result<String> {
    let mut out = String::from("## Credentials\n");
    let _ = writeln!(out, "- state: {}", summary.state);
    let _ = writeln!(out, "- authenticated: {}", summary.authenticated);
    if let Some(file) = &summary.credential_file {
        let _ = writeln!(out, "- file: {file}");
    }
    if let Some(base) = &summary.api_base {
        let _ = writeln!(out, "- api_base: {base}");
    }
    Ok(out)
}

/// # Errors
///
/// Never fails.
pub fn render_report_md(report: &SystemReport) -> Result<String> {
    let mut out = String::from("## Orchestrator\n");
    push_snapshot_md(&mut out, &report.snapshot);

    out.push_str("\n## Service\n");
    match &report.service {
        Some(ServiceStatus::Running { models, model_count }) => {
            let _ = writeln!(out, "- status: running");
            let _ = writeln!(out, "- models: {model_count} ({})", models.join(", "));
        }
        Some(ServiceStatus::NotResponding { reason }) => {
            let _ = writeln!(out, "- status: not_responding ({reason})");
        }
        None => out.push_str("- status: not_configured\n"),
    }

    out.push_str("\n## Results\n");
    push_stats_md(&mut out, &report.statistics);

    out.push_str("\n## Activity\n");
    push_activity_md(&mut out, &report.recent_activity);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ActionKind, Severity, StatusValue};
    use crate::test_utils::{make_test_activity, make_test_snapshot, make_test_snapshot_minimal};
    use crate::{assert_contains, assert_json_valid, assert_not_contains};

    #[test]
    fn json_envelope_fields() {
        let snapshot = make_test_snapshot(StatusValue::Active);
        let json = render_json("status", &snapshot, false).unwrap();
        assert_json_valid!(&json);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["schemaVersion"], SCHEMA_VERSION);
        assert_eq!(value["command"], "status");
        assert_eq!(value["data"]["status"], "active");
        assert_eq!(value["data"]["activitySource"], "local");
        assert_eq!(value["data"]["gpuProbe"]["status"], "available");
        assert!(value["errors"].as_array().unwrap().is_empty());
    }

    #[test]
    fn json_omits_missing_signals() {
        let json = render_json("status", &make_test_snapshot_minimal(), false).unwrap();
        assert_not_contains!(&json, "gpuProbe");
        assert_not_contains!(&json, "lastActivity");
        assert_contains!(&json, "\"status\":\"unknown\"");
    }

    #[test]
    fn pretty_json_is_multiline() {
        let json = render_json("stats", &ResultStatistics::default(), true).unwrap();
        assert!(json.contains('\n'));
    }

    #[test]
    fn status_md_lists_fields() {
        let md = render_status_md(&make_test_snapshot(StatusValue::Stale)).unwrap();
        assert_contains!(&md, "- status: stale");
        assert_contains!(&md, "- process_alive: true");
        assert_contains!(&md, "- gpu: NVIDIA GeForce RTX 4090 25.0% mem");
    }

    #[test]
    fn activity_md_escapes_pipes() {
        let records = vec![make_test_activity("a | b", Severity::Warning)];
        let md = render_activity_md(&records).unwrap();
        assert_contains!(&md, "a \\| b");
        assert_contains!(&md, "| warning |");
        assert_contains!(&render_activity_md(&[]).unwrap(), "no_activity");
    }

    #[test]
    fn action_md_skips_empty_streams() {
        let outcome = ActionOutcome {
            kind: ActionKind::Submission,
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: "request timeout after 600 seconds".to_string(),
        };
        let md = render_action_md(&outcome).unwrap();
        assert_contains!(&md, "## Action submission");
        assert_not_contains!(&md, "exit_code");
        assert_not_contains!(&md, "### stdout");
        assert_contains!(&md, "### stderr");
    }
}
