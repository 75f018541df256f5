//! Output rendering for human and robot modes.

pub mod error;
pub mod human;
pub mod robot;

use std::io::IsTerminal;

use crate::cli::args::OutputFormat;
use crate::core::models::{
    ActionOutcome, ActivityRecord, AuthSummary, ResultStatistics, StatusSnapshot, SystemReport,
};
use crate::error::Result;

/// Whether human output should carry ANSI styling.
///
/// Off for `--no-color`, `TERM=dumb`, or when stdout is not a terminal.
#[must_use]
pub fn should_use_color(no_color: bool) -> bool {
    if no_color {
        return false;
    }
    if std::env::var("TERM").is_ok_and(|term| term == "dumb") {
        return false;
    }
    std::io::stdout().is_terminal()
}

/// Render a status snapshot.
pub fn render_status(snapshot: &StatusSnapshot, format: OutputFormat, pretty: bool, no_color: bool) -> Result<String> {
    match format {
        OutputFormat::Human => human::render_status(snapshot, no_color),
        OutputFormat::Json => robot::render_json("status", snapshot, pretty),
        OutputFormat::Md => robot::render_status_md(snapshot),
    }
}

/// Render the combined system report.
pub fn render_report(report: &SystemReport, format: OutputFormat, pretty: bool, no_color: bool) -> Result<String> {
    match format {
        OutputFormat::Human => human::render_report(report, no_color),
        OutputFormat::Json => robot::render_json("report", report, pretty),
        OutputFormat::Md => robot::render_report_md(report),
    }
}

/// Render normalized activity records.
pub fn render_activity(records: &[ActivityRecord], format: OutputFormat, pretty: bool, no_color: bool) -> Result<String> {
    match format {
        OutputFormat::Human => human::render_activity(records, no_color),
        OutputFormat::Json => robot::render_json("activity", &records, pretty),
        OutputFormat::Md => robot::render_activity_md(records),
    }
}

/// Render raw log lines.
pub fn render_logs(lines: &[String], format: OutputFormat, pretty: bool, no_color: bool) -> Result<String> {
    match format {
        OutputFormat::Human => human::render_logs(lines, no_color),
        OutputFormat::Json => robot::render_json("logs", &lines, pretty),
        OutputFormat::Md => robot::render_logs_md(lines),
    }
}

/// Render result statistics.
pub fn render_stats(stats: &ResultStatistics, format: OutputFormat, pretty: bool, no_color: bool) -> Result<String> {
    match format {
        OutputFormat::Human => human::render_stats(stats, no_color),
        OutputFormat::Json => robot::render_json("stats", stats, pretty),
        OutputFormat::Md => robot::render_stats_md(stats),
    }
}

/// Render an action outcome.
pub fn render_action(outcome: &ActionOutcome, format: OutputFormat, pretty: bool, no_color: bool) -> Result<String> {
    match format {
        OutputFormat::Human => human::render_action(outcome, no_color),
        OutputFormat::Json => robot::render_json("trigger", outcome, pretty),
        OutputFormat::Md => robot::render_action_md(outcome),
    }
}

/// Render a credential check.
pub fn render_auth(summary: &AuthSummary, format: OutputFormat, pretty: bool, no_color: bool) -> Result<String> {
    match format {
        OutputFormat::Human => human::render_auth(summary, no_color),
        OutputFormat::Json => robot::render_json("auth", summary, pretty),
        OutputFormat::Md => robot::render_auth_md(summary),
    }
}
