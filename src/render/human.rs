//! Human-readable output using rich_rust.
//!
//! Renders status, activity and statistics as bordered panels.

use chrono::{DateTime, FixedOffset};
use rich_rust::prelude::*;
use rich_rust::{Color, ColorSystem, Segment, Style};

use crate::core::models::{
    ActionOutcome, ActivityRecord, ActivitySource, AuthSummary, GpuStatus, RemoteConnectivity, ResultStatistics,
    ServiceStatus, Severity, StatusSnapshot, StatusValue, SystemReport,
};
use crate::error::Result;

const PANEL_WIDTH: usize = 72;

type Line = Vec<Segment<'static>>;

/// Convert segments to a styled string with ANSI codes.
fn segments_to_string(segments: &[Segment], no_color: bool) -> String {
    segments
        .iter()
        .map(|seg| match &seg.style {
            Some(style) if !no_color => style.render(&seg.text, ColorSystem::TrueColor),
            _ => seg.text.to_string(),
        })
        .collect()
}

fn colored_style(name: &str) -> Style {
    Color::parse(name).map_or_else(|_| Style::new(), |color| Style::new().color(color))
}

fn label(text: &str) -> Segment<'static> {
    Segment::styled(format!("{text}: "), Style::new().bold())
}

fn field(name: &str, value: impl Into<String>) -> Line {
    vec![label(name), Segment::plain(value.into())]
}

fn dim(text: impl Into<String>, no_color: bool) -> Segment<'static> {
    let style = if no_color { Style::new() } else { Style::new().dim() };
    Segment::styled(text.into(), style)
}

const fn status_color(status: StatusValue) -> &'static str {
    match status {
        StatusValue::Active => "green",
        StatusValue::Idle | StatusValue::Starting => "cyan",
        StatusValue::Stale => "yellow",
        StatusValue::Stopped | StatusValue::Error => "red",
        StatusValue::Unknown => "white",
    }
}

const fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "green",
        Severity::Warning => "yellow",
        Severity::Error => "red",
        Severity::Debug | Severity::Unknown => "bright_black",
    }
}

fn panel(title_text: &str, title_color: &str, lines: Vec<Line>, no_color: bool) -> String {
    let title = if no_color {
        Text::new(title_text)
    } else {
        Text::styled(title_text, colored_style(title_color).bold())
    };

    let mut panel = Panel::new(lines).title(title).padding((0, 1));
    if !no_color {
        panel = panel.border_style(colored_style("blue"));
    }

    let segments = panel.render(PANEL_WIDTH);
    segments_to_string(&segments, no_color)
}

fn fmt_time(time: &DateTime<FixedOffset>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

fn fmt_age(seconds: i64) -> String {
    match seconds {
        s if s < 60 => format!("{s}s ago"),
        s if s < 3600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h {}m ago", s / 3600, (s % 3600) / 60),
        s => format!("{}d ago", s / 86_400),
    }
}

fn gpu_lines(gpu: &GpuStatus, no_color: bool) -> Vec<Line> {
    match gpu {
        GpuStatus::Available { info, memory_percent } => {
            let color = if *memory_percent >= 90.0 {
                "red"
            } else if *memory_percent >= 70.0 {
                "yellow"
            } else {
                "green"
            };
            let bar_style = if no_color { Style::new() } else { colored_style(color) };

            let mut bar = ProgressBar::with_total(100)
                .width(16)
                .bar_style(BarStyle::Block)
                .completed_style(bar_style)
                .remaining_style(colored_style("bright_black"))
                .show_percentage(false);
            bar.set_progress(memory_percent / 100.0);

            let mut line = vec![label("GPU")];
            line.extend(bar.render(16));
            line.push(Segment::plain(format!(
                " {memory_percent:.1}% · {}% util · {}°C",
                info.utilization_percent, info.temperature_c
            )));
            vec![
                line,
                field("GPU model", format!("{} ({} MB)", info.name, info.memory_total_mb)),
            ]
        }
        GpuStatus::Unavailable { reason } => vec![vec![label("GPU"), dim(format!("unavailable ({reason})"), no_color)]],
    }
}

fn remote_line(remote: &RemoteConnectivity, no_color: bool) -> Line {
    let color = match remote {
        RemoteConnectivity::Connected { .. } => "green",
        RemoteConnectivity::AuthFailed { .. } | RemoteConnectivity::Error { .. } => "red",
        RemoteConnectivity::NoCredentials { .. } => "yellow",
    };
    let style = if no_color { Style::new() } else { colored_style(color) };
    vec![
        label("Remote API"),
        Segment::styled(remote.label().to_string(), style),
        Segment::plain(format!(" – {}", remote.message())),
    ]
}

fn snapshot_lines(snapshot: &StatusSnapshot, no_color: bool) -> Vec<Line> {
    let status_style = if no_color {
        Style::new()
    } else {
        colored_style(status_color(snapshot.status)).bold()
    };
    let mut lines = vec![vec![
        label("Status"),
        Segment::styled(snapshot.status.as_str().to_uppercase(), status_style),
    ]];

    let source = match snapshot.activity_source {
        ActivitySource::Local => "local log",
        ActivitySource::Remote => "container log",
        ActivitySource::None => "none",
    };
    lines.push(field("Source", source));
    lines.push(field(
        "Process",
        if snapshot.process_alive { "running" } else { "not found" },
    ));

    if let Some(age) = snapshot.log_staleness_seconds {
        lines.push(field("Log updated", fmt_age(age)));
    }

    if let Some(activity) = &snapshot.last_activity {
        lines.push(activity_line(activity, no_color));
    }

    if let Some(next) = &snapshot.next_scheduled_mining {
        lines.push(field("Next mining", fmt_time(next)));
    }
    if let Some(next) = &snapshot.next_scheduled_submission {
        lines.push(field("Next submission", fmt_time(next)));
    }
    if let Some(gpu) = &snapshot.gpu_probe {
        lines.extend(gpu_lines(gpu, no_color));
    }
    if let Some(remote) = &snapshot.remote_connectivity {
        lines.push(remote_line(remote, no_color));
    }
    lines
}

fn activity_line(record: &ActivityRecord, no_color: bool) -> Line {
    let style = if no_color {
        Style::new()
    } else {
        colored_style(severity_color(record.severity))
    };
    vec![
        dim(format!("{} ", record.timestamp.format("%H:%M:%S")), no_color),
        Segment::styled(format!("{:<7} ", record.severity.as_str().to_uppercase()), style),
        Segment::plain(record.message.clone()),
    ]
}

fn activity_lines(records: &[ActivityRecord], no_color: bool) -> Vec<Line> {
    if records.is_empty() {
        return vec![vec![dim("No recent activity", no_color)]];
    }
    records.iter().map(|record| activity_line(record, no_color)).collect()
}

fn stats_lines(stats: &ResultStatistics) -> Vec<Line> {
    vec![
        field(
            "Total",
            format!("{} ({} ok, {} failed)", stats.total_generated, stats.successful, stats.failed),
        ),
        field(
            "Last 24h",
            format!("{} ({} ok)", stats.last_24h_generated, stats.last_24h_successful),
        ),
    ]
}

fn service_lines(service: Option<&ServiceStatus>, no_color: bool) -> Vec<Line> {
    match service {
        Some(ServiceStatus::Running { models, model_count }) => {
            let style = if no_color { Style::new() } else { colored_style("green") };
            let mut line = vec![label("Service"), Segment::styled("running".to_string(), style)];
            line.push(Segment::plain(format!(" · {model_count} models")));
            let mut lines = vec![line];
            if !models.is_empty() {
                lines.push(vec![dim(models.join(", "), no_color)]);
            }
            lines
        }
        Some(ServiceStatus::NotResponding { reason }) => {
            let style = if no_color { Style::new() } else { colored_style("red") };
            vec![vec![
                label("Service"),
                Segment::styled("not responding".to_string(), style),
                Segment::plain(format!(" – {reason}")),
            ]]
        }
        None => vec![vec![label("Service"), dim("not configured", no_color)]],
    }
}

/// # Errors
///
/// Never fails; returns `Result` for symmetry with the JSON renderers.
pub fn render_status(snapshot: &StatusSnapshot, no_color: bool) -> Result<String> {
    Ok(panel("Orchestrator", "cyan", snapshot_lines(snapshot, no_color), no_color))
}

/// # Errors
///
/// Never fails.
pub fn render_activity(records: &[ActivityRecord], no_color: bool) -> Result<String> {
    Ok(panel("Recent activity", "magenta", activity_lines(records, no_color), no_color))
}

/// Raw log lines, unstyled.
///
/// # Errors
///
/// Never fails.
pub fn render_logs(lines: &[String], no_color: bool) -> Result<String> {
    if lines.is_empty() {
        let empty = vec![vec![dim("No log lines available", no_color)]];
        return Ok(panel("Logs", "magenta", empty, no_color));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

/// # Errors
///
/// Never fails.
pub fn render_stats(stats: &ResultStatistics, no_color: bool) -> Result<String> {
    Ok(panel("Results", "cyan", stats_lines(stats), no_color))
}

/// # Errors
///
/// Never fails.
pub fn render_action(outcome: &ActionOutcome, no_color: bool) -> Result<String> {
    let (verdict, color) = if outcome.success {
        ("succeeded", "green")
    } else {
        ("failed", "red")
    };
    let style = if no_color { Style::new() } else { colored_style(color).bold() };
    let mut lines = vec![vec![label("Result"), Segment::styled(verdict.to_string(), style)]];
    if let Some(code) = outcome.exit_code {
        lines.push(field("Exit code", code.to_string()));
    }
    for (name, text) in [("stdout", &outcome.stdout), ("stderr", &outcome.stderr)] {
        let text = text.trim_end();
        if text.is_empty() {
            continue;
        }
        lines.push(vec![label(name)]);
        lines.extend(text.lines().map(|line| vec![Segment::plain(line.to_string())]));
    }
    let title = format!("Action: {}", outcome.kind);
    Ok(panel(&title, "cyan", lines, no_color))
}

/// # Errors
///
/// Never fails.
pub fn render_auth(summary: &AuthSummary, no_color: bool) -> Result<String> {
    let color = if summary.authenticated { "green" } else { "red" };
    let style = if no_color { Style::new() } else { colored_style(color).bold() };
    let mut lines = vec![vec![label("State"), Segment::styled(summary.state.clone(), style)]];
    if let Some(file) = &summary.credential_file {
        lines.push(field("Cookie file", file.clone()));
    }
    if let Some(base) = &summary.api_base {
        lines.push(field("API", base.clone()));
    }
    if let Some(at) = &summary.validated_at {
        lines.push(field("Validated", at.format("%Y-%m-%d %H:%M:%S UTC").to_string()));
    }
    Ok(panel("Credentials", "cyan", lines, no_color))
}

/// # Errors
///
/// Never fails.
pub fn render_report(report: &SystemReport, no_color: bool) -> Result<String> {
    let mut out = render_status(&report.snapshot, no_color)?;
    out.push('\n');
    out.push_str(&panel(
        "Inference service",
        "cyan",
        service_lines(report.service.as_ref(), no_color),
        no_color,
    ));
    out.push('\n');
    out.push_str(&render_stats(&report.statistics, no_color)?);
    out.push('\n');
    out.push_str(&render_activity(&report.recent_activity, no_color)?);
    Ok(out)
}
