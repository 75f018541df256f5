//! Core data models.
//!
//! These types are the stable, JSON-serializable shapes handed to whatever
//! front-end renders orchestrator health.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

// =============================================================================
// Status Value
// =============================================================================

/// Consolidated orchestrator status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusValue {
    /// Log is fresh and the process is alive (or recent activity was seen).
    Active,
    /// Log is fresh but the process could not be confirmed alive.
    Idle,
    /// Process is alive but the log has gone quiet.
    Stale,
    /// Log is stale and no process was found.
    Stopped,
    /// Process is alive but has not created its log yet.
    Starting,
    /// The most recent marker in the log tail is an error.
    Error,
    /// No signal produced a definitive answer.
    #[default]
    Unknown,
}

impl StatusValue {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Idle => "idle",
            Self::Stale => "stale",
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the orchestrator looks healthy.
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Active | Self::Idle | Self::Starting)
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Activity Records
// =============================================================================

/// Severity of a normalized log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Debug,
    Unknown,
}

impl Severity {
    /// Ordered substring rules; first hit wins.
    const RULES: [(&'static str, Self); 3] = [
        ("INFO", Self::Info),
        ("ERROR", Self::Error),
        ("WARNING", Self::Warning),
    ];

    /// Classify free text by the first matching level marker.
    ///
    /// Text with no marker is `Debug`. `Unknown` is reserved for lines the
    /// normalizer could not parse at all.
    #[must_use]
    pub fn classify(text: &str) -> Self {
        Self::RULES
            .iter()
            .find(|(marker, _)| text.contains(marker))
            .map_or(Self::Debug, |(_, severity)| *severity)
    }

    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Debug => "debug",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One log line in a source-independent shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    /// Best-effort parsed instant; the evaluation instant when unparsable.
    pub timestamp: DateTime<FixedOffset>,

    /// Timestamp text exactly as it appeared in the line, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_timestamp: Option<String>,

    pub message: String,

    pub severity: Severity,
}

/// Which log tail fed the status and activity fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    /// The orchestrator's local log file.
    Local,
    /// The container log stream.
    Remote,
    /// Neither produced lines.
    #[default]
    None,
}

// =============================================================================
// Probe Payloads
// =============================================================================

/// GPU metrics reported by the driver tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuInfo {
    pub name: String,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub utilization_percent: u32,
    pub temperature_c: u32,
}

impl GpuInfo {
    /// Memory in use as a percentage, rounded to one decimal.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn memory_percent(&self) -> f64 {
        if self.memory_total_mb == 0 {
            return 0.0;
        }
        let pct = self.memory_used_mb as f64 / self.memory_total_mb as f64 * 100.0;
        (pct * 10.0).round() / 10.0
    }
}

/// GPU probe result as shown in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GpuStatus {
    #[serde(rename_all = "camelCase")]
    Available { info: GpuInfo, memory_percent: f64 },
    Unavailable {
        reason: String,
    },
}

impl GpuStatus {
    /// Wrap probed metrics.
    #[must_use]
    pub fn available(info: GpuInfo) -> Self {
        let memory_percent = info.memory_percent();
        Self::Available {
            info,
            memory_percent,
        }
    }
}

/// Outcome of checking the remote API session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteConnectivity {
    Connected { message: String },
    AuthFailed { message: String },
    NoCredentials { message: String },
    Error { message: String },
}

impl RemoteConnectivity {
    /// Stable lowercase label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::AuthFailed { .. } => "auth_failed",
            Self::NoCredentials { .. } => "no_credentials",
            Self::Error { .. } => "error",
        }
    }

    /// Human-readable detail.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Connected { message }
            | Self::AuthFailed { message }
            | Self::NoCredentials { message }
            | Self::Error { message } => message,
        }
    }
}

/// Status of the local inference service the orchestrator depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServiceStatus {
    #[serde(rename_all = "camelCase")]
    Running {
        models: Vec<String>,
        model_count: usize,
    },
    NotResponding {
        reason: String,
    },
}

// =============================================================================
// Status Snapshot
// =============================================================================

/// One immutable evaluation of every signal source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub evaluated_at: DateTime<FixedOffset>,

    pub status: StatusValue,

    pub activity_source: ActivitySource,

    pub process_alive: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_staleness_seconds: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<ActivityRecord>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_scheduled_mining: Option<DateTime<FixedOffset>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_scheduled_submission: Option<DateTime<FixedOffset>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_probe: Option<GpuStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_connectivity: Option<RemoteConnectivity>,
}

// =============================================================================
// Statistics
// =============================================================================

/// One file found in the results directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFile {
    pub name: String,
    pub modified_at: DateTime<FixedOffset>,
    pub parsed_successfully: bool,
}

/// Counts over the results directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultStatistics {
    pub total_generated: usize,
    pub successful: usize,
    pub failed: usize,
    pub last_24h_generated: usize,
    pub last_24h_successful: usize,
}

// =============================================================================
// Actions
// =============================================================================

/// Manually triggerable orchestrator actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Mining,
    Submission,
    Generation,
}

impl ActionKind {
    pub const ALL: &'static [Self] = &[Self::Mining, Self::Submission, Self::Generation];

    /// Parse from CLI argument.
    #[must_use]
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mining" | "mine" | "miner" => Some(Self::Mining),
            "submission" | "submit" | "submitter" => Some(Self::Submission),
            "generation" | "generate" | "generator" => Some(Self::Generation),
            _ => None,
        }
    }

    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mining => "mining",
            Self::Submission => "submission",
            Self::Generation => "generation",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Captured result of running an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub kind: ActionKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

// =============================================================================
// Credentials
// =============================================================================

/// Outcome of an explicit credential check. Never carries the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSummary {
    /// Final credential state label (`validated`, `rejected`, ...).
    pub state: String,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validated_at: Option<DateTime<chrono::Utc>>,
}

// =============================================================================
// System Report
// =============================================================================

/// Everything the dashboard page shows in one payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemReport {
    pub snapshot: StatusSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceStatus>,
    pub recent_activity: Vec<ActivityRecord>,
    pub statistics: ResultStatistics,
}
