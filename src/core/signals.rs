//! Signal source seams.
//!
//! Every external input the aggregator consumes sits behind one of these
//! traits so hosts can swap in real probes ([`crate::core::probes`]) and tests
//! can swap in scripted ones. None of them are trusted: the aggregator wraps
//! every call in [`probe`] and degrades the affected field on failure.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use super::models::{GpuInfo, RemoteConnectivity, ResultFile, ServiceStatus};
use crate::error::{Result, WatchError};

/// Metadata for a local file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub modified_at: DateTime<FixedOffset>,
}

/// Whether a named background process is alive.
#[async_trait]
pub trait ProcessProbe: Send + Sync {
    async fn is_running(&self, name: &str) -> Result<bool>;
}

/// Local file metadata and tail access.
#[async_trait]
pub trait FileProbe: Send + Sync {
    /// `Ok(None)` when the file does not exist.
    async fn stat(&self, path: &Path) -> Result<Option<FileStat>>;

    /// Last `max_lines` lines, oldest first.
    async fn read_tail(&self, path: &Path, max_lines: usize) -> Result<Vec<String>>;
}

/// Tail of an externally hosted log stream (e.g. a container).
#[async_trait]
pub trait RemoteLogFetcher: Send + Sync {
    /// Human-readable name of the source, used in logs.
    fn source(&self) -> &str;

    async fn fetch_tail(&self, max_lines: usize) -> Result<Vec<String>>;
}

/// GPU metrics.
#[async_trait]
pub trait GpuProbe: Send + Sync {
    async fn probe(&self) -> Result<GpuInfo>;
}

/// Health of the inference service.
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    async fn probe(&self) -> Result<ServiceStatus>;
}

/// Persisted submission schedule.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Raw ISO-8601 text of the last submission, if one was recorded.
    async fn last_submission_date(&self) -> Result<Option<String>>;
}

/// Informational check of the remote API session.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn check(&self) -> RemoteConnectivity;
}

/// Results directory listing.
#[async_trait]
pub trait ResultsScanner: Send + Sync {
    async fn list_result_files(&self) -> Result<Vec<ResultFile>>;
}

/// Source of an operator-entered secret.
///
/// Returns `None` when the operator cancels (EOF, interrupt).
pub trait SecretPrompt: Send + Sync {
    fn prompt(&mut self, message: &str) -> Option<String>;
}

// =============================================================================
// Tagged probe result
// =============================================================================

/// Result of one fault-isolated sub-probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// The probe answered.
    Ready(T),
    /// The probe failed or timed out; `reason` is safe to log.
    Unavailable { reason: String },
}

impl<T> Probe<T> {
    /// The value, if the probe answered.
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Unavailable { .. } => None,
        }
    }

    /// The value, or `fallback` when unavailable.
    pub fn unwrap_or(self, fallback: T) -> T {
        self.ready().unwrap_or(fallback)
    }

    /// Whether the probe answered.
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Run one sub-probe under a time budget and tag its outcome.
///
/// Failures and timeouts are logged at warn level and never propagated.
pub async fn probe<T, F>(signal: &str, budget: Duration, fut: F) -> Probe<T>
where
    F: Future<Output = Result<T>>,
{
    let err = match tokio::time::timeout(budget, fut).await {
        Ok(Ok(value)) => return Probe::Ready(value),
        Ok(Err(e)) => e,
        Err(_) => WatchError::SignalTimeout {
            signal: signal.to_string(),
            seconds: budget.as_secs(),
        },
    };
    tracing::warn!(signal, code = err.error_code(), error = %err, "Signal unavailable");
    Probe::Unavailable {
        reason: err.to_string(),
    }
}
