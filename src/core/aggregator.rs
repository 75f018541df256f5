//! Status aggregation.
//!
//! Reconciles process liveness, log freshness and an optional remote log tail
//! into one [`StatusValue`] using a fixed fallback chain:
//!
//! 1. process probe (failure counts as "not alive")
//! 2. local log freshness, then a newest-first marker scan of its tail
//! 3. missing log with a live process is `Starting`
//! 4. still `Unknown`: any remote tail content means `Active`
//!
//! Schedule predictions, GPU metrics and remote connectivity are attached
//! alongside. Each collaborator call runs under its own timeout through
//! [`probe`]; a failure degrades one field and never the whole evaluation.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta};

use super::models::{ActivitySource, GpuStatus, RemoteConnectivity, StatusSnapshot, StatusValue};
use super::normalizer::{SourceKind, newest};
use super::schedule::{next_mining_after, next_submission_after, parse_submission_date};
use super::signals::{
    ConnectivityProbe, FileProbe, GpuProbe, ProcessProbe, Probe, RemoteLogFetcher, ScheduleStore, probe,
};
use crate::error::{Result, WatchError};

/// Lines that show the orchestrator doing work.
pub const DEFAULT_ACTIVITY_MARKERS: &[&str] =
    &["alpha generator", "generating alpha", "Running alpha", "Started alpha"];

/// Lines that show the orchestrator failing.
pub const DEFAULT_ERROR_MARKERS: &[&str] = &["Error", "FATAL", "Exception", "Failed"];

/// An error marker on a line carrying this text is not treated as an error.
pub const INFO_MARKER: &str = "INFO";

/// Tunables for one aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Lines read from the end of each log.
    pub tail_lines: usize,
    /// Log age under which the orchestrator counts as fresh.
    pub freshness_threshold: Duration,
    pub activity_markers: Vec<String>,
    pub error_markers: Vec<String>,
    /// Mining cadence; must divide 24.
    pub mining_interval_hours: u32,
    /// Hour of day submissions run.
    pub submission_hour: u32,
    /// Budget for each collaborator call.
    pub probe_timeout: Duration,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            tail_lines: 50,
            freshness_threshold: Duration::from_secs(300),
            activity_markers: DEFAULT_ACTIVITY_MARKERS.iter().map(ToString::to_string).collect(),
            error_markers: DEFAULT_ERROR_MARKERS.iter().map(ToString::to_string).collect(),
            mining_interval_hours: 6,
            submission_hour: 14,
            probe_timeout: Duration::from_secs(10),
        }
    }
}

impl AggregatorSettings {
    /// Reject values the fallback chain cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ConfigInvalid`] naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| {
            Err(WatchError::ConfigInvalid {
                key: key.to_string(),
                message: message.to_string(),
            })
        };
        if self.tail_lines == 0 {
            return invalid("orchestrator.tail_lines", "must be at least 1");
        }
        if self.freshness_threshold.is_zero() {
            return invalid("orchestrator.freshness_seconds", "must be positive");
        }
        if self.mining_interval_hours == 0 || 24 % self.mining_interval_hours != 0 {
            return invalid("schedule.mining_interval_hours", "must divide 24");
        }
        if self.submission_hour > 23 {
            return invalid("schedule.submission_hour", "must be between 0 and 23");
        }
        if self.probe_timeout.is_zero() {
            return invalid("general.probe_timeout_seconds", "must be positive");
        }
        Ok(())
    }
}

/// Outcome of scanning a tail for markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Activity,
    Error,
}

/// Produces [`StatusSnapshot`]s. Holds no per-evaluation state, so one
/// instance serves concurrent callers.
#[derive(Clone)]
pub struct StatusAggregator {
    settings: AggregatorSettings,
    process: Arc<dyn ProcessProbe>,
    files: Arc<dyn FileProbe>,
    schedule: Arc<dyn ScheduleStore>,
    gpu: Option<Arc<dyn GpuProbe>>,
    connectivity: Option<Arc<dyn ConnectivityProbe>>,
}

impl std::fmt::Debug for StatusAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusAggregator")
            .field("settings", &self.settings)
            .field("gpu", &self.gpu.is_some())
            .field("connectivity", &self.connectivity.is_some())
            .finish_non_exhaustive()
    }
}

impl StatusAggregator {
    /// # Errors
    ///
    /// Returns a configuration error when `settings` are invalid.
    pub fn new(
        settings: AggregatorSettings,
        process: Arc<dyn ProcessProbe>,
        files: Arc<dyn FileProbe>,
        schedule: Arc<dyn ScheduleStore>,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            process,
            files,
            schedule,
            gpu: None,
            connectivity: None,
        })
    }

    /// Attach a GPU probe.
    #[must_use]
    pub fn with_gpu(mut self, gpu: Arc<dyn GpuProbe>) -> Self {
        self.gpu = Some(gpu);
        self
    }

    /// Attach a remote connectivity check.
    #[must_use]
    pub fn with_connectivity(mut self, connectivity: Arc<dyn ConnectivityProbe>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    #[must_use]
    pub const fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Evaluate every signal once.
    ///
    /// Never fails; unavailable signals leave their fields degraded.
    pub async fn evaluate(
        &self,
        process_name: &str,
        log_file: &Path,
        remote: Option<&dyn RemoteLogFetcher>,
        now: DateTime<Local>,
    ) -> StatusSnapshot {
        let evaluated_at = now.fixed_offset();
        let budget = self.settings.probe_timeout;
        let max_lines = self.settings.tail_lines;

        let process_alive = probe("process", budget, self.process.is_running(process_name))
            .await
            .unwrap_or(false);

        let mut status = StatusValue::Unknown;
        let mut activity_source = ActivitySource::None;
        let mut log_staleness_seconds = None;
        let mut tail = Vec::new();

        match probe("log file", budget, self.files.stat(log_file)).await {
            Probe::Ready(Some(stat)) => {
                let age = (evaluated_at - stat.modified_at).max(TimeDelta::zero());
                log_staleness_seconds = Some(age.num_seconds());

                let lines = probe("log tail", budget, self.files.read_tail(log_file, max_lines))
                    .await
                    .unwrap_or(Vec::new());
                if lines.iter().any(|line| !line.trim().is_empty()) {
                    status = self.freshness_status(age, process_alive);
                    match self.scan_markers(&lines) {
                        Some(Marker::Activity) if status == StatusValue::Unknown => {
                            status = StatusValue::Active;
                        }
                        Some(Marker::Error) => status = StatusValue::Error,
                        _ => {}
                    }
                    activity_source = ActivitySource::Local;
                    tail = lines;
                } else {
                    tracing::warn!(path = %log_file.display(), "Log file has no content");
                }
            }
            Probe::Ready(None) => {
                if process_alive {
                    status = StatusValue::Starting;
                }
            }
            Probe::Unavailable { .. } => {}
        }

        if status == StatusValue::Unknown {
            if let Some(fetcher) = remote {
                let lines = probe(fetcher.source(), budget, fetcher.fetch_tail(max_lines))
                    .await
                    .unwrap_or(Vec::new());
                if lines.iter().any(|line| !line.trim().is_empty()) {
                    status = StatusValue::Active;
                    activity_source = ActivitySource::Remote;
                    tail = lines;
                }
            }
        }

        let kind = match activity_source {
            ActivitySource::Remote => SourceKind::Remote,
            ActivitySource::Local | ActivitySource::None => SourceKind::Local,
        };
        let last_activity = newest(tail, kind, evaluated_at);

        let next_scheduled_mining =
            next_mining_after(&now, self.settings.mining_interval_hours).map(|dt| dt.fixed_offset());

        let (next_scheduled_submission, gpu_probe, remote_connectivity) =
            tokio::join!(self.next_submission(), self.probe_gpu(), self.check_connectivity());

        tracing::debug!(
            status = %status,
            process_alive,
            staleness = ?log_staleness_seconds,
            "Evaluated orchestrator status"
        );

        StatusSnapshot {
            evaluated_at,
            status,
            activity_source,
            process_alive,
            log_staleness_seconds,
            last_activity,
            next_scheduled_mining,
            next_scheduled_submission,
            gpu_probe,
            remote_connectivity,
        }
    }

    fn freshness_status(&self, age: TimeDelta, process_alive: bool) -> StatusValue {
        let fresh = age.to_std().is_ok_and(|age| age < self.settings.freshness_threshold);
        match (fresh, process_alive) {
            (true, true) => StatusValue::Active,
            (true, false) => StatusValue::Idle,
            (false, true) => StatusValue::Stale,
            (false, false) => StatusValue::Stopped,
        }
    }

    /// First marker line, newest first.
    fn scan_markers(&self, lines: &[String]) -> Option<Marker> {
        let contains_any = |line: &str, markers: &[String]| markers.iter().any(|m| line.contains(m.as_str()));
        lines.iter().rev().find_map(|line| {
            if contains_any(line, &self.settings.activity_markers) {
                Some(Marker::Activity)
            } else if contains_any(line, &self.settings.error_markers) && !line.contains(INFO_MARKER) {
                Some(Marker::Error)
            } else {
                None
            }
        })
    }

    async fn next_submission(&self) -> Option<DateTime<chrono::FixedOffset>> {
        let raw = probe(
            "schedule store",
            self.settings.probe_timeout,
            self.schedule.last_submission_date(),
        )
        .await
        .ready()
        .flatten()?;

        let Some(last) = parse_submission_date(&raw) else {
            tracing::warn!(value = %raw, "Unparsable last submission date");
            return None;
        };
        next_submission_after(&last, self.settings.submission_hour)
    }

    async fn probe_gpu(&self) -> Option<GpuStatus> {
        let gpu = self.gpu.as_ref()?;
        Some(
            match probe("gpu", self.settings.probe_timeout, gpu.probe()).await {
                Probe::Ready(info) => GpuStatus::available(info),
                Probe::Unavailable { reason } => GpuStatus::Unavailable { reason },
            },
        )
    }

    async fn check_connectivity(&self) -> Option<RemoteConnectivity> {
        let connectivity = self.connectivity.as_ref()?;
        let checked = probe("connectivity", self.settings.probe_timeout, async {
            Ok(connectivity.check().await)
        })
        .await;
        Some(match checked {
            Probe::Ready(result) => result,
            Probe::Unavailable { reason } => RemoteConnectivity::Error { message: reason },
        })
    }
}
