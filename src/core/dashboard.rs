//! Front-end operations over one configured orchestrator.
//!
//! A [`Dashboard`] is built explicitly from configuration (or from injected
//! signal sources in tests) and owns the aggregator for its lifetime. Every
//! operation degrades instead of failing: an unreachable probe shows up as a
//! missing or `Unavailable` field, never as an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local};

use super::actions::{ActionSettings, run_action};
use super::aggregator::StatusAggregator;
use super::credentials::CredentialSettings;
use super::models::{ActionKind, ActionOutcome, ActivityRecord, ResultStatistics, ServiceStatus, StatusSnapshot, SystemReport};
use super::normalizer::{SourceKind, normalize};
use super::probes::{
    CredentialConnectivityProbe, DirResultsScanner, DockerLogFetcher, HttpServiceProbe, JsonScheduleStore,
    LocalFileProbe, NvidiaSmiProbe, SystemProcessProbe,
};
use super::signals::{
    ConnectivityProbe, FileProbe, GpuProbe, Probe, ProcessProbe, RemoteLogFetcher, ResultsScanner, ScheduleStore,
    ServiceProbe, probe,
};
use super::statistics;
use crate::error::Result;
use crate::storage::Config;

/// Case-insensitive substrings marking a container line as generator output.
pub const GENERATOR_KEYWORDS: &[&str] = &[
    "alpha",
    "generator",
    "generating",
    "ollama",
    "model",
    "prompt",
    "response",
    "idea",
    "factor",
    "worldquant",
    "submission",
];

/// Whether a container log line belongs to the alpha generator.
#[must_use]
pub fn is_generator_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    GENERATOR_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Every signal source a dashboard reads from.
///
/// Optional sources are simply skipped when absent.
#[derive(Clone)]
pub struct SignalSources {
    pub process: Arc<dyn ProcessProbe>,
    pub files: Arc<dyn FileProbe>,
    pub schedule: Arc<dyn ScheduleStore>,
    pub results: Arc<dyn ResultsScanner>,
    pub remote: Option<Arc<dyn RemoteLogFetcher>>,
    pub gpu: Option<Arc<dyn GpuProbe>>,
    pub service: Option<Arc<dyn ServiceProbe>>,
    pub connectivity: Option<Arc<dyn ConnectivityProbe>>,
}

impl std::fmt::Debug for SignalSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalSources")
            .field("remote", &self.remote.as_ref().map(|r| r.source().to_string()))
            .field("gpu", &self.gpu.is_some())
            .field("service", &self.service.is_some())
            .field("connectivity", &self.connectivity.is_some())
            .finish_non_exhaustive()
    }
}

impl SignalSources {
    /// Host probes as described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the service HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let probe_timeout = Duration::from_secs(config.general.probe_timeout_seconds);

        let remote = config
            .container()
            .map(|name| Arc::new(DockerLogFetcher::new(name, probe_timeout)) as Arc<dyn RemoteLogFetcher>);

        let gpu = config.gpu.enabled.then(|| {
            Arc::new(NvidiaSmiProbe::new(Duration::from_secs(config.gpu.timeout_seconds))) as Arc<dyn GpuProbe>
        });

        let service = if config.service.enabled {
            let probe = HttpServiceProbe::new(
                config.service.url.clone(),
                Duration::from_secs(config.service.timeout_seconds),
            )?;
            Some(Arc::new(probe) as Arc<dyn ServiceProbe>)
        } else {
            None
        };

        let connectivity = config.credentials.check_connectivity.then(|| {
            let settings: CredentialSettings = config.credential_settings();
            Arc::new(CredentialConnectivityProbe::new(settings)) as Arc<dyn ConnectivityProbe>
        });

        Ok(Self {
            process: Arc::new(SystemProcessProbe::new(probe_timeout)),
            files: Arc::new(LocalFileProbe),
            schedule: Arc::new(JsonScheduleStore::new(config.schedule.submission_log.clone())),
            results: Arc::new(DirResultsScanner::new(config.results.dir.clone())),
            remote,
            gpu,
            service,
            connectivity,
        })
    }
}

/// Facade exposing status, activity, logs, actions and reports.
#[derive(Debug, Clone)]
pub struct Dashboard {
    aggregator: StatusAggregator,
    sources: SignalSources,
    process_name: String,
    log_file: PathBuf,
    generator_log_file: PathBuf,
    activity_window: usize,
    actions: ActionSettings,
}

impl Dashboard {
    /// Build a dashboard backed by the host's real probes.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `config` is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Self::with_sources(config, SignalSources::from_config(config)?)
    }

    /// Build a dashboard over explicitly supplied signal sources.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the aggregator settings are invalid.
    pub fn with_sources(config: &Config, sources: SignalSources) -> Result<Self> {
        let mut aggregator = StatusAggregator::new(
            config.aggregator_settings(),
            Arc::clone(&sources.process),
            Arc::clone(&sources.files),
            Arc::clone(&sources.schedule),
        )?;
        if let Some(gpu) = &sources.gpu {
            aggregator = aggregator.with_gpu(Arc::clone(gpu));
        }
        if let Some(connectivity) = &sources.connectivity {
            aggregator = aggregator.with_connectivity(Arc::clone(connectivity));
        }

        Ok(Self {
            aggregator,
            sources,
            process_name: config.orchestrator.process_name.clone(),
            log_file: config.orchestrator.log_file.clone(),
            generator_log_file: config.orchestrator.generator_log_file.clone(),
            activity_window: config.orchestrator.activity_window,
            actions: config.action_settings(),
        })
    }

    #[must_use]
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Configured size of the activity feed.
    #[must_use]
    pub const fn activity_window(&self) -> usize {
        self.activity_window
    }

    /// Current consolidated status.
    pub async fn snapshot(&self) -> StatusSnapshot {
        self.snapshot_at(Local::now()).await
    }

    /// Status as of `now`.
    pub async fn snapshot_at(&self, now: DateTime<Local>) -> StatusSnapshot {
        self.aggregator
            .evaluate(&self.process_name, &self.log_file, self.sources.remote.as_deref(), now)
            .await
    }

    /// Newest `max` normalized records, oldest first.
    pub async fn recent_activity(&self, max: usize) -> Vec<ActivityRecord> {
        self.recent_activity_at(max, Local::now().fixed_offset()).await
    }

    async fn recent_activity_at(&self, max: usize, now: DateTime<FixedOffset>) -> Vec<ActivityRecord> {
        if max == 0 {
            return Vec::new();
        }
        let tail_lines = self.aggregator.settings().tail_lines;

        let (lines, kind) = if self.local_log_exists().await {
            (self.local_tail(tail_lines).await, SourceKind::Local)
        } else {
            (self.remote_tail(tail_lines).await, SourceKind::Remote)
        };

        let mut records: Vec<ActivityRecord> = normalize(lines, kind, now).collect();
        let start = records.len().saturating_sub(max);
        records.drain(..start);
        records
    }

    /// Newest `max_lines` raw log lines, trimmed, blanks dropped.
    ///
    /// The local log wins; the container stream is read only when the local
    /// log yields nothing.
    pub async fn logs(&self, max_lines: usize) -> Vec<String> {
        if max_lines == 0 {
            return Vec::new();
        }
        let local = clean_lines(self.local_tail(max_lines).await);
        if !local.is_empty() {
            return local;
        }
        clean_lines(self.remote_tail(max_lines).await)
    }

    /// Newest `max_lines` lines written by the alpha generator.
    ///
    /// Reads the generator's own log when it exists. Otherwise twice as many
    /// container lines are fetched and only those mentioning the generator
    /// are kept. With no container stream, falls back to the orchestrator
    /// log.
    pub async fn generator_logs(&self, max_lines: usize) -> Vec<String> {
        if max_lines == 0 {
            return Vec::new();
        }
        let budget = self.aggregator.settings().probe_timeout;

        if self.file_exists(&self.generator_log_file).await {
            let lines = probe(
                "generator log",
                budget,
                self.sources.files.read_tail(&self.generator_log_file, max_lines),
            )
            .await
            .unwrap_or(Vec::new());
            return clean_lines(lines);
        }

        if let Some(remote) = &self.sources.remote {
            let fetched = probe(remote.source(), budget, remote.fetch_tail(max_lines.saturating_mul(2))).await;
            if let Probe::Ready(lines) = fetched {
                let mut matching: Vec<String> = clean_lines(lines)
                    .into_iter()
                    .filter(|line| is_generator_line(line))
                    .collect();
                let start = matching.len().saturating_sub(max_lines);
                matching.drain(..start);
                return matching;
            }
        }

        tracing::debug!("No generator log or container stream; using orchestrator log");
        clean_lines(self.local_tail(max_lines).await)
    }

    /// Run one orchestrator action to completion.
    pub async fn trigger_action(&self, kind: ActionKind) -> ActionOutcome {
        run_action(&self.actions, kind).await
    }

    /// Result directory counts.
    pub async fn statistics(&self) -> ResultStatistics {
        statistics::collect(self.sources.results.as_ref(), Local::now().fixed_offset()).await
    }

    /// Inference service status, if a service probe is configured.
    pub async fn service_status(&self) -> Option<ServiceStatus> {
        let service = self.sources.service.as_ref()?;
        let budget = self.aggregator.settings().probe_timeout;
        Some(match probe("service", budget, service.probe()).await {
            Probe::Ready(status) => status,
            Probe::Unavailable { reason } => ServiceStatus::NotResponding { reason },
        })
    }

    /// Everything at once. Each part is probed independently.
    pub async fn system_report(&self) -> SystemReport {
        let now = Local::now();
        let (snapshot, service, recent_activity, statistics) = tokio::join!(
            self.snapshot_at(now),
            self.service_status(),
            self.recent_activity_at(self.activity_window, now.fixed_offset()),
            statistics::collect(self.sources.results.as_ref(), now.fixed_offset()),
        );
        SystemReport {
            snapshot,
            service,
            recent_activity,
            statistics,
        }
    }

    async fn local_log_exists(&self) -> bool {
        self.file_exists(&self.log_file).await
    }

    async fn file_exists(&self, path: &Path) -> bool {
        let budget = self.aggregator.settings().probe_timeout;
        matches!(
            probe("log file", budget, self.sources.files.stat(path)).await,
            Probe::Ready(Some(_))
        )
    }

    async fn local_tail(&self, max_lines: usize) -> Vec<String> {
        let budget = self.aggregator.settings().probe_timeout;
        if !self.local_log_exists().await {
            return Vec::new();
        }
        probe("log tail", budget, self.sources.files.read_tail(&self.log_file, max_lines))
            .await
            .unwrap_or(Vec::new())
    }

    async fn remote_tail(&self, max_lines: usize) -> Vec<String> {
        let Some(remote) = &self.sources.remote else {
            return Vec::new();
        };
        let budget = self.aggregator.settings().probe_timeout;
        probe(remote.source(), budget, remote.fetch_tail(max_lines))
            .await
            .unwrap_or(Vec::new())
    }
}

fn clean_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
