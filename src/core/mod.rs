//! Core data models, signal sources and status inference.

pub mod actions;
pub mod aggregator;
pub mod cli_runner;
pub mod credentials;
pub mod dashboard;
pub mod http;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod probes;
pub mod schedule;
pub mod signals;
pub mod statistics;

pub use actions::{ActionSettings, run_action};
pub use aggregator::{AggregatorSettings, StatusAggregator};
pub use credentials::{
    AuthenticatedSession, CredentialManager, CredentialSettings, CredentialState, CredentialToken,
    SharedCredentialManager, TerminalPrompt,
};
pub use dashboard::{Dashboard, SignalSources};
pub use models::{
    ActionKind, ActionOutcome, ActivityRecord, ActivitySource, AuthSummary, GpuInfo, GpuStatus, RemoteConnectivity,
    ResultFile, ResultStatistics, ServiceStatus, Severity, StatusSnapshot, StatusValue, SystemReport,
};
pub use normalizer::{SourceKind, normalize};
pub use signals::{
    ConnectivityProbe, FileProbe, FileStat, GpuProbe, Probe, ProcessProbe, RemoteLogFetcher, ResultsScanner,
    ScheduleStore, SecretPrompt, ServiceProbe,
};
