//! Test utilities for orchwatch.
//!
//! Scripted signal sources, data factories, and assertion macros shared by
//! unit and integration tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use orchwatch::test_utils::*;
//!
//! let files = StubFiles::fresh(&["2025-08-11 09:00:00,000 - INFO - started"]);
//! let dir = TestDir::new();
//! dir.create_file("config.toml", &make_test_config_toml(dir.path()));
//! ```

use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, TimeDelta};

use crate::core::models::{
    ActivityRecord, ActivitySource, GpuInfo, ResultFile, ServiceStatus, Severity, StatusSnapshot, StatusValue,
};
use crate::core::signals::{FileProbe, FileStat, ProcessProbe, RemoteLogFetcher, ResultsScanner, ScheduleStore, ServiceProbe};
use crate::error::{Result, WatchError};

fn owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|line| (*line).to_string()).collect()
}

// =============================================================================
// Signal Stubs
// =============================================================================

/// Process probe with a fixed answer, or a failure when `None`.
#[derive(Debug, Clone, Copy)]
pub struct StubProcess(Option<bool>);

impl StubProcess {
    #[must_use]
    pub const fn alive(alive: bool) -> Self {
        Self(Some(alive))
    }

    #[must_use]
    pub const fn failing() -> Self {
        Self(None)
    }
}

#[async_trait]
impl ProcessProbe for StubProcess {
    async fn is_running(&self, _name: &str) -> Result<bool> {
        self.0
            .ok_or_else(|| WatchError::unavailable("process", "scripted failure"))
    }
}

/// One in-memory log file whose age is measured from the moment of `stat`.
#[derive(Debug, Clone)]
pub struct StubFiles {
    age_secs: Option<i64>,
    lines: Vec<String>,
}

impl StubFiles {
    /// A log written ten seconds ago.
    #[must_use]
    pub fn fresh(lines: &[&str]) -> Self {
        Self::aged(10, lines)
    }

    #[must_use]
    pub fn aged(age_secs: i64, lines: &[&str]) -> Self {
        Self {
            age_secs: Some(age_secs),
            lines: owned(lines),
        }
    }

    /// No log file at all.
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            age_secs: None,
            lines: Vec::new(),
        }
    }
}

#[async_trait]
impl FileProbe for StubFiles {
    async fn stat(&self, _path: &Path) -> Result<Option<FileStat>> {
        Ok(self.age_secs.map(|secs| FileStat {
            modified_at: Local::now().fixed_offset() - TimeDelta::seconds(secs),
        }))
    }

    async fn read_tail(&self, _path: &Path, max_lines: usize) -> Result<Vec<String>> {
        if self.age_secs.is_none() {
            return Err(WatchError::unavailable("log tail", "no such file"));
        }
        let start = self.lines.len().saturating_sub(max_lines);
        Ok(self.lines[start..].to_vec())
    }
}

/// Schedule store returning a fixed raw date.
#[derive(Debug, Clone, Default)]
pub struct StubSchedule(Option<String>);

impl StubSchedule {
    #[must_use]
    pub const fn empty() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn at(raw: &str) -> Self {
        Self(Some(raw.to_string()))
    }
}

#[async_trait]
impl ScheduleStore for StubSchedule {
    async fn last_submission_date(&self) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Container log stream with fixed lines, or an unreachable container.
#[derive(Debug, Clone)]
pub struct StubRemote {
    lines: Option<Vec<String>>,
}

impl StubRemote {
    #[must_use]
    pub fn lines(lines: &[&str]) -> Self {
        Self {
            lines: Some(owned(lines)),
        }
    }

    #[must_use]
    pub const fn failing() -> Self {
        Self { lines: None }
    }
}

#[async_trait]
impl RemoteLogFetcher for StubRemote {
    fn source(&self) -> &str {
        "stub-container"
    }

    async fn fetch_tail(&self, max_lines: usize) -> Result<Vec<String>> {
        let lines = self
            .lines
            .as_ref()
            .ok_or_else(|| WatchError::unavailable("container logs", "no such container"))?;
        let start = lines.len().saturating_sub(max_lines);
        Ok(lines[start..].to_vec())
    }
}

/// Inference service that is up with the given models, or down.
#[derive(Debug, Clone)]
pub struct StubService(Option<Vec<String>>);

impl StubService {
    #[must_use]
    pub fn running(models: &[&str]) -> Self {
        Self(Some(owned(models)))
    }

    #[must_use]
    pub const fn failing() -> Self {
        Self(None)
    }
}

#[async_trait]
impl ServiceProbe for StubService {
    async fn probe(&self) -> Result<ServiceStatus> {
        let models = self
            .0
            .clone()
            .ok_or_else(|| WatchError::Network("connection refused".to_string()))?;
        Ok(ServiceStatus::Running {
            model_count: models.len(),
            models,
        })
    }
}

/// Results directory with a fixed listing.
#[derive(Debug, Clone, Default)]
pub struct StubResults(Vec<ResultFile>);

impl StubResults {
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// `ok` parseable and `failed` unparseable files, all written just now.
    #[must_use]
    pub fn with_counts(ok: usize, failed: usize) -> Self {
        let now = Local::now().fixed_offset();
        let files = (0..ok + failed)
            .map(|i| ResultFile {
                name: format!("alpha_{i:03}.json"),
                modified_at: now,
                parsed_successfully: i < ok,
            })
            .collect();
        Self(files)
    }
}

#[async_trait]
impl ResultsScanner for StubResults {
    async fn list_result_files(&self) -> Result<Vec<ResultFile>> {
        Ok(self.0.clone())
    }
}

// =============================================================================
// Test Data Factories
// =============================================================================

/// Fixed evaluation instant used by factories.
///
/// # Panics
///
/// Panics if the literal timestamp fails to parse.
#[must_use]
pub fn test_instant() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2025-08-11T09:30:00+02:00").expect("valid timestamp")
}

#[must_use]
pub fn make_test_activity(message: &str, severity: Severity) -> ActivityRecord {
    ActivityRecord {
        timestamp: test_instant(),
        raw_timestamp: Some("2025-08-11 09:30:00,000".to_string()),
        message: message.to_string(),
        severity,
    }
}

/// A healthy snapshot with every optional field filled.
#[must_use]
pub fn make_test_snapshot(status: StatusValue) -> StatusSnapshot {
    let now = test_instant();
    StatusSnapshot {
        evaluated_at: now,
        status,
        activity_source: ActivitySource::Local,
        process_alive: true,
        log_staleness_seconds: Some(12),
        last_activity: Some(make_test_activity("Running alpha generator", Severity::Info)),
        next_scheduled_mining: Some(now + TimeDelta::minutes(150)),
        next_scheduled_submission: Some(now + TimeDelta::hours(28)),
        gpu_probe: Some(crate::core::models::GpuStatus::available(make_test_gpu_info())),
        remote_connectivity: None,
    }
}

/// A snapshot where every optional signal is missing.
#[must_use]
pub fn make_test_snapshot_minimal() -> StatusSnapshot {
    StatusSnapshot {
        evaluated_at: test_instant(),
        status: StatusValue::Unknown,
        activity_source: ActivitySource::None,
        process_alive: false,
        log_staleness_seconds: None,
        last_activity: None,
        next_scheduled_mining: None,
        next_scheduled_submission: None,
        gpu_probe: None,
        remote_connectivity: None,
    }
}

#[must_use]
pub fn make_test_gpu_info() -> GpuInfo {
    GpuInfo {
        name: "NVIDIA GeForce RTX 4090".to_string(),
        memory_used_mb: 6144,
        memory_total_mb: 24564,
        utilization_percent: 37,
        temperature_c: 61,
    }
}

/// Config TOML pointing every path into `root` with all host probes off.
#[must_use]
pub fn make_test_config_toml(root: &Path) -> String {
    let path = |name: &str| root.join(name).display().to_string().replace('\\', "/");
    format!(
        r#"[general]
probe_timeout_seconds = 2

[orchestrator]
process_name = "orchwatch-test-orchestrator-that-never-runs"
log_file = "{log}"
generator_log_file = "{generator}"
container = ""

[schedule]
submission_log = "{schedule}"

[credentials]
check_connectivity = false

[gpu]
enabled = false

[service]
enabled = false

[results]
dir = "{results}"
"#,
        log = path("alpha_orchestrator.log"),
        generator = path("alpha_generator_ollama.log"),
        schedule = path("submission_log.json"),
        results = path("results"),
    )
}

// =============================================================================
// Temp Directory Utilities
// =============================================================================

/// A temporary directory for tests with automatic cleanup.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file, and any missing parent directories.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.inner.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
        path
    }

    /// Create a file and backdate its modification time.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written or its time cannot be set.
    pub fn create_file_aged(&self, name: &str, content: &str, age: std::time::Duration) -> PathBuf {
        let path = self.create_file(name, content);
        let modified = std::time::SystemTime::now() - age;
        fs::File::options()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(modified))
            .expect("Failed to set modification time");
        path
    }

    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    pub fn create_dir(&self, name: &str) -> PathBuf {
        let path = self.inner.path().join(name);
        fs::create_dir_all(&path).expect("Failed to create test directory");
        path
    }

    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string does NOT contain a substring.
#[macro_export]
macro_rules! assert_not_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            !haystack.contains(needle),
            "Expected string NOT to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string is valid JSON.
#[macro_export]
macro_rules! assert_json_valid {
    ($json:expr) => {
        let json = $json;
        if let Err(e) = serde_json::from_str::<serde_json::Value>(json) {
            panic!("Expected valid JSON, but parsing failed: {}\n\nJSON string:\n{}", e, json);
        }
    };
}

// =============================================================================
// Test Helpers
// =============================================================================

#[must_use]
pub fn has_ansi_codes(text: &str) -> bool {
    text.contains('\x1b')
}

/// Strip ANSI escape codes from a string.
#[must_use]
pub fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\x1b' {
            result.push(c);
            continue;
        }
        if chars.peek() == Some(&'[') {
            chars.next();
            // CSI sequences end at the first letter
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_ansi_removes_color() {
        assert_eq!(strip_ansi_codes("\x1b[1;32mactive\x1b[0m"), "active");
        assert!(!has_ansi_codes("plain"));
    }

    #[tokio::test]
    async fn stub_files_tail_respects_limit() {
        let files = StubFiles::fresh(&["a", "b", "c"]);
        let tail = files.read_tail(Path::new("x"), 2).await.unwrap();
        assert_eq!(tail, vec!["b", "c"]);
        assert!(StubFiles::missing().stat(Path::new("x")).await.unwrap().is_none());
    }

    #[test]
    fn config_toml_parses() {
        let dir = TestDir::new();
        let text = make_test_config_toml(dir.path());
        let config: crate::storage::Config = toml::from_str(&text).unwrap();
        assert!(!config.gpu.enabled);
        assert!(config.container().is_none());
    }
}
