//! Host implementations of the signal traits.
//!
//! Process liveness comes from `pgrep` (`tasklist` on Windows), GPU metrics
//! from `nvidia-smi`, container logs from `docker logs`, and the inference
//! service from its HTTP model listing. Everything else is the local
//! filesystem.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local};
use reqwest::Client;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::cli_runner::{PROBE_TIMEOUT, run_command};
use super::credentials::{CredentialManager, CredentialSettings};
use super::http::{build_client, fetch_json};
use super::models::{GpuInfo, RemoteConnectivity, ResultFile, ServiceStatus};
use super::signals::{
    ConnectivityProbe, FileProbe, FileStat, GpuProbe, ProcessProbe, RemoteLogFetcher, ResultsScanner,
    ScheduleStore, ServiceProbe,
};
use super::statistics::has_content;
use crate::error::{Result, WatchError};

/// Default container hosting the model server.
pub const DEFAULT_CONTAINER: &str = "naive-ollma-gpu";

/// Default inference service model listing.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:11434/api/tags";

/// Bytes read per step when walking a log backwards.
const TAIL_CHUNK_BYTES: usize = 8 * 1024;

const GPU_QUERY: &str = "--query-gpu=name,memory.used,memory.total,utilization.gpu,temperature.gpu";
const GPU_FORMAT: &str = "--format=csv,noheader,nounits";

/// Fail early with a clear error when a helper binary is not on `PATH`.
fn require_tool(name: &str) -> Result<()> {
    which::which(name).map(|_| ()).map_err(|_| WatchError::ToolNotFound {
        name: name.to_string(),
    })
}

fn to_local_instant(time: SystemTime) -> DateTime<FixedOffset> {
    DateTime::<Local>::from(time).fixed_offset()
}

/// Last `max_lines` lines of `text`, oldest first.
pub(crate) fn tail_lines(text: &str, max_lines: usize) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].iter().map(|line| (*line).to_string()).collect()
}

// =============================================================================
// Process
// =============================================================================

/// Looks for a process whose command line contains the given name.
#[derive(Debug, Clone)]
pub struct SystemProcessProbe {
    timeout: Duration,
}

impl SystemProcessProbe {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemProcessProbe {
    fn default() -> Self {
        Self::new(PROBE_TIMEOUT)
    }
}

#[async_trait]
impl ProcessProbe for SystemProcessProbe {
    async fn is_running(&self, name: &str) -> Result<bool> {
        if cfg!(windows) {
            require_tool("tasklist")?;
            let output = run_command(
                "tasklist",
                &["/FI", "IMAGENAME eq python.exe", "/V"],
                self.timeout,
            )
            .await?;
            let stem = name.trim_end_matches(".py");
            return Ok(output.stdout.contains(stem));
        }

        require_tool("pgrep")?;
        let output = run_command("pgrep", &["-f", name], self.timeout).await?;
        // pgrep: 0 = matched, 1 = no match, anything else = failure
        match output.exit_code {
            0 | 1 => Ok(!output.stdout.trim().is_empty()),
            code => Err(WatchError::unavailable(
                "process",
                format!("pgrep exited with {code}: {}", output.stderr.trim()),
            )),
        }
    }
}

// =============================================================================
// Files
// =============================================================================

/// Reads local files through `tokio::fs`. Never writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileProbe;

#[async_trait]
impl FileProbe for LocalFileProbe {
    async fn stat(&self, path: &Path) -> Result<Option<FileStat>> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Ok(None);
        }
        Ok(Some(FileStat {
            modified_at: to_local_instant(metadata.modified()?),
        }))
    }

    /// Reads backwards from the end in fixed chunks until enough lines are
    /// buffered, so cost tracks `max_lines` rather than the file size.
    async fn read_tail(&self, path: &Path, max_lines: usize) -> Result<Vec<String>> {
        if max_lines == 0 {
            return Ok(Vec::new());
        }
        let mut file = tokio::fs::File::open(path).await?;
        let mut pos = file.metadata().await?.len();
        let mut buf: Vec<u8> = Vec::new();
        let mut newlines = 0;

        // One newline more than wanted guarantees the first kept line is whole.
        while pos > 0 && newlines <= max_lines {
            let step = usize::try_from(pos).map_or(TAIL_CHUNK_BYTES, |p| p.min(TAIL_CHUNK_BYTES));
            pos -= step as u64;
            file.seek(SeekFrom::Start(pos)).await?;
            let mut chunk = vec![0; step];
            file.read_exact(&mut chunk).await?;
            newlines += chunk.iter().filter(|&&b| b == b'\n').count();
            chunk.extend_from_slice(&buf);
            buf = chunk;
        }

        Ok(tail_lines(&String::from_utf8_lossy(&buf), max_lines))
    }
}

// =============================================================================
// Container logs
// =============================================================================

/// Tails a container's log stream via `docker logs`.
#[derive(Debug, Clone)]
pub struct DockerLogFetcher {
    container: String,
    timeout: Duration,
}

impl DockerLogFetcher {
    #[must_use]
    pub fn new(container: impl Into<String>, timeout: Duration) -> Self {
        Self {
            container: container.into(),
            timeout,
        }
    }
}

#[async_trait]
impl RemoteLogFetcher for DockerLogFetcher {
    fn source(&self) -> &str {
        &self.container
    }

    async fn fetch_tail(&self, max_lines: usize) -> Result<Vec<String>> {
        require_tool("docker")?;
        let tail = max_lines.to_string();
        let output = run_command(
            "docker",
            &["logs", "--tail", &tail, &self.container],
            self.timeout,
        )
        .await?;
        if !output.success() {
            return Err(WatchError::unavailable(
                "container logs",
                output.stderr.trim().to_string(),
            ));
        }
        Ok(tail_lines(&output.stdout, max_lines))
    }
}

// =============================================================================
// GPU
// =============================================================================

/// Reads the first GPU's metrics from `nvidia-smi`.
#[derive(Debug, Clone)]
pub struct NvidiaSmiProbe {
    timeout: Duration,
}

impl NvidiaSmiProbe {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for NvidiaSmiProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl GpuProbe for NvidiaSmiProbe {
    async fn probe(&self) -> Result<GpuInfo> {
        require_tool("nvidia-smi")?;
        let output = run_command("nvidia-smi", &[GPU_QUERY, GPU_FORMAT], self.timeout).await?;
        if !output.success() {
            return Err(WatchError::unavailable("gpu", output.stderr.trim().to_string()));
        }
        let first = output
            .stdout_lines()
            .into_iter()
            .next()
            .ok_or_else(|| WatchError::unavailable("gpu", "no GPU reported"))?;
        parse_gpu_line(&first)
    }
}

/// Parse one `name, used, total, util, temp` CSV row.
///
/// # Errors
///
/// Returns [`WatchError::MalformedInput`] for short rows or non-numeric fields
/// (e.g. `[N/A]`).
pub fn parse_gpu_line(line: &str) -> Result<GpuInfo> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 5 {
        return Err(WatchError::malformed(
            "gpu metrics",
            format!("expected 5 fields, got {}", parts.len()),
        ));
    }

    let number = |idx: usize, field: &str| -> Result<u64> {
        parts[idx]
            .parse::<u64>()
            .map_err(|_| WatchError::malformed("gpu metrics", format!("{field} is {:?}", parts[idx])))
    };
    let small = |idx: usize, field: &str| -> Result<u32> {
        number(idx, field).and_then(|n| {
            u32::try_from(n).map_err(|_| WatchError::malformed("gpu metrics", format!("{field} out of range")))
        })
    };

    Ok(GpuInfo {
        name: parts[0].to_string(),
        memory_used_mb: number(1, "memory.used")?,
        memory_total_mb: number(2, "memory.total")?,
        utilization_percent: small(3, "utilization.gpu")?,
        temperature_c: small(4, "temperature.gpu")?,
    })
}

// =============================================================================
// Inference service
// =============================================================================

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    #[serde(default)]
    name: String,
}

/// Lists the models served by the local inference service.
#[derive(Debug, Clone)]
pub struct HttpServiceProbe {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpServiceProbe {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
            timeout,
        })
    }
}

#[async_trait]
impl ServiceProbe for HttpServiceProbe {
    async fn probe(&self) -> Result<ServiceStatus> {
        let tags: TagsResponse = fetch_json(&self.client, &self.url, self.timeout).await?;
        let models: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        Ok(ServiceStatus::Running {
            model_count: models.len(),
            models,
        })
    }
}

// =============================================================================
// Schedule store
// =============================================================================

#[derive(Debug, Deserialize)]
struct SubmissionLog {
    #[serde(default)]
    last_submission_date: Option<String>,
}

/// `{"last_submission_date": "<ISO-8601>"}` on disk.
#[derive(Debug, Clone)]
pub struct JsonScheduleStore {
    path: PathBuf,
}

impl JsonScheduleStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ScheduleStore for JsonScheduleStore {
    async fn last_submission_date(&self) -> Result<Option<String>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let log: SubmissionLog = serde_json::from_str(&content)
            .map_err(|e| WatchError::malformed("submission log", e))?;
        Ok(log.last_submission_date.filter(|date| !date.trim().is_empty()))
    }
}

// =============================================================================
// Results directory
// =============================================================================

/// Lists `*.json` files in the results directory.
#[derive(Debug, Clone)]
pub struct DirResultsScanner {
    dir: PathBuf,
}

impl DirResultsScanner {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ResultsScanner for DirResultsScanner {
    async fn list_result_files(&self) -> Result<Vec<ResultFile>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let modified_at = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(time) => to_local_instant(time),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable result");
                    continue;
                }
            };
            let parsed_successfully = match tokio::fs::read(&path).await {
                Ok(bytes) => serde_json::from_slice::<serde_json::Value>(&bytes)
                    .is_ok_and(|value| has_content(&value)),
                Err(_) => false,
            };
            files.push(ResultFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                modified_at,
                parsed_successfully,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}

// =============================================================================
// Remote connectivity
// =============================================================================

/// Runs a throwaway load-and-validate cycle against the identity endpoint.
///
/// Never prompts. The credential is cleared before returning.
#[derive(Debug, Clone)]
pub struct CredentialConnectivityProbe {
    settings: CredentialSettings,
}

impl CredentialConnectivityProbe {
    #[must_use]
    pub const fn new(settings: CredentialSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ConnectivityProbe for CredentialConnectivityProbe {
    async fn check(&self) -> RemoteConnectivity {
        let mut manager = CredentialManager::new(self.settings.clone());

        let Some(path) = manager.find_credential_file() else {
            return RemoteConnectivity::NoCredentials {
                message: format!("{} not found", self.settings.file_name),
            };
        };

        let result = if !manager.load_from_file(Some(&path)) {
            RemoteConnectivity::Error {
                message: "Failed to load cookie".to_string(),
            }
        } else if manager.validate().await {
            RemoteConnectivity::Connected {
                message: "Authentication successful".to_string(),
            }
        } else {
            RemoteConnectivity::AuthFailed {
                message: "Cookie validation failed".to_string(),
            }
        };

        manager.clear();
        result
    }
}
