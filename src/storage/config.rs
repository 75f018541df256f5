//! Configuration file loading and management.
//!
//! Loads configuration from:
//! - Linux: `~/.config/orchwatch/config.toml`
//! - macOS: `~/Library/Application Support/orchwatch/config.toml`
//! - Windows: `%APPDATA%/orchwatch/config/config.toml`
//!
//! ## Precedence
//!
//! Output settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `ORCHWATCH_CONFIG`: Override config file path
//! - `ORCHWATCH_FORMAT`: Output format (human, json, md)
//! - `ORCHWATCH_NO_COLOR` or `NO_COLOR`: Disable colors (1, true, yes)
//! - `ORCHWATCH_PRETTY`: Pretty-print JSON output (1, true, yes)
//! - `ORCHWATCH_VERBOSE`: Enable verbose output (1, true, yes)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use super::AppPaths;
use crate::cli::args::{Cli, OutputFormat};
use crate::core::actions::ActionSettings;
use crate::core::aggregator::{AggregatorSettings, DEFAULT_ACTIVITY_MARKERS, DEFAULT_ERROR_MARKERS};
use crate::core::credentials::{CREDENTIAL_FILE_NAME, CredentialSettings, DEFAULT_WHOAMI_URL};
use crate::core::http::SERVICE_TIMEOUT;
use crate::core::probes::{DEFAULT_CONTAINER, DEFAULT_SERVICE_URL};
use crate::error::{Result, WatchError};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "ORCHWATCH_CONFIG";
/// Environment variable for output format.
pub const ENV_FORMAT: &str = "ORCHWATCH_FORMAT";
/// Environment variable to disable colors.
pub const ENV_NO_COLOR: &str = "ORCHWATCH_NO_COLOR";
/// Standard environment variable to disable colors.
pub const ENV_NO_COLOR_STD: &str = "NO_COLOR";
/// Environment variable for pretty JSON output.
pub const ENV_PRETTY: &str = "ORCHWATCH_PRETTY";
/// Environment variable for verbose output.
pub const ENV_VERBOSE: &str = "ORCHWATCH_VERBOSE";

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Fully resolved configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The validated file configuration.
    pub config: Config,
    /// Output format.
    pub format: OutputFormat,
    /// Whether to disable colored output.
    pub no_color: bool,
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
    /// Whether verbose logging is enabled.
    pub verbose: bool,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub config_file: Option<PathBuf>,
    pub format: ConfigSource,
    pub no_color: ConfigSource,
    pub pretty: ConfigSource,
    pub verbose: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ResolvedConfig {
    /// Resolve final configuration from CLI args, environment variables, and config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but is invalid, or any
    /// resolved value is invalid.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        Self::resolve_with(cli, |key| std::env::var(key).ok())
    }

    /// Same as [`resolve`](Self::resolve) with an explicit environment lookup.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    pub fn resolve_with<F>(cli: &Cli, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = cli
            .config
            .clone()
            .or_else(|| env(ENV_CONFIG).map(PathBuf::from))
            .unwrap_or_else(Config::config_path);
        let config = Config::load_from(&path)?;
        config.validate()?;

        let mut sources = ConfigSources {
            config_file: path.exists().then_some(path),
            ..ConfigSources::default()
        };

        let format = Self::resolve_format(cli, &config, &env, &mut sources.format)?;
        let no_color = Self::resolve_no_color(cli, &config, &env, &mut sources.no_color);
        let pretty = Self::resolve_pretty(cli, &config, &env, &mut sources.pretty);
        let verbose = Self::resolve_verbose(cli, &env, &mut sources.verbose);

        Ok(Self {
            config,
            format,
            no_color,
            pretty,
            verbose,
            sources,
        })
    }

    fn resolve_format<F>(
        cli: &Cli,
        config: &Config,
        env: &F,
        source: &mut ConfigSource,
    ) -> Result<OutputFormat>
    where
        F: Fn(&str) -> Option<String>,
    {
        // 1. CLI --json flag, or an explicit non-default --format
        if cli.json || cli.format != OutputFormat::Human {
            *source = ConfigSource::Cli;
            return Ok(cli.effective_format());
        }

        // 2. Environment variable
        if let Some(format_env) = env(ENV_FORMAT) {
            *source = ConfigSource::Env;
            return Self::parse_format(&format_env);
        }

        // 3. Config file
        if let Some(ref format_str) = config.output.format {
            *source = ConfigSource::ConfigFile;
            return Self::parse_format(format_str);
        }

        // 4. Default (from clap)
        *source = ConfigSource::Default;
        Ok(OutputFormat::Human)
    }

    /// Parse a format string into `OutputFormat`.
    fn parse_format(s: &str) -> Result<OutputFormat> {
        match s.to_lowercase().as_str() {
            "human" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            "md" | "markdown" => Ok(OutputFormat::Md),
            _ => Err(WatchError::Config(format!(
                "Invalid format '{s}'. Valid formats: human, json, md"
            ))),
        }
    }

    fn resolve_no_color<F>(cli: &Cli, config: &Config, env: &F, source: &mut ConfigSource) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        if cli.no_color {
            *source = ConfigSource::Cli;
            return true;
        }

        // Any value of the standard NO_COLOR disables color
        if is_truthy(env(ENV_NO_COLOR).as_deref()) || env(ENV_NO_COLOR_STD).is_some() {
            *source = ConfigSource::Env;
            return true;
        }

        if !config.output.color {
            *source = ConfigSource::ConfigFile;
            return true;
        }

        *source = ConfigSource::Default;
        false
    }

    fn resolve_pretty<F>(cli: &Cli, config: &Config, env: &F, source: &mut ConfigSource) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        if cli.pretty {
            *source = ConfigSource::Cli;
            return true;
        }

        if is_truthy(env(ENV_PRETTY).as_deref()) {
            *source = ConfigSource::Env;
            return true;
        }

        if config.output.pretty {
            *source = ConfigSource::ConfigFile;
            return true;
        }

        *source = ConfigSource::Default;
        false
    }

    fn resolve_verbose<F>(cli: &Cli, env: &F, source: &mut ConfigSource) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        if cli.verbose {
            *source = ConfigSource::Cli;
            return true;
        }

        if is_truthy(env(ENV_VERBOSE).as_deref()) {
            *source = ConfigSource::Env;
            return true;
        }

        *source = ConfigSource::Default;
        false
    }
}

/// `1`, `true`, `yes` or `on`, case-insensitively.
fn is_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

// =============================================================================
// File Configuration
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub output: OutputConfig,
    pub orchestrator: OrchestratorConfig,
    pub schedule: ScheduleConfig,
    pub credentials: CredentialsConfig,
    pub gpu: GpuConfig,
    pub service: ServiceConfig,
    pub results: ResultsConfig,
    pub actions: ActionsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Budget for each signal probe in seconds.
    pub probe_timeout_seconds: u64,
    /// Default log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (human, json, md).
    pub format: Option<String>,
    /// Whether to use colors in output.
    pub color: bool,
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
}

/// What to watch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Substring of the orchestrator's command line.
    pub process_name: String,
    /// The orchestrator's log file.
    pub log_file: PathBuf,
    /// The alpha generator's own log, shown by `logs --generator`.
    pub generator_log_file: PathBuf,
    /// Container whose logs back up the local log; empty disables it.
    pub container: String,
    /// Lines read from the end of each log.
    pub tail_lines: usize,
    /// Log age in seconds under which the orchestrator counts as fresh.
    pub freshness_seconds: u64,
    pub activity_markers: Vec<String>,
    pub error_markers: Vec<String>,
    /// Records kept by the activity feed.
    pub activity_window: usize,
}

/// Periodic action schedule.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub mining_interval_hours: u32,
    pub submission_hour: u32,
    /// JSON file holding `last_submission_date`.
    pub submission_log: PathBuf,
}

/// API credential lookup and validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub file_name: String,
    /// First directory searched; the working directory when unset.
    pub base_path: Option<PathBuf>,
    pub whoami_url: String,
    pub timeout_seconds: u64,
    /// Whether status evaluations include a live connectivity check.
    pub check_connectivity: bool,
}

/// GPU probe.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GpuConfig {
    pub enabled: bool,
    pub timeout_seconds: u64,
}

/// Inference service probe.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub enabled: bool,
    pub url: String,
    pub timeout_seconds: u64,
}

/// Results directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    pub dir: PathBuf,
}

/// Manual action invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    pub program: String,
    pub script: String,
    pub credentials_path: PathBuf,
    pub working_dir: Option<PathBuf>,
    pub mining_timeout_seconds: u64,
    pub submission_timeout_seconds: u64,
    pub generation_timeout_seconds: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            probe_timeout_seconds: 10,
            log_level: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            pretty: false,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            process_name: "alpha_orchestrator.py".to_string(),
            log_file: PathBuf::from("alpha_orchestrator.log"),
            generator_log_file: PathBuf::from("alpha_generator_ollama.log"),
            container: DEFAULT_CONTAINER.to_string(),
            tail_lines: 50,
            freshness_seconds: 300,
            activity_markers: DEFAULT_ACTIVITY_MARKERS.iter().map(ToString::to_string).collect(),
            error_markers: DEFAULT_ERROR_MARKERS.iter().map(ToString::to_string).collect(),
            activity_window: 10,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            mining_interval_hours: 6,
            submission_hour: 14,
            submission_log: PathBuf::from("submission_log.json"),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            file_name: CREDENTIAL_FILE_NAME.to_string(),
            base_path: None,
            whoami_url: DEFAULT_WHOAMI_URL.to_string(),
            timeout_seconds: 10,
            check_connectivity: true,
        }
    }
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_seconds: 10,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: DEFAULT_SERVICE_URL.to_string(),
            timeout_seconds: SERVICE_TIMEOUT.as_secs(),
        }
    }
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
        }
    }
}

impl Default for ActionsConfig {
    fn default() -> Self {
        let defaults = ActionSettings::default();
        Self {
            program: defaults.program,
            script: defaults.script,
            credentials_path: defaults.credentials_path,
            working_dir: None,
            mining_timeout_seconds: defaults.mining_timeout.as_secs(),
            submission_timeout_seconds: defaults.submission_timeout.as_secs(),
            generation_timeout_seconds: defaults.generation_timeout.as_secs(),
        }
    }
}

fn invalid(key: &str, message: impl Into<String>) -> WatchError {
    WatchError::ConfigInvalid {
        key: key.to_string(),
        message: message.into(),
    }
}

fn check_url(key: &str, url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|e| invalid(key, e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(key, "must be an http or https URL"));
    }
    Ok(())
}

fn check_timeout(key: &str, seconds: u64, max: u64) -> Result<()> {
    if seconds == 0 || seconds > max {
        return Err(invalid(key, format!("must be between 1 and {max} seconds")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from the default config file path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error only if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error only if the file exists but is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| WatchError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        AppPaths::new().config_file()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ConfigInvalid`] naming the first bad key.
    pub fn validate(&self) -> Result<()> {
        if let Some(format) = &self.output.format {
            if !["human", "json", "md", "markdown"].contains(&format.to_lowercase().as_str()) {
                return Err(invalid(
                    "output.format",
                    format!("Invalid format \"{format}\". Valid formats: human, json, md"),
                ));
            }
        }

        check_timeout("general.probe_timeout_seconds", self.general.probe_timeout_seconds, 300)?;

        if self.orchestrator.process_name.trim().is_empty() {
            return Err(invalid("orchestrator.process_name", "must not be empty"));
        }
        if self.orchestrator.log_file.as_os_str().is_empty() {
            return Err(invalid("orchestrator.log_file", "must not be empty"));
        }
        if self.orchestrator.generator_log_file.as_os_str().is_empty() {
            return Err(invalid("orchestrator.generator_log_file", "must not be empty"));
        }
        if self.orchestrator.activity_window == 0 {
            return Err(invalid("orchestrator.activity_window", "must be at least 1"));
        }

        // Tail size, freshness and schedule bounds
        self.aggregator_settings().validate()?;

        if self.credentials.file_name.trim().is_empty() {
            return Err(invalid("credentials.file_name", "must not be empty"));
        }
        check_url("credentials.whoami_url", &self.credentials.whoami_url)?;
        check_timeout("credentials.timeout_seconds", self.credentials.timeout_seconds, 300)?;

        check_timeout("gpu.timeout_seconds", self.gpu.timeout_seconds, 300)?;

        check_url("service.url", &self.service.url)?;
        check_timeout("service.timeout_seconds", self.service.timeout_seconds, 300)?;

        if self.actions.program.trim().is_empty() {
            return Err(invalid("actions.program", "must not be empty"));
        }
        check_timeout("actions.mining_timeout_seconds", self.actions.mining_timeout_seconds, 86_400)?;
        check_timeout(
            "actions.submission_timeout_seconds",
            self.actions.submission_timeout_seconds,
            86_400,
        )?;
        check_timeout(
            "actions.generation_timeout_seconds",
            self.actions.generation_timeout_seconds,
            86_400,
        )?;

        Ok(())
    }

    /// Aggregator tunables.
    #[must_use]
    pub fn aggregator_settings(&self) -> AggregatorSettings {
        AggregatorSettings {
            tail_lines: self.orchestrator.tail_lines,
            freshness_threshold: Duration::from_secs(self.orchestrator.freshness_seconds),
            activity_markers: self.orchestrator.activity_markers.clone(),
            error_markers: self.orchestrator.error_markers.clone(),
            mining_interval_hours: self.schedule.mining_interval_hours,
            submission_hour: self.schedule.submission_hour,
            probe_timeout: Duration::from_secs(self.general.probe_timeout_seconds),
        }
    }

    /// Credential lookup and validation settings.
    #[must_use]
    pub fn credential_settings(&self) -> CredentialSettings {
        let defaults = CredentialSettings::default();
        CredentialSettings {
            file_name: self.credentials.file_name.clone(),
            base_path: self.credentials.base_path.clone().unwrap_or(defaults.base_path),
            whoami_url: self.credentials.whoami_url.clone(),
            timeout: Duration::from_secs(self.credentials.timeout_seconds),
        }
    }

    /// Action invocation settings.
    #[must_use]
    pub fn action_settings(&self) -> ActionSettings {
        ActionSettings {
            program: self.actions.program.clone(),
            script: self.actions.script.clone(),
            credentials_path: self.actions.credentials_path.clone(),
            working_dir: self.actions.working_dir.clone(),
            mining_timeout: Duration::from_secs(self.actions.mining_timeout_seconds),
            submission_timeout: Duration::from_secs(self.actions.submission_timeout_seconds),
            generation_timeout: Duration::from_secs(self.actions.generation_timeout_seconds),
        }
    }

    /// Container to fall back to, if any.
    #[must_use]
    pub fn container(&self) -> Option<&str> {
        let name = self.orchestrator.container.trim();
        (!name.is_empty()).then_some(name)
    }
}
