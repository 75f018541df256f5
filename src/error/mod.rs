//! Error types for orchwatch.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into six main categories:
//! - **Signal**: a sub-probe (process, file, container, GPU, service) could not be reached
//! - **Input**: a log line, credential file or result file could not be parsed
//! - **Authentication**: remote credential validation failed
//! - **Configuration**: config file parsing, validation, or missing values
//! - **Network**: connection or timeout issues reaching a remote endpoint
//! - **Internal**: unexpected errors, bugs, or unclassified issues
//!
//! Only configuration errors are fatal at startup. Everything else is caught
//! by the aggregator or the credential manager and turned into a degraded
//! snapshot field or a `false` return.
//!
//! Each error has a stable error code (e.g., `OW-S001`) for programmatic handling.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A signal source was unavailable (degrades one snapshot field).
    Signal,
    /// Malformed input (degrades to the "unknown" fallback).
    Input,
    /// Remote authentication check failed.
    Authentication,
    /// Invalid or unreadable configuration.
    Configuration,
    /// Network issues (timeout, connection refused).
    Network,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Signal => "Signal unavailable",
            Self::Input => "Malformed input",
            Self::Authentication => "Authentication error",
            Self::Configuration => "Configuration error",
            Self::Network => "Network error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Signal => "S",
            Self::Input => "M",
            Self::Authentication => "A",
            Self::Configuration => "C",
            Self::Network => "N",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Required external tool not found
    BinaryNotFound = 2,
    /// Configuration or parse errors
    ConfigError = 3,
    /// Timeout
    Timeout = 4,
    /// Credentials missing or rejected
    AuthFailed = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

/// Main error type for orchwatch operations.
#[derive(Error, Debug)]
pub enum WatchError {
    // ==========================================================================
    // Signal errors (Category: Signal)
    // ==========================================================================
    /// A sub-probe could not produce a value.
    #[error("signal '{signal}' unavailable: {reason}")]
    SignalUnavailable { signal: String, reason: String },

    /// A sub-probe did not answer within its time budget.
    #[error("signal '{signal}' timed out after {seconds}s")]
    SignalTimeout { signal: String, seconds: u64 },

    /// Required external tool is not on PATH.
    #[error("tool not found: {name}")]
    ToolNotFound { name: String },

    // ==========================================================================
    // Input errors (Category: Input)
    // ==========================================================================
    /// A line, credential string or result file could not be parsed.
    #[error("malformed {what}: {reason}")]
    MalformedInput { what: String, reason: String },

    // ==========================================================================
    // Authentication errors (Category: Authentication)
    // ==========================================================================
    /// No credential file was found and no secret was provided.
    #[error("no credentials available")]
    CredentialsMissing,

    /// Remote validation returned a non-success status.
    #[error("authentication failed: HTTP {status}")]
    AuthenticationFailed { status: u16 },

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// Error parsing configuration file.
    #[error("config parse error at {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid { key: String, message: String },

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    // ==========================================================================
    // Network errors (Category: Network)
    // ==========================================================================
    /// Request timeout.
    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    /// Generic network error.
    #[error("network error: {0}")]
    Network(String),

    // ==========================================================================
    // I/O errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WatchError {
    /// Shorthand for a [`WatchError::SignalUnavailable`].
    pub fn unavailable(signal: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::SignalUnavailable {
            signal: signal.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a [`WatchError::MalformedInput`].
    pub fn malformed(what: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::MalformedInput {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    /// Map error to CLI exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::ToolNotFound { .. } => ExitCode::BinaryNotFound,

            Self::Config(_)
            | Self::ConfigParse { .. }
            | Self::ConfigInvalid { .. }
            | Self::MalformedInput { .. } => ExitCode::ConfigError,

            Self::Timeout(_) | Self::SignalTimeout { .. } => ExitCode::Timeout,

            Self::CredentialsMissing | Self::AuthenticationFailed { .. } => ExitCode::AuthFailed,

            Self::SignalUnavailable { .. }
            | Self::Network(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::SignalUnavailable { .. }
            | Self::SignalTimeout { .. }
            | Self::ToolNotFound { .. } => ErrorCategory::Signal,

            Self::MalformedInput { .. } => ErrorCategory::Input,

            Self::CredentialsMissing | Self::AuthenticationFailed { .. } => {
                ErrorCategory::Authentication
            }

            Self::Config(_) | Self::ConfigParse { .. } | Self::ConfigInvalid { .. } => {
                ErrorCategory::Configuration
            }

            Self::Timeout(_) | Self::Network(_) => ErrorCategory::Network,

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `OW-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::SignalUnavailable { .. } => "OW-S001",
            Self::SignalTimeout { .. } => "OW-S002",
            Self::ToolNotFound { .. } => "OW-S003",

            Self::MalformedInput { .. } => "OW-M001",

            Self::CredentialsMissing => "OW-A001",
            Self::AuthenticationFailed { .. } => "OW-A002",

            Self::ConfigParse { .. } => "OW-C001",
            Self::ConfigInvalid { .. } => "OW-C002",
            Self::Config(_) => "OW-C003",

            Self::Timeout(_) => "OW-N001",
            Self::Network(_) => "OW-N099",

            Self::Io(_) => "OW-X001",
            Self::Json(_) => "OW-X002",
            Self::Other(_) => "OW-X099",
        }
    }

    /// Whether this error is fatal to startup.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.category(), ErrorCategory::Configuration)
    }

    /// A one-line hint for the operator, when there is an obvious next step.
    #[must_use]
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::ToolNotFound { name } => Some(format!("Install `{name}` or add it to PATH")),
            Self::CredentialsMissing => Some(
                "Place your cookie string in cookie.txt or run `orchwatch auth`".to_string(),
            ),
            Self::AuthenticationFailed { .. } => {
                Some("Refresh the cookie from your browser session and retry".to_string())
            }
            Self::ConfigParse { path, .. } => Some(format!("Fix the TOML syntax in {path}")),
            Self::ConfigInvalid { key, .. } => Some(format!("Check the value of `{key}`")),
            _ => None,
        }
    }
}

/// Result type alias for orchwatch operations.
pub type Result<T> = std::result::Result<T, WatchError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_category_description() {
        assert_eq!(ErrorCategory::Signal.description(), "Signal unavailable");
        assert_eq!(ErrorCategory::Configuration.to_string(), "Configuration error");
    }

    #[test]
    fn error_codes_use_category_prefix() {
        let cases = [
            WatchError::unavailable("gpu", "nvidia-smi missing"),
            WatchError::malformed("cookie", "no pairs"),
            WatchError::CredentialsMissing,
            WatchError::Config("bad".to_string()),
            WatchError::Timeout(5),
            WatchError::Io(std::io::Error::other("boom")),
        ];
        for err in cases {
            let prefix = format!("OW-{}", err.category().code_prefix());
            assert!(
                err.error_code().starts_with(&prefix),
                "{} should start with {}",
                err.error_code(),
                prefix
            );
        }
    }

    #[test]
    fn only_configuration_errors_are_fatal() {
        assert!(WatchError::Config("x".to_string()).is_fatal());
        assert!(
            WatchError::ConfigInvalid {
                key: "k".to_string(),
                message: "m".to_string()
            }
            .is_fatal()
        );
        assert!(!WatchError::unavailable("process", "pgrep failed").is_fatal());
        assert!(!WatchError::AuthenticationFailed { status: 401 }.is_fatal());
        assert!(!WatchError::malformed("log line", "bad").is_fatal());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(
            WatchError::ToolNotFound {
                name: "docker".to_string()
            }
            .exit_code(),
            ExitCode::BinaryNotFound
        );
        assert_eq!(
            WatchError::AuthenticationFailed { status: 403 }.exit_code(),
            ExitCode::AuthFailed
        );
        assert_eq!(WatchError::Timeout(10).exit_code(), ExitCode::Timeout);
        assert_eq!(i32::from(ExitCode::ConfigError), 3);
    }

    #[test]
    fn display_messages() {
        let err = WatchError::SignalTimeout {
            signal: "gpu".to_string(),
            seconds: 10,
        };
        assert_eq!(err.to_string(), "signal 'gpu' timed out after 10s");
        assert_eq!(
            WatchError::AuthenticationFailed { status: 401 }.to_string(),
            "authentication failed: HTTP 401"
        );
    }

    #[test]
    fn suggestions_for_auth_errors() {
        assert!(WatchError::CredentialsMissing.suggestion().is_some());
        assert!(WatchError::Network("reset".to_string()).suggestion().is_none());
    }
}
