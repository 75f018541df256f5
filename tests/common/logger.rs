//! Structured logging for integration tests.
#![allow(dead_code)]
//!
//! Each test creates a `TestLogger`, marks its phases and finishes with
//! `finish_ok`. Output goes to stderr (shown with `--nocapture`) and is
//! appended to a log file so CI can keep it as an artifact.
//!
//! ```rust,ignore
//! let log = TestLogger::new("status_reports_error");
//! log.phase("setup");
//! let dir = TestDir::new();
//! log.phase("evaluate");
//! log.signal("process", "alive");
//! log.finish_ok();
//! ```
//!
//! # Environment Variables
//!
//! - `ORCHWATCH_TEST_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! - `ORCHWATCH_TEST_LOG_FILE` - output file (default: orchwatch-test.log)
//! - `ORCHWATCH_TEST_LOG_JSON` - "1" or "true" for one JSON object per line
//! - `NO_COLOR` - disable ANSI colors on stderr

use std::env;
use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::log_capture::TestLogCapture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse from string, case-insensitive.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" | "err" => Some(Self::Error),
            _ => None,
        }
    }

    const fn color_code(self) -> &'static str {
        match self {
            Self::Trace => "\x1b[90m",
            Self::Debug => "\x1b[36m",
            Self::Info => "\x1b[32m",
            Self::Warn => "\x1b[33m",
            Self::Error => "\x1b[31m",
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// One line in JSON mode.
#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub test: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

struct Settings {
    min_level: LogLevel,
    json: bool,
    color: bool,
    file: Mutex<Option<File>>,
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

fn settings() -> &'static Settings {
    SETTINGS.get_or_init(|| {
        let min_level = env::var("ORCHWATCH_TEST_LOG_LEVEL")
            .ok()
            .and_then(|s| LogLevel::parse(&s))
            .unwrap_or(LogLevel::Info);
        let json = env::var("ORCHWATCH_TEST_LOG_JSON")
            .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
        let color = env::var_os("NO_COLOR").is_none();
        let path = env::var("ORCHWATCH_TEST_LOG_FILE")
            .map_or_else(|_| PathBuf::from("orchwatch-test.log"), PathBuf::from);
        let file = OpenOptions::new().create(true).append(true).open(path).ok();

        Settings {
            min_level,
            json,
            color,
            file: Mutex::new(file),
        }
    })
}

fn write_to_file(content: &str) {
    if let Ok(mut guard) = settings().file.lock()
        && let Some(file) = guard.as_mut()
    {
        let _ = writeln!(file, "{content}");
    }
}

/// Per-test logger with phase and duration tracking.
pub struct TestLogger {
    test_name: String,
    start_time: Instant,
    current_phase: Mutex<String>,
}

impl TestLogger {
    #[must_use]
    pub fn new(test_name: &str) -> Self {
        let logger = Self {
            test_name: test_name.to_string(),
            start_time: Instant::now(),
            current_phase: Mutex::new("init".to_string()),
        };
        logger.log(LogLevel::Info, "Test starting", None, None);
        logger
    }

    /// Create a logger together with a tracing capture for assertions.
    pub fn with_capture(test_name: &str) -> (Self, TestLogCapture) {
        let capture = TestLogCapture::start();
        (Self::new(test_name), capture)
    }

    pub fn phase(&self, phase: &str) {
        if let Ok(mut current) = self.current_phase.lock() {
            *current = phase.to_string();
        }
        self.log(LogLevel::Debug, &format!("Phase: {phase}"), None, None);
    }

    /// Record the value a stubbed or real signal produced.
    pub fn signal(&self, name: &str, value: impl Display) {
        self.log(
            LogLevel::Debug,
            &format!("signal {name} = {value}"),
            Some(serde_json::json!({ "signal": name, "value": value.to_string() })),
            None,
        );
    }

    /// Record a CLI invocation and its exit code.
    pub fn command(&self, args: &[&str], exit_code: Option<i32>) {
        self.log(
            LogLevel::Debug,
            &format!("orchwatch {} -> {exit_code:?}", args.join(" ")),
            None,
            None,
        );
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn finish_ok(&self) {
        let duration_ms = self.start_time.elapsed().as_millis() as u64;
        self.log(
            LogLevel::Info,
            &format!("Test passed (duration: {duration_ms}ms)"),
            None,
            Some(duration_ms),
        );
    }

    fn log(
        &self,
        level: LogLevel,
        message: &str,
        context: Option<serde_json::Value>,
        duration_ms: Option<u64>,
    ) {
        let settings = settings();
        if level < settings.min_level {
            return;
        }

        let timestamp = Utc::now();
        let phase = self.current_phase.lock().ok().map(|p| p.clone());

        if settings.json {
            let entry = LogEntry {
                timestamp,
                level,
                test: self.test_name.clone(),
                message: message.to_string(),
                phase,
                duration_ms,
                context,
            };
            if let Ok(json) = serde_json::to_string(&entry) {
                eprintln!("{json}");
                write_to_file(&json);
            }
            return;
        }

        let ts = timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ");
        let plain = format!("[{ts}] [{level}] [{}] {message}", self.test_name);
        if settings.color {
            eprintln!(
                "[{ts}] [{}{level}\x1b[0m] [{}] {message}",
                level.color_code(),
                self.test_name
            );
        } else {
            eprintln!("{plain}");
        }
        write_to_file(&plain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parsing() {
        assert_eq!(LogLevel::parse("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse(" DEBUG "), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("err"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn logger_phases_and_signals() {
        let log = TestLogger::new("logger_phases_and_signals");
        log.phase("setup");
        log.signal("process", true);
        log.command(&["status", "--json"], Some(0));
        log.finish_ok();
    }

    #[test]
    fn log_entry_serialization() {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            test: "entry".to_string(),
            message: "hello".to_string(),
            phase: Some("evaluate".to_string()),
            duration_ms: Some(7),
            context: None,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"level\":\"INFO\""));
        assert!(json.contains("\"duration_ms\":7"));
        assert!(!json.contains("context"));
    }
}
