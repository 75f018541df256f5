//! Test data factories for integration tests.
//!
//! Lines are produced in the exact shapes the orchestrator writes, so tests
//! exercise the real normalizer instead of hand-built records.
#![allow(dead_code)]

use chrono::{DateTime, Duration, Local};
use orchwatch::test_utils::{TestDir, make_test_config_toml};
use serde_json::{Value, json};
use std::path::PathBuf;

/// Name of the orchestrator log inside the config produced by
/// [`make_test_config_toml`].
pub const LOG_FILE: &str = "alpha_orchestrator.log";

/// Name of the alpha generator log inside the same config.
pub const GENERATOR_LOG_FILE: &str = "alpha_generator_ollama.log";

/// Name of the submission log inside the same config.
pub const SCHEDULE_FILE: &str = "submission_log.json";

/// Cookie used by credential tests. Must never appear in captured logs.
pub const SECRET_COOKIE: &str = "abc=123; def=456";

/// `2025-08-11 09:15:02,481 - INFO - message`
#[must_use]
pub fn local_line(at: DateTime<Local>, level: &str, message: &str) -> String {
    format!("{} - {level} - {message}", at.format("%Y-%m-%d %H:%M:%S,%3f"))
}

/// `time=2025-08-11T07:15:02.481Z level=INFO msg="message"`
#[must_use]
pub fn remote_line(at: DateTime<Local>, level: &str, message: &str) -> String {
    format!(
        "time={} level={level} msg=\"{message}\"",
        at.with_timezone(&chrono::Utc).format("%Y-%m-%dT%H:%M:%S%.3fZ")
    )
}

/// A short healthy run: startup, an alpha generation marker, a completion.
#[must_use]
pub fn healthy_log(now: DateTime<Local>) -> String {
    [
        local_line(now - Duration::minutes(3), "INFO", "Orchestrator started"),
        local_line(now - Duration::minutes(2), "INFO", "Running alpha generator"),
        local_line(now - Duration::minutes(1), "INFO", "Generated 4 candidate alphas"),
    ]
    .join("\n")
}

/// A run whose newest marker line is an error.
#[must_use]
pub fn failing_log(now: DateTime<Local>) -> String {
    [
        local_line(now - Duration::minutes(3), "INFO", "Running alpha generator"),
        local_line(now - Duration::minutes(2), "INFO", "Batch finished"),
        local_line(now - Duration::minutes(1), "ERROR", "Failed to submit alpha"),
    ]
    .join("\n")
}

/// Response body of the inference service's model listing.
#[must_use]
pub fn service_tags(models: &[&str]) -> Value {
    json!({
        "models": models.iter().map(|name| json!({ "name": name, "size": 4_109_865_159_u64 })).collect::<Vec<_>>()
    })
}

/// Identity endpoint payload.
#[must_use]
pub fn whoami_body() -> Value {
    json!({ "id": "XX12345", "username": "orchestrator" })
}

/// Write the default test config into `dir` and return its path.
pub fn write_config(dir: &TestDir) -> PathBuf {
    dir.create_file("orchwatch.toml", &make_test_config_toml(dir.path()))
}

/// Write the default test config with `extra` TOML appended.
pub fn write_config_with(dir: &TestDir, extra: &str) -> PathBuf {
    let mut toml = make_test_config_toml(dir.path());
    toml.push('\n');
    toml.push_str(extra);
    dir.create_file("orchwatch.toml", &toml)
}

/// Result files: `ok` with content, `failed` empty objects.
pub fn write_results(dir: &TestDir, ok: usize, failed: usize) {
    dir.create_dir("results");
    for i in 0..ok {
        dir.create_file(
            &format!("results/alpha_{i:03}.json"),
            &json!({ "alpha": format!("rank(close, {i})"), "sharpe": 1.4 }).to_string(),
        );
    }
    for i in 0..failed {
        dir.create_file(&format!("results/failed_{i:03}.json"), "{}");
    }
}
