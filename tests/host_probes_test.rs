//! Host probes against real files and a mock inference service.

mod common;

use std::time::Duration;

use chrono::Local;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use orchwatch::core::models::ServiceStatus;
use orchwatch::core::probes::{DirResultsScanner, HttpServiceProbe, JsonScheduleStore, LocalFileProbe};
use orchwatch::core::signals::{FileProbe, ResultsScanner, ScheduleStore, ServiceProbe};
use orchwatch::core::statistics;
use orchwatch::error::WatchError;
use orchwatch::test_utils::TestDir;

use common::fixtures::{service_tags, write_results};
use common::logger::TestLogger;

// =============================================================================
// Inference service
// =============================================================================

#[tokio::test]
async fn service_probe_lists_models() {
    let log = TestLogger::new("service_probe_lists_models");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(service_tags(&["llama3.2:3b", "qwen2.5:7b"])))
        .mount(&server)
        .await;

    let probe = HttpServiceProbe::new(format!("{}/api/tags", server.uri()), Duration::from_secs(2)).unwrap();
    let status = probe.probe().await.unwrap();
    log.signal("service", format!("{status:?}"));

    assert_eq!(
        status,
        ServiceStatus::Running {
            models: vec!["llama3.2:3b".to_string(), "qwen2.5:7b".to_string()],
            model_count: 2,
        }
    );
    log.finish_ok();
}

#[tokio::test]
async fn service_probe_with_no_models_is_still_running() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(service_tags(&[])))
        .mount(&server)
        .await;

    let probe = HttpServiceProbe::new(format!("{}/api/tags", server.uri()), Duration::from_secs(2)).unwrap();
    assert!(matches!(
        probe.probe().await.unwrap(),
        ServiceStatus::Running { model_count: 0, .. }
    ));
}

#[tokio::test]
async fn service_probe_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let probe = HttpServiceProbe::new(format!("{}/api/tags", server.uri()), Duration::from_secs(2)).unwrap();
    let err = probe.probe().await.unwrap_err();
    assert!(matches!(err, WatchError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn service_probe_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let probe = HttpServiceProbe::new(format!("{}/api/tags", server.uri()), Duration::from_secs(2)).unwrap();
    let err = probe.probe().await.unwrap_err();
    assert!(matches!(err, WatchError::MalformedInput { .. }), "got {err:?}");
}

#[tokio::test]
async fn service_probe_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let probe = HttpServiceProbe::new(format!("{}/api/tags", server.uri()), Duration::from_millis(300)).unwrap();
    let err = probe.probe().await.unwrap_err();
    assert!(
        matches!(err, WatchError::Timeout(_) | WatchError::Network(_)),
        "got {err:?}"
    );
}

// =============================================================================
// Local files
// =============================================================================

#[tokio::test]
async fn file_probe_stats_and_tails() {
    let dir = TestDir::new();
    let log_path = dir.create_file_aged("orchestrator.log", "one\ntwo\nthree\nfour\n", Duration::from_secs(120));

    let stat = LocalFileProbe.stat(&log_path).await.unwrap().expect("file exists");
    let age = Local::now().fixed_offset() - stat.modified_at;
    assert!((110..=180).contains(&age.num_seconds()), "age was {age}");

    let tail = LocalFileProbe.read_tail(&log_path, 2).await.unwrap();
    assert_eq!(tail, vec!["three".to_string(), "four".to_string()]);
}

#[tokio::test]
async fn file_probe_missing_and_directory() {
    let dir = TestDir::new();
    assert!(LocalFileProbe.stat(&dir.file_path("absent.log")).await.unwrap().is_none());

    let sub = dir.create_dir("logs");
    assert!(LocalFileProbe.stat(&sub).await.unwrap().is_none());
}

// =============================================================================
// Schedule store
// =============================================================================

#[tokio::test]
async fn schedule_store_reads_last_submission() {
    let dir = TestDir::new();
    let store_path = dir.create_file(
        "submission_log.json",
        r#"{"last_submission_date": "2025-08-10T14:03:11.123456"}"#,
    );

    let store = JsonScheduleStore::new(store_path);
    assert_eq!(
        store.last_submission_date().await.unwrap().as_deref(),
        Some("2025-08-10T14:03:11.123456")
    );
}

#[tokio::test]
async fn schedule_store_missing_blank_and_corrupt() {
    let dir = TestDir::new();

    let missing = JsonScheduleStore::new(dir.file_path("none.json"));
    assert!(missing.last_submission_date().await.unwrap().is_none());

    let blank = JsonScheduleStore::new(dir.create_file("blank.json", r#"{"last_submission_date": ""}"#));
    assert!(blank.last_submission_date().await.unwrap().is_none());

    let corrupt = JsonScheduleStore::new(dir.create_file("corrupt.json", "{not json"));
    assert!(matches!(
        corrupt.last_submission_date().await,
        Err(WatchError::MalformedInput { .. })
    ));
}

// =============================================================================
// Results directory
// =============================================================================

#[tokio::test]
async fn results_scanner_classifies_files() {
    let log = TestLogger::new("results_scanner_classifies_files");

    let dir = TestDir::new();
    write_results(&dir, 3, 1);
    dir.create_file("results/broken.json", "{\"alpha\": ");
    dir.create_file("results/notes.txt", "not a result");

    let scanner = DirResultsScanner::new(dir.file_path("results"));
    let files = scanner.list_result_files().await.unwrap();
    assert_eq!(files.len(), 5);

    let stats = statistics::collect(&scanner, Local::now().fixed_offset()).await;
    log.signal("statistics", format!("{stats:?}"));
    assert_eq!(stats.total_generated, 5);
    assert_eq!(stats.successful, 3);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.last_24h_generated, 5);
    assert_eq!(stats.last_24h_successful, 3);

    log.finish_ok();
}

#[tokio::test]
async fn results_scanner_missing_dir_is_empty() {
    let dir = TestDir::new();
    let scanner = DirResultsScanner::new(dir.file_path("results"));
    assert!(scanner.list_result_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn old_results_fall_outside_recent_window() {
    let dir = TestDir::new();
    dir.create_file_aged(
        "results/alpha_old.json",
        r#"{"alpha": "rank(volume)"}"#,
        Duration::from_secs(3 * 24 * 3600),
    );
    dir.create_file("results/alpha_new.json", r#"{"alpha": "rank(close)"}"#);

    let scanner = DirResultsScanner::new(dir.file_path("results"));
    let stats = statistics::collect(&scanner, Local::now().fixed_offset()).await;
    assert_eq!(stats.total_generated, 2);
    assert_eq!(stats.last_24h_generated, 1);
    assert_eq!(stats.last_24h_successful, 1);
}
