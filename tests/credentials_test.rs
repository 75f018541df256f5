//! Credential lifecycle against a mock identity endpoint.
//!
//! Covers:
//! - Load from file, validate, bind a session
//! - Rejection on non-200 responses
//! - Cookie header construction
//! - Clearing revokes the session and is idempotent
//! - Reloading, failed re-validation and dropping the manager revoke the session
//! - The secret never reaches the logs
//! - The connectivity probe built on the same manager

mod common;

use std::time::Duration;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use orchwatch::core::credentials::{CredentialManager, CredentialSettings, CredentialState};
use orchwatch::core::models::RemoteConnectivity;
use orchwatch::core::probes::CredentialConnectivityProbe;
use orchwatch::core::signals::{ConnectivityProbe, SecretPrompt};
use orchwatch::test_utils::TestDir;

use common::fixtures::{SECRET_COOKIE, whoami_body};
use common::logger::TestLogger;

const COOKIE_FILE: &str = "cookie.txt";

fn settings(server: &MockServer, dir: &TestDir) -> CredentialSettings {
    CredentialSettings {
        file_name: COOKIE_FILE.to_string(),
        base_path: dir.path().to_path_buf(),
        whoami_url: format!("{}/users/self", server.uri()),
        timeout: Duration::from_secs(2),
    }
}

async fn mount_whoami(server: &MockServer, status: u16) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(whoami_body())
    } else {
        ResponseTemplate::new(status).set_body_string("{\"detail\":\"Incorrect authentication credentials.\"}")
    };
    Mock::given(method("GET"))
        .and(path("/users/self"))
        .respond_with(template)
        .mount(server)
        .await;
}

struct Scripted(Option<String>);

impl SecretPrompt for Scripted {
    fn prompt(&mut self, _message: &str) -> Option<String> {
        self.0.take()
    }
}

#[tokio::test]
async fn valid_cookie_file_yields_session() {
    let log = TestLogger::new("valid_cookie_file_yields_session");
    log.phase("setup");

    let server = MockServer::start().await;
    mount_whoami(&server, 200).await;
    let dir = TestDir::new();
    dir.create_file(COOKIE_FILE, &format!("{SECRET_COOKIE}\n"));

    log.phase("authenticate");
    let mut manager = CredentialManager::new(settings(&server, &dir));
    assert!(manager.load_from_file(None));
    assert_eq!(manager.state(), CredentialState::Loaded);
    assert!(manager.validate().await);

    log.phase("verify");
    assert_eq!(manager.state(), CredentialState::Validated);
    assert!(manager.is_authenticated());
    let session = manager.session().expect("validated session");
    assert_eq!(session.api_base(), server.uri());
    assert!(session.is_live());

    log.finish_ok();
}

#[tokio::test]
async fn cookie_header_joins_pairs() {
    let log = TestLogger::new("cookie_header_joins_pairs");

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/self"))
        .and(header("Cookie", "abc=123; def=456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(whoami_body()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TestDir::new();
    // Surrounding whitespace and a pair without '=' are dropped.
    dir.create_file(COOKIE_FILE, "  abc=123;  junk ; def=456  \n");

    let mut manager = CredentialManager::new(settings(&server, &dir));
    assert!(manager.load_from_file(None));
    assert!(manager.validate().await, "header did not match mock");

    log.finish_ok();
}

#[tokio::test]
async fn unauthorized_response_rejects() {
    let log = TestLogger::new("unauthorized_response_rejects");

    let server = MockServer::start().await;
    mount_whoami(&server, 401).await;
    let dir = TestDir::new();
    dir.create_file(COOKIE_FILE, SECRET_COOKIE);

    let mut manager = CredentialManager::new(settings(&server, &dir));
    assert!(manager.load_from_file(None));
    assert!(!manager.validate().await);
    assert_eq!(manager.state(), CredentialState::Rejected);
    assert!(manager.session().is_none());

    // A second validate without reloading has nothing to check.
    assert!(!manager.validate().await);
    assert_eq!(manager.state(), CredentialState::Rejected);

    log.finish_ok();
}

#[tokio::test]
async fn unreachable_endpoint_rejects() {
    let log = TestLogger::new("unreachable_endpoint_rejects");

    let server = MockServer::start().await;
    let dir = TestDir::new();
    dir.create_file(COOKIE_FILE, SECRET_COOKIE);
    let mut settings = settings(&server, &dir);
    drop(server);
    settings.timeout = Duration::from_millis(500);

    let mut manager = CredentialManager::new(settings);
    assert!(manager.load_from_file(None));
    assert!(!manager.validate().await);
    assert_eq!(manager.state(), CredentialState::Rejected);

    log.finish_ok();
}

#[tokio::test]
async fn empty_file_is_not_loaded() {
    let server = MockServer::start().await;
    let dir = TestDir::new();
    let path = dir.create_file(COOKIE_FILE, "   \n");

    let mut manager = CredentialManager::new(settings(&server, &dir));
    assert!(!manager.load_from_file(Some(&path)));
    assert_eq!(manager.state(), CredentialState::Absent);
}

#[tokio::test]
async fn clear_revokes_session_and_is_idempotent() {
    let log = TestLogger::new("clear_revokes_session_and_is_idempotent");

    let server = MockServer::start().await;
    mount_whoami(&server, 200).await;
    let dir = TestDir::new();
    dir.create_file(COOKIE_FILE, SECRET_COOKIE);

    let mut manager = CredentialManager::new(settings(&server, &dir));
    assert!(manager.load_from_file(None));
    assert!(manager.validate().await);
    let session = manager.session().expect("session");
    assert!(session.get("/alphas").is_ok());

    manager.clear();
    assert_eq!(manager.state(), CredentialState::Cleared);
    assert!(!session.is_live());
    assert!(session.get("/alphas").is_err());
    assert!(manager.session().is_none());

    manager.clear();
    assert_eq!(manager.state(), CredentialState::Cleared);

    log.finish_ok();
}

#[tokio::test]
async fn reload_and_failed_revalidation_revoke_previous_session() {
    let (log, capture) = TestLogger::with_capture("reload_and_failed_revalidation_revoke_previous_session");

    log.phase("setup");
    let server = MockServer::start().await;
    // First request is accepted, every later one refused.
    Mock::given(method("GET"))
        .and(path("/users/self"))
        .respond_with(ResponseTemplate::new(200).set_body_json(whoami_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_whoami(&server, 401).await;
    let dir = TestDir::new();
    dir.create_file(COOKIE_FILE, SECRET_COOKIE);

    let mut manager = CredentialManager::new(settings(&server, &dir));
    assert!(manager.load_from_file(None));
    assert!(manager.validate().await);
    let session = manager.session().expect("validated session");
    assert!(session.is_live());

    log.phase("reload");
    assert!(manager.load_from_file(None));
    assert_eq!(manager.state(), CredentialState::Loaded);
    log.signal("session.live", session.is_live());
    assert!(!session.is_live());
    assert!(session.get("/alphas").is_err());
    capture.assert_logged("Previous session revoked");

    log.phase("revalidate");
    assert!(!manager.validate().await);
    assert_eq!(manager.state(), CredentialState::Rejected);
    assert!(manager.session().is_none());
    assert!(!session.is_live());
    capture.assert_logged_at_level(tracing::Level::WARN, "Credential rejected");

    log.finish_ok();
}

#[tokio::test]
async fn prompt_while_validated_revokes_session() {
    let server = MockServer::start().await;
    mount_whoami(&server, 200).await;
    let dir = TestDir::new();
    dir.create_file(COOKIE_FILE, SECRET_COOKIE);

    let prompt = Box::new(Scripted(Some("xyz=789".to_string())));
    let mut manager = CredentialManager::with_prompt(settings(&server, &dir), prompt);
    assert!(manager.load_from_file(None));
    assert!(manager.validate().await);
    let session = manager.session().expect("validated session");

    assert!(manager.prompt_interactively());
    assert_eq!(manager.state(), CredentialState::Loaded);
    assert!(!session.is_live());
}

#[tokio::test]
async fn dropping_manager_revokes_session() {
    let server = MockServer::start().await;
    mount_whoami(&server, 200).await;
    let dir = TestDir::new();
    dir.create_file(COOKIE_FILE, SECRET_COOKIE);

    let mut manager = CredentialManager::new(settings(&server, &dir));
    assert!(manager.load_from_file(None));
    assert!(manager.validate().await);
    let session = manager.session().expect("validated session");
    assert!(session.get("/alphas").is_ok());

    drop(manager);
    assert!(!session.is_live());
    assert!(session.get("/alphas").is_err());
}

#[tokio::test]
async fn authenticate_falls_back_to_prompt() {
    let log = TestLogger::new("authenticate_falls_back_to_prompt");

    let server = MockServer::start().await;
    mount_whoami(&server, 200).await;
    let dir = TestDir::new();
    let mut settings = settings(&server, &dir);
    settings.file_name = "orchwatch-prompt-test-absent-cookie.txt".to_string();

    let prompt = Box::new(Scripted(Some(SECRET_COOKIE.to_string())));
    let mut manager = CredentialManager::with_prompt(settings, prompt);
    assert!(manager.authenticate(true, true).await);
    assert!(manager.is_authenticated());

    log.finish_ok();
}

#[tokio::test]
async fn cancelled_prompt_fails_authentication() {
    let server = MockServer::start().await;
    let dir = TestDir::new();
    let mut settings = settings(&server, &dir);
    settings.file_name = "orchwatch-prompt-test-absent-cookie.txt".to_string();

    let mut manager = CredentialManager::with_prompt(settings, Box::new(Scripted(None)));
    assert!(!manager.authenticate(true, true).await);
    assert!(!manager.is_authenticated());
}

#[tokio::test]
async fn secret_never_logged() {
    let (log, capture) = TestLogger::with_capture("secret_never_logged");

    let server = MockServer::start().await;
    mount_whoami(&server, 200).await;
    let dir = TestDir::new();
    dir.create_file(COOKIE_FILE, SECRET_COOKIE);

    let mut manager = CredentialManager::new(settings(&server, &dir));
    assert!(manager.load_from_file(None));
    assert!(manager.validate().await);
    let debug = format!("{manager:?} {:?}", manager.session());
    manager.clear();

    capture.assert_logged("Credential validated");
    capture.assert_logged("Credentials cleared from memory");
    capture.assert_field_logged("cookie_len", &SECRET_COOKIE.len().to_string());
    capture.assert_no_errors();
    capture.assert_never_logged("abc=123");
    capture.assert_never_logged("def=456");
    assert!(!debug.contains("abc=123"));

    log.finish_ok();
}

#[tokio::test]
async fn connectivity_probe_reports_connected_and_auth_failed() {
    let log = TestLogger::new("connectivity_probe_reports_connected_and_auth_failed");

    let ok_server = MockServer::start().await;
    mount_whoami(&ok_server, 200).await;
    let dir = TestDir::new();
    dir.create_file(COOKIE_FILE, SECRET_COOKIE);

    let connected = CredentialConnectivityProbe::new(settings(&ok_server, &dir)).check().await;
    log.signal("connectivity", connected.label());
    assert!(matches!(connected, RemoteConnectivity::Connected { .. }));

    let bad_server = MockServer::start().await;
    mount_whoami(&bad_server, 403).await;
    let refused = CredentialConnectivityProbe::new(settings(&bad_server, &dir)).check().await;
    log.signal("connectivity", refused.label());
    assert!(matches!(refused, RemoteConnectivity::AuthFailed { .. }));

    log.finish_ok();
}

#[tokio::test]
async fn connectivity_probe_without_file() {
    let server = MockServer::start().await;
    let dir = TestDir::new();
    let mut settings = settings(&server, &dir);
    settings.file_name = "orchwatch-connectivity-absent-cookie.txt".to_string();

    let result = CredentialConnectivityProbe::new(settings).check().await;
    assert_eq!(result.label(), "no_credentials");
    assert!(result.message().contains("not found"));
}
