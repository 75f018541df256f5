//! Credential session management.
//!
//! Owns the lifecycle of the API cookie string:
//!
//! ```text
//! Absent -> Loaded -> Validated | Rejected -> Cleared
//! ```
//!
//! A secret is loaded from a cookie file or typed in by the operator, and is
//! only usable once a live round-trip to the identity endpoint returns 200.
//! The validated state carries the [`AuthenticatedSession`], so a session can
//! never exist without a validated token.
//!
//! The secret is never logged; only its length is. It is zeroed in memory
//! when cleared, rejected, replaced or dropped.

use std::fmt;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use tokio::sync::Mutex;

use super::http::{AUTH_TIMEOUT, build_client_with_headers, map_transport_error};
use super::signals::SecretPrompt;
use crate::error::{Result, WatchError};

/// File name searched for when no explicit path is given.
pub const CREDENTIAL_FILE_NAME: &str = "cookie.txt";

/// Identity endpoint used to validate the cookie.
pub const DEFAULT_WHOAMI_URL: &str = "https://api.worldquantbrain.com/users/self";

const CLEARED_SENTINEL: &str = "***CLEARED***";

/// Longest response body excerpt logged on rejection.
const BODY_EXCERPT_CHARS: usize = 200;

// =============================================================================
// Token
// =============================================================================

/// A non-empty secret string.
///
/// `Debug` prints only the length.
pub struct CredentialToken {
    secret: String,
}

impl CredentialToken {
    /// Wrap a secret, trimming surrounding whitespace. `None` if empty.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let mut secret = secret.into();
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            zero(&mut secret);
            return None;
        }
        if trimmed.len() != secret.len() {
            let owned = trimmed.to_string();
            zero(&mut secret);
            secret = owned;
        }
        Some(Self { secret })
    }

    /// Length of the secret in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.secret.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secret.is_empty()
    }

    fn expose(&self) -> &str {
        &self.secret
    }

    /// Overwrite the secret and leave the sentinel in its place.
    fn clear(&mut self) {
        zero(&mut self.secret);
        self.secret = CLEARED_SENTINEL.to_string();
    }

    fn is_cleared(&self) -> bool {
        self.secret == CLEARED_SENTINEL
    }
}

impl Drop for CredentialToken {
    fn drop(&mut self) {
        if !self.is_cleared() {
            zero(&mut self.secret);
        }
    }
}

impl fmt::Debug for CredentialToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialToken")
            .field("len", &self.secret.len())
            .finish()
    }
}

/// Zero a string's buffer in place, then empty it.
fn zero(secret: &mut String) {
    let mut bytes = std::mem::take(secret).into_bytes();
    bytes.fill(0);
    std::hint::black_box(&bytes);
}

/// Split `k1=v1; k2=v2` into pairs.
///
/// Splits each part on the first `=` only, so values may contain `=`. Parts
/// without `=` or with an empty key are skipped. The pairs are copies of the
/// secret and should be zeroed once the header is built.
#[must_use]
pub fn parse_cookie_pairs(secret: &str) -> Vec<(String, String)> {
    secret
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.trim().split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Zero every key and value in place.
fn zero_pairs(pairs: &mut [(String, String)]) {
    for (key, value) in pairs {
        zero(key);
        zero(value);
    }
}

fn cookie_header(pairs: &[(String, String)]) -> String {
    let capacity = pairs.iter().map(|(k, v)| k.len() + v.len() + 3).sum();
    let mut header = String::with_capacity(capacity);
    for (i, (key, value)) in pairs.iter().enumerate() {
        if i > 0 {
            header.push_str("; ");
        }
        header.push_str(key);
        header.push('=');
        header.push_str(value);
    }
    header
}

/// Build the sensitive `Cookie` header for `token`.
///
/// The intermediate pair and header strings are zeroed before returning.
/// The header value itself is owned by the HTTP client and is released, not
/// zeroed, when the session is dropped.
fn cookie_headers(token: &CredentialToken) -> Result<HeaderMap> {
    let mut pairs = parse_cookie_pairs(token.expose());
    if pairs.is_empty() {
        return Err(WatchError::malformed("credential", "no key=value pairs"));
    }
    let mut header = cookie_header(&pairs);
    zero_pairs(&mut pairs);
    let value = HeaderValue::from_str(&header);
    zero(&mut header);

    let mut value =
        value.map_err(|_| WatchError::malformed("credential", "characters not allowed in a header"))?;
    value.set_sensitive(true);
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, value);
    Ok(headers)
}

// =============================================================================
// Session
// =============================================================================

/// HTTP session carrying a validated identity context.
///
/// Requests are scoped to the API origin the credential was validated
/// against. The handle stops working once the owning manager clears or
/// replaces the credential.
pub struct AuthenticatedSession {
    client: Client,
    api_base: String,
    validated_at: DateTime<Utc>,
    live: Arc<AtomicBool>,
}

impl AuthenticatedSession {
    /// Origin the session is scoped to, e.g. `https://api.example.com`.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// When the credential behind this session was validated.
    #[must_use]
    pub const fn validated_at(&self) -> DateTime<Utc> {
        self.validated_at
    }

    /// Whether the owning manager still holds the validated credential.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Start a GET request for `path` under the API origin.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::CredentialsMissing`] if the session was revoked.
    pub fn get(&self, path: &str) -> Result<RequestBuilder> {
        if !self.is_live() {
            return Err(WatchError::CredentialsMissing);
        }
        let url = format!("{}/{}", self.api_base, path.trim_start_matches('/'));
        Ok(self.client.get(url))
    }
}

impl fmt::Debug for AuthenticatedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedSession")
            .field("api_base", &self.api_base)
            .field("validated_at", &self.validated_at)
            .field("live", &self.is_live())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Manager
// =============================================================================

/// Public view of the manager's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    Absent,
    Loaded,
    Validated,
    Rejected,
    Cleared,
}

impl fmt::Display for CredentialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Absent => "absent",
            Self::Loaded => "loaded",
            Self::Validated => "validated",
            Self::Rejected => "rejected",
            Self::Cleared => "cleared",
        };
        f.write_str(label)
    }
}

enum Slot {
    Absent,
    Loaded(CredentialToken),
    Validated {
        token: CredentialToken,
        session: Arc<AuthenticatedSession>,
    },
    Rejected,
    Cleared,
}

/// Where to look for the credential and how to check it.
#[derive(Debug, Clone)]
pub struct CredentialSettings {
    /// File name searched for in the candidate directories.
    pub file_name: String,
    /// First directory searched; its parent is searched second.
    pub base_path: PathBuf,
    /// Identity endpoint; a 200 response validates the credential.
    pub whoami_url: String,
    /// Validation request timeout.
    pub timeout: Duration,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            file_name: CREDENTIAL_FILE_NAME.to_string(),
            base_path: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            whoami_url: DEFAULT_WHOAMI_URL.to_string(),
            timeout: AUTH_TIMEOUT,
        }
    }
}

/// Manager shared across tasks; state transitions are serialized by the lock.
pub type SharedCredentialManager = Arc<Mutex<CredentialManager>>;

/// Owns one credential and its authenticated session.
///
/// State transitions take `&mut self`; wrap the manager in a
/// [`SharedCredentialManager`] to use it from several tasks.
pub struct CredentialManager {
    settings: CredentialSettings,
    slot: Slot,
    prompt: Box<dyn SecretPrompt>,
}

impl CredentialManager {
    /// Create a manager that prompts on the terminal.
    #[must_use]
    pub fn new(settings: CredentialSettings) -> Self {
        Self::with_prompt(settings, Box::new(TerminalPrompt))
    }

    /// Create a manager with a custom secret source.
    #[must_use]
    pub fn with_prompt(settings: CredentialSettings, prompt: Box<dyn SecretPrompt>) -> Self {
        Self {
            settings,
            slot: Slot::Absent,
            prompt,
        }
    }

    /// Wrap into a lock for shared use.
    #[must_use]
    pub fn shared(self) -> SharedCredentialManager {
        Arc::new(Mutex::new(self))
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> CredentialState {
        match self.slot {
            Slot::Absent => CredentialState::Absent,
            Slot::Loaded(_) => CredentialState::Loaded,
            Slot::Validated { .. } => CredentialState::Validated,
            Slot::Rejected => CredentialState::Rejected,
            Slot::Cleared => CredentialState::Cleared,
        }
    }

    /// Whether a validated session is held.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.slot, Slot::Validated { .. })
    }

    /// The bound session, only while validated.
    #[must_use]
    pub fn session(&self) -> Option<Arc<AuthenticatedSession>> {
        match &self.slot {
            Slot::Validated { session, .. } => Some(Arc::clone(session)),
            _ => None,
        }
    }

    /// Candidate directories, in search order.
    fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.settings.base_path.clone()];
        if let Some(parent) = self.settings.base_path.parent() {
            dirs.push(parent.to_path_buf());
        }
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            dirs.push(home);
        }
        if let Ok(cwd) = std::env::current_dir() {
            dirs.push(cwd);
        }
        dirs
    }

    /// First existing credential file among the candidate directories.
    #[must_use]
    pub fn find_credential_file(&self) -> Option<PathBuf> {
        let found = self
            .search_dirs()
            .into_iter()
            .map(|dir| dir.join(&self.settings.file_name))
            .find(|candidate| candidate.is_file());
        match &found {
            Some(path) => tracing::info!(path = %path.display(), "Found credential file"),
            None => tracing::warn!(
                file_name = %self.settings.file_name,
                "No credential file found in standard locations"
            ),
        }
        found
    }

    /// Load the secret from `explicit`, or from the first file found.
    ///
    /// Returns `false` when no file exists, it cannot be read, or it is empty.
    pub fn load_from_file(&mut self, explicit: Option<&Path>) -> bool {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match self.find_credential_file() {
                Some(path) => path,
                None => return false,
            },
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read credential file");
                return false;
            }
        };

        let Some(token) = CredentialToken::new(content) else {
            tracing::warn!(path = %path.display(), "Credential file is empty");
            return false;
        };

        tracing::info!(path = %path.display(), cookie_len = token.len(), "Credential loaded");
        self.replace_token(token);
        true
    }

    /// Ask the operator for the secret.
    ///
    /// Returns `false` on empty input or cancellation.
    pub fn prompt_interactively(&mut self) -> bool {
        let Some(input) = self.prompt.prompt("Cookie string: ") else {
            tracing::warn!("Credential entry cancelled");
            return false;
        };
        let Some(token) = CredentialToken::new(input) else {
            tracing::warn!("Credential not provided");
            return false;
        };
        tracing::info!(cookie_len = token.len(), "Credential entered");
        self.replace_token(token);
        true
    }

    /// Hold `token` as the loaded secret.
    ///
    /// Whatever was held before is zeroed, and a validated session is revoked
    /// so existing handles stop working.
    fn replace_token(&mut self, token: CredentialToken) {
        match std::mem::replace(&mut self.slot, Slot::Loaded(token)) {
            Slot::Loaded(mut old) => old.clear(),
            Slot::Validated { token: mut old, session } => {
                old.clear();
                session.live.store(false, Ordering::Release);
                tracing::info!("Previous session revoked");
            }
            Slot::Absent | Slot::Rejected | Slot::Cleared => {}
        }
    }

    /// Confirm the loaded secret against the identity endpoint.
    ///
    /// Requires the `Loaded` state. A 200 response moves to `Validated` and
    /// binds a session; anything else (other status, transport error,
    /// malformed secret) moves to `Rejected`. Never retries.
    pub async fn validate(&mut self) -> bool {
        let token = match std::mem::replace(&mut self.slot, Slot::Absent) {
            Slot::Loaded(token) => token,
            other => {
                self.slot = other;
                tracing::warn!(state = %self.state(), "No loaded credential to validate");
                return false;
            }
        };

        match self.check_remote(&token).await {
            Ok(session) => {
                tracing::info!(api_base = %session.api_base, "Credential validated");
                self.slot = Slot::Validated {
                    token,
                    session: Arc::new(session),
                };
                true
            }
            Err(e) => {
                tracing::warn!(code = e.error_code(), error = %e, "Credential rejected");
                drop(token);
                self.slot = Slot::Rejected;
                false
            }
        }
    }

    async fn check_remote(&self, token: &CredentialToken) -> Result<AuthenticatedSession> {
        let headers = cookie_headers(token)?;

        let api_base = Url::parse(&self.settings.whoami_url)
            .map_err(|e| WatchError::ConfigInvalid {
                key: "credentials.whoami_url".to_string(),
                message: e.to_string(),
            })?
            .origin()
            .ascii_serialization();

        let timeout = self.settings.timeout;
        let client = build_client_with_headers(timeout, headers)?;

        tracing::info!(cookie_len = token.len(), "Validating credential");
        let response = client
            .get(&self.settings.whoami_url)
            .send()
            .await
            .map_err(|e| map_transport_error(&e, timeout))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
            tracing::warn!(status = status.as_u16(), body = %excerpt, "Identity endpoint refused credential");
            return Err(WatchError::AuthenticationFailed {
                status: status.as_u16(),
            });
        }

        Ok(AuthenticatedSession {
            client,
            api_base,
            validated_at: Utc::now(),
            live: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Load-then-validate, falling back to the prompt.
    ///
    /// Returns `true` only if some path reaches `Validated`.
    pub async fn authenticate(&mut self, auto_load: bool, auto_prompt: bool) -> bool {
        if auto_load && self.load_from_file(None) {
            if self.validate().await {
                return true;
            }
            tracing::warn!("Credential from file failed validation");
        }

        if auto_prompt && self.prompt_interactively() {
            if self.validate().await {
                return true;
            }
            tracing::warn!("Entered credential failed validation");
        }

        tracing::error!("Authentication failed");
        false
    }

    /// Overwrite the secret, revoke the session and move to `Cleared`.
    ///
    /// No-op when nothing is held.
    pub fn clear(&mut self) {
        match std::mem::replace(&mut self.slot, Slot::Absent) {
            Slot::Absent => {}
            Slot::Cleared => self.slot = Slot::Cleared,
            Slot::Loaded(mut token) => {
                token.clear();
                self.slot = Slot::Cleared;
                tracing::info!("Credentials cleared from memory");
            }
            Slot::Validated { mut token, session } => {
                token.clear();
                session.live.store(false, Ordering::Release);
                self.slot = Slot::Cleared;
                tracing::info!("Credentials cleared from memory");
            }
            Slot::Rejected => {
                self.slot = Slot::Cleared;
                tracing::info!("Credentials cleared from memory");
            }
        }
    }
}

impl Drop for CredentialManager {
    fn drop(&mut self) {
        if let Slot::Validated { session, .. } = &self.slot {
            session.live.store(false, Ordering::Release);
        }
    }
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Terminal prompt
// =============================================================================

/// Reads the secret from stdin after printing a banner to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl SecretPrompt for TerminalPrompt {
    fn prompt(&mut self, message: &str) -> Option<String> {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "\n{}", "=".repeat(60));
        let _ = writeln!(stderr, "API AUTHENTICATION REQUIRED");
        let _ = writeln!(stderr, "{}", "=".repeat(60));
        let _ = writeln!(stderr, "Paste your session cookie string (browser developer tools).");
        let _ = write!(stderr, "{message}");
        let _ = stderr.flush();
        drop(stderr);

        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    }
}
