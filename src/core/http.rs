//! HTTP client utilities.
//!
//! Shared client construction for the credential check and the inference
//! service probe.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder};

use crate::error::{Result, WatchError};

/// Default timeout for credential validation requests.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for service health requests.
pub const SERVICE_TIMEOUT: Duration = Duration::from_secs(5);

fn base_builder(timeout: Duration) -> ClientBuilder {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(format!("orchwatch/{}", env!("CARGO_PKG_VERSION")))
}

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    base_builder(timeout)
        .build()
        .map_err(|e| WatchError::Network(e.to_string()))
}

/// Build a client that attaches `headers` to every request it sends.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client_with_headers(timeout: Duration, headers: HeaderMap) -> Result<Client> {
    base_builder(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| WatchError::Network(e.to_string()))
}

/// Map a transport error to the crate error.
pub(crate) fn map_transport_error(e: &reqwest::Error, timeout: Duration) -> WatchError {
    if e.is_timeout() {
        WatchError::Timeout(timeout.as_secs())
    } else {
        WatchError::Network(e.to_string())
    }
}

/// Fetch JSON from a URL.
///
/// # Errors
///
/// Returns error on network failure, non-success status or JSON parse failure.
pub async fn fetch_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<T> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| map_transport_error(&e, timeout))?;

    if !response.status().is_success() {
        return Err(WatchError::Network(format!(
            "HTTP {} from {}",
            response.status(),
            url
        )));
    }

    response
        .json()
        .await
        .map_err(|e| WatchError::malformed("response", e))
}
