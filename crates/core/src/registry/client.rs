//! # Registry Client
//!
//! Single-shot HTTP client for the registry feed. The registry does not
//! send CORS headers, so the browser frontend historically fetched it
//! through a public relay; the server keeps the same indirection so both
//! deployments hit the registry the same way. The relay wraps the target
//! URL as a query parameter and returns the upstream body and status
//! unmodified.
//!
//! There is no retry, no timeout, and no partial success: either the
//! full feed parses or the call fails with one boundary error.

use crate::models::{LibraryDisplay, RegistryResponse};
use crate::registry::normalize;
use serde_json::Value;
use thiserror::Error;

/// Default registry feed (the Palace Project library registry)
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.palaceproject.io/libraries";

/// Default CORS relay; the encoded target URL is appended directly
pub const DEFAULT_RELAY_URL: &str = "https://corsproxy.io/?";

/// Boundary errors for one fetch of the registry feed
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Non-success HTTP status from the registry (or the relay)
    #[error("failed to fetch libraries: {status} {status_text}")]
    Transport { status: u16, status_text: String },
    /// Body decoded but did not match the registry feed shape
    #[error("invalid registry format: {0}")]
    Format(String),
    /// Connection-level failure before any status was received
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Where to fetch the feed and which relay to route it through
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Upstream registry feed URL
    pub registry_url: String,
    /// Relay prefix; the URL-encoded registry URL is appended to it
    pub relay_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            relay_url: DEFAULT_RELAY_URL.to_string(),
        }
    }
}

impl RegistryConfig {
    /// Build the config from the environment, falling back to defaults
    ///
    /// Honors `STACKS_REGISTRY_URL` and `STACKS_RELAY_URL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            registry_url: std::env::var("STACKS_REGISTRY_URL")
                .unwrap_or(defaults.registry_url),
            relay_url: std::env::var("STACKS_RELAY_URL").unwrap_or(defaults.relay_url),
        }
    }

    /// The URL actually requested: relay prefix + encoded registry URL
    pub fn relay_target(&self) -> String {
        format!("{}{}", self.relay_url, urlencoding::encode(&self.registry_url))
    }
}

/// Validate and decode one feed body
///
/// Separated from the HTTP call so the format invariant (a `catalogs`
/// field that is an array) is testable without a network.
pub fn parse_registry(body: &str) -> Result<RegistryResponse, RegistryError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| RegistryError::Format(format!("body is not valid JSON: {e}")))?;

    if !value.get("catalogs").map(Value::is_array).unwrap_or(false) {
        return Err(RegistryError::Format(
            "\"catalogs\" array missing".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| RegistryError::Format(e.to_string()))
}

/// The registry HTTP client
pub struct RegistryClient {
    http: reqwest::Client,
    config: RegistryConfig,
}

impl RegistryClient {
    /// Create a client for the given registry/relay pair
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .user_agent("stacks/0.1")
            .build()?;
        Ok(Self { http, config })
    }

    /// Fetch the raw registry feed
    ///
    /// Single shot: either the full collection is returned or the call
    /// fails outright with a `Transport`, `Format`, or `Http` error.
    pub async fn fetch(&self) -> Result<RegistryResponse, RegistryError> {
        let url = self.config.relay_target();
        tracing::debug!(%url, "fetching registry feed");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Transport {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body = response.text().await?;
        parse_registry(&body)
    }

    /// Fetch the feed and normalize every catalog into a display record
    ///
    /// Per-record normalization never fails, so one malformed catalog
    /// entry degrades to its field fallbacks instead of aborting the
    /// whole load.
    pub async fn fetch_libraries(&self) -> Result<Vec<LibraryDisplay>, RegistryError> {
        let feed = self.fetch().await?;
        let libraries: Vec<LibraryDisplay> =
            feed.catalogs.iter().map(normalize::normalize).collect();
        tracing::info!(count = libraries.len(), "registry feed normalized");
        Ok(libraries)
    }
}
