//! Route-rotating page fetcher
//!
//! Each call to `ResilientFetcher::fetch` walks a fresh shuffled copy of the
//! route pool and returns the first usable body:
//!
//! | Attempt outcome | Action |
//! |-----------------|--------|
//! | Network error / timeout | Log, try next route |
//! | Non-2xx status | Log, try next route |
//! | Empty body | Log, try next route |
//! | Body contains the relay error marker | Log, try next route |
//! | Anything else | Return the body |
//!
//! When the pool runs out, the fetch fails with `FetchError::Blocked`. Worst
//! case latency is therefore bounded by pool size times the per-route timeout.

use crate::config::FetchConfig;
use crate::fetch::{FetchError, ProxyRotator};
use crate::url::{Locator, Route};
use reqwest::Client;
use std::fmt;
use std::time::Duration;

/// Header some relays require before they will forward a request
const REQUESTED_WITH: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

/// Why a single route attempt was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteFailure {
    /// The route template could not produce a request URL
    InvalidRoute(String),

    /// The relay answered with a non-success status
    Status(u16),

    /// Request timed out
    Timeout,

    /// Connection, TLS, or body read failure
    Network(String),

    /// The relay returned an empty body
    EmptyBody,

    /// The body contains the relay error page marker
    ErrorMarker,
}

impl fmt::Display for RouteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRoute(e) => write!(f, "invalid route: {}", e),
            Self::Status(code) => write!(f, "Proxy responded with status {}", code),
            Self::Timeout => write!(f, "request timeout"),
            Self::Network(e) => write!(f, "network error: {}", e),
            Self::EmptyBody => write!(f, "Proxy returned empty content"),
            Self::ErrorMarker => write!(f, "Proxy returned its own error page"),
        }
    }
}

impl From<reqwest::Error> for RouteFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Network(format!("connection failed: {}", e))
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Builds the HTTP client shared by all route attempts
///
/// Relays may redirect, so the default redirect policy is kept.
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches page content, falling back across the route pool
#[derive(Debug, Clone)]
pub struct ResilientFetcher {
    client: Client,
    rotator: ProxyRotator,
    error_marker: String,
}

impl ResilientFetcher {
    /// Creates a fetcher from its parts
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for every attempt
    /// * `rotator` - Source of per-request route orderings
    /// * `error_marker` - Substring identifying a relay's own error page
    pub fn new(client: Client, rotator: ProxyRotator, error_marker: impl Into<String>) -> Self {
        Self {
            client,
            rotator,
            error_marker: error_marker.into(),
        }
    }

    /// Creates a fetcher from the `[fetch]` configuration section
    pub fn from_config(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = build_http_client(config)?;
        let rotator = ProxyRotator::from_templates(&config.routes);
        Ok(Self::new(client, rotator, config.error_marker.clone()))
    }

    /// Returns the rotator backing this fetcher
    pub fn rotator(&self) -> &ProxyRotator {
        &self.rotator
    }

    /// Retrieves the content at `locator` through the first working route
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Body from the first route that produced usable content
    /// * `Err(FetchError::Blocked)` - Every route failed; carries `locator` unchanged
    pub async fn fetch(&self, locator: &Locator) -> Result<String, FetchError> {
        let routes = self.rotator.shuffled_routes();
        let total = routes.len();
        let mut last_failure: Option<RouteFailure> = None;

        for (index, route) in routes.iter().enumerate() {
            match self.attempt(route, locator).await {
                Ok(body) => {
                    tracing::debug!(
                        "Fetched {} via {} ({} bytes, attempt {}/{})",
                        locator,
                        route.host(),
                        body.len(),
                        index + 1,
                        total
                    );
                    return Ok(body);
                }
                Err(failure) => {
                    tracing::warn!(
                        "Attempt with route {} failed for {}: {}",
                        route.host(),
                        locator,
                        failure
                    );
                    last_failure = Some(failure);
                }
            }
        }

        let summary = match last_failure {
            Some(failure) => failure.to_string(),
            None => "no routes configured".to_string(),
        };

        tracing::warn!("All {} routes failed for {}", total, locator);

        Err(FetchError::Blocked {
            locator: locator.clone(),
            summary,
        })
    }

    /// Performs one request through one route and classifies the outcome
    async fn attempt(&self, route: &Route, locator: &Locator) -> Result<String, RouteFailure> {
        let target = route
            .resolve(locator)
            .map_err(|e| RouteFailure::InvalidRoute(e.to_string()))?;

        let response = self
            .client
            .get(target)
            .header(REQUESTED_WITH.0, REQUESTED_WITH.1)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RouteFailure::Status(status.as_u16()));
        }

        let body = response.text().await?;

        if body.is_empty() {
            return Err(RouteFailure::EmptyBody);
        }

        if body.contains(&self.error_marker) {
            return Err(RouteFailure::ErrorMarker);
        }

        Ok(body)
    }
}
