//! Fetch module for retrieving page content through relay routes
//!
//! This module contains:
//! - `ProxyRotator`: produces a fresh random ordering of the route pool per request
//! - `ResilientFetcher`: tries each route in that order until one yields usable content
//! - HTTP client construction shared by every route attempt
//!
//! Individual route failures are absorbed here. The only error that leaves the
//! module for a fetch is `FetchError::Blocked`, raised once the whole pool is
//! exhausted.

mod fetcher;
mod rotator;

pub use fetcher::{build_http_client, ResilientFetcher, RouteFailure};
pub use rotator::ProxyRotator;

use crate::url::Locator;
use thiserror::Error;

/// Errors surfaced by the fetch layer
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every route in the pool failed for this locator
    #[error("The target website appears to be blocking automated requests for {locator} (last error: {summary})")]
    Blocked {
        /// The originally requested locator, unchanged
        locator: Locator,
        /// Description of the last route failure
        summary: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
