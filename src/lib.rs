//! MCQ Harvest: a resilient paginated scraper
//!
//! This crate fetches pages of a target website through a rotating pool of
//! relay routes, hands each page to an extraction service that returns
//! structured multiple-choice records plus a "next page" pointer, and keeps
//! following that pointer until pagination ends or the caller cancels.

pub mod config;
pub mod extract;
pub mod fetch;
pub mod harvest;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for MCQ Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid route template: {0}")]
    InvalidRoute(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

// Re-export commonly used types
pub use config::Config;
pub use extract::{ExtractionOutcome, Extractor, Record};
pub use fetch::{ProxyRotator, ResilientFetcher};
pub use harvest::{HarvestOutcome, HarvestReport, Harvester, RunState};
pub use url::{Locator, Route};
