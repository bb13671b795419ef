//! Extraction module: turning raw page content into records
//!
//! The harvester treats extraction as a black box behind the `Extractor`
//! trait. `GeminiExtractor` is the production implementation backed by a
//! generative language API with a structured JSON response schema.

mod gemini;
mod types;

pub use gemini::{build_extraction_client, GeminiExtractor};
pub use types::{ExtractionOutcome, Record};

use crate::url::Locator;
use async_trait::async_trait;
use thiserror::Error;

/// Errors produced while extracting records from a page
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The response could not be read as an extraction outcome
    #[error("Received malformed data from the API: {0}")]
    MalformedResponse(String),

    /// The service produced no usable output (refused, truncated, or blank)
    #[error("{0}")]
    Empty(String),

    #[error("Extraction API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to communicate with the extraction API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0} environment variable not set")]
    MissingApiKey(String),
}

/// Result type for extraction operations
pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Converts page content into records and a next-page pointer
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extracts records from `content`
    ///
    /// # Arguments
    ///
    /// * `content` - Raw page content (usually HTML)
    /// * `base` - Address the content came from, used to absolutize relative links
    async fn extract(
        &self,
        content: &str,
        base: Option<&Locator>,
    ) -> ExtractionResult<ExtractionOutcome>;
}
