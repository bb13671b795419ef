//! Output module for exporting harvested records and reporting runs
//!
//! This module handles:
//! - Writing the accumulated records to a JSON file
//! - Printing a human-readable summary of a finished run

mod export;
mod report;

pub use export::{export_json, DEFAULT_EXPORT_FILE};
pub use report::{format_report, print_report};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Nothing to export")]
    Empty,

    #[error("Failed to serialize records: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
