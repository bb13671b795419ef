//! Storage traits and error types
//!
//! This module defines the trait interface for result stores and
//! associated error types.

use crate::extract::Record;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persists the accumulated records across sessions
///
/// The harvester saves after every change to a run's accumulator, loads once
/// at startup, and clears only on explicit request. Implementations must
/// round-trip records exactly, preserving their order.
pub trait ResultStore: Send + Sync {
    /// Returns the stored records, or `None` if nothing is stored
    fn load(&self) -> StorageResult<Option<Vec<Record>>>;

    /// Replaces the stored records with `records`
    fn save(&self, records: &[Record]) -> StorageResult<()>;

    /// Removes all stored records
    fn clear(&self) -> StorageResult<()>;
}
