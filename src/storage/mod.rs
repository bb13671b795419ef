//! Storage module for persisting harvested records
//!
//! This module handles keeping the accumulated records across sessions:
//! - SQLite database initialization and schema management
//! - Ordered, lossless record persistence
//! - An in-process store for embedding and tests

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryResultStore;
pub use sqlite::SqliteResultStore;
pub use traits::{ResultStore, StorageError, StorageResult};

use std::path::Path;

/// Opens (creating if needed) the results database at `path`
pub fn open_store(path: &Path) -> StorageResult<SqliteResultStore> {
    SqliteResultStore::new(path)
}
