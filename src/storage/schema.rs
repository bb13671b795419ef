//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the results database.

use rusqlite::Connection;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Accumulated records, in extraction order
CREATE TABLE IF NOT EXISTS records (
    position INTEGER PRIMARY KEY,
    question TEXT NOT NULL,
    options TEXT NOT NULL,
    correct_answer TEXT NOT NULL,
    exam_name TEXT,
    image_url TEXT
);

-- Single-row metadata about the last save
CREATE TABLE IF NOT EXISTS save_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    saved_at TEXT NOT NULL,
    record_count INTEGER NOT NULL
);
"#;

/// Creates tables that do not exist yet
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
