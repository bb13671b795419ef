//! SQLite result store
//!
//! This module provides a SQLite-based implementation of the ResultStore trait.

use crate::extract::Record;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ResultStore, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// SQLite-backed store for the accumulated records
pub struct SqliteResultStore {
    conn: Mutex<Connection>,
}

impl SqliteResultStore {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns when the stored records were last saved
    pub fn saved_at(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let conn = self.conn();
        let raw: Option<String> = conn
            .query_row("SELECT saved_at FROM save_meta WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match raw {
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|e| StorageError::Database(format!("invalid saved_at '{}': {}", s, e))),
            None => Ok(None),
        }
    }
}

impl ResultStore for SqliteResultStore {
    fn load(&self) -> StorageResult<Option<Vec<Record>>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT question, options, correct_answer, exam_name, image_url
             FROM records ORDER BY position",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (question, options, correct_answer, exam_name, image_url) = row?;
            records.push(Record {
                question,
                options: serde_json::from_str(&options)?,
                correct_answer,
                exam_name,
                image_url,
            });
        }

        if records.is_empty() {
            Ok(None)
        } else {
            Ok(Some(records))
        }
    }

    fn save(&self, records: &[Record]) -> StorageResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM records", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO records (position, question, options, correct_answer, exam_name, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (position, record) in records.iter().enumerate() {
                insert.execute(params![
                    position as i64,
                    record.question,
                    serde_json::to_string(&record.options)?,
                    record.correct_answer,
                    record.exam_name,
                    record.image_url,
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO save_meta (id, saved_at, record_count) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET saved_at = excluded.saved_at, record_count = excluded.record_count",
            params![Utc::now().to_rfc3339(), records.len() as i64],
        )?;

        tx.commit()?;
        tracing::debug!("Saved {} records", records.len());
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM records", [])?;
        tx.execute("DELETE FROM save_meta", [])?;
        tx.commit()?;
        Ok(())
    }
}
