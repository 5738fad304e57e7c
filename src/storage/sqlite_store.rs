//! SQLite-backed snapshot storage

use super::{CollectionName, DurableStore};
use crate::error::{PromptbenchError, Result};
use anyhow::Context;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// Session persistence in a single SQLite table
///
/// One row per collection holds the JSON snapshot and the time it was written.
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Create a store that uses the specified database path
    ///
    /// The parent directory is created if needed.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptbench::storage::SqliteStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = SqliteStore::new_with_path(dir.path().join("sessions.db")).unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| PromptbenchError::Storage(e.to_string()))?;
        }

        let storage = Self { db_path };
        storage.init()?;
        Ok(storage)
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| PromptbenchError::Storage(e.to_string()).into())
    }

    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                snapshot JSON NOT NULL,
                saved_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| PromptbenchError::Storage(e.to_string()))?;

        Ok(())
    }

    /// When a collection was last written, as RFC-3339 text
    pub fn saved_at(&self, collection: CollectionName) -> Result<Option<String>> {
        let conn = self.open()?;
        conn.query_row(
            "SELECT saved_at FROM collections WHERE name = ?",
            params![collection.as_str()],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to query collection")
        .map_err(|e| PromptbenchError::Storage(e.to_string()).into())
    }
}

impl DurableStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn save(&self, collection: CollectionName, snapshot: &str) -> Result<()> {
        let conn = self.open()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO collections (name, snapshot, saved_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET snapshot = excluded.snapshot,
                                             saved_at = excluded.saved_at",
            params![collection.as_str(), snapshot, now],
        )
        .context("Failed to save collection")
        .map_err(|e| PromptbenchError::Storage(e.to_string()))?;

        Ok(())
    }

    fn load(&self, collection: CollectionName) -> Result<Option<String>> {
        let conn = self.open()?;
        conn.query_row(
            "SELECT snapshot FROM collections WHERE name = ?",
            params![collection.as_str()],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to query collection")
        .map_err(|e| PromptbenchError::Storage(e.to_string()).into())
    }

    fn clear(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute("DELETE FROM collections", [])
            .context("Failed to clear collections")
            .map_err(|e| PromptbenchError::Storage(e.to_string()))?;
        Ok(())
    }
}
