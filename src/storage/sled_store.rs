//! Embedded key/value store backed by `sled`

use super::{CollectionName, DurableStore};
use crate::error::{PromptbenchError, Result};
use sled::Db;
use std::path::Path;

/// Session persistence on an embedded `sled` database
///
/// Each collection snapshot lives under its collection name as the key.
pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Open or create a sled database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the database directory
    ///
    /// # Errors
    ///
    /// Returns `PromptbenchError::Storage` if database cannot be opened
    ///
    /// # Examples
    ///
    /// ```
    /// use promptbench::storage::SledStore;
    ///
    /// # fn main() -> promptbench::error::Result<()> {
    /// let dir = tempfile::tempdir()?;
    /// let store = SledStore::new(dir.path().join("sessions.sled"))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| PromptbenchError::Storage(format!("Failed to open database: {}", e)))?;
        Ok(Self { db })
    }

    /// Number of stored collection snapshots
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// Whether nothing has been saved yet
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

impl DurableStore for SledStore {
    fn name(&self) -> &str {
        "sled"
    }

    fn save(&self, collection: CollectionName, snapshot: &str) -> Result<()> {
        self.db
            .insert(collection.as_str().as_bytes(), snapshot.as_bytes())
            .map_err(|e| PromptbenchError::Storage(format!("Insert failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| PromptbenchError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    fn load(&self, collection: CollectionName) -> Result<Option<String>> {
        match self
            .db
            .get(collection.as_str().as_bytes())
            .map_err(|e| PromptbenchError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let text = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    PromptbenchError::Storage(format!("Stored {} is not UTF-8: {}", collection, e))
                })?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    fn clear(&self) -> Result<()> {
        self.db
            .clear()
            .map_err(|e| PromptbenchError::Storage(format!("Clear failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| PromptbenchError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }
}
