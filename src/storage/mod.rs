//! Durable storage for session collections
//!
//! Each of the three collections is persisted as one JSON array snapshot
//! under its collection name. Writes always replace the whole snapshot, so a
//! crash between writes loses at most the latest mutation and never leaves a
//! half-written collection behind.

use crate::config::StorageConfig;
use crate::error::{PromptbenchError, Result};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

pub mod memory;
pub mod sled_store;
pub mod sqlite_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;
pub use sqlite_store::SqliteStore;

/// Name of a persisted collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionName {
    /// Single-shot executions
    Executions,
    /// Multi-turn conversations
    Conversations,
    /// Cross-model comparisons
    Comparisons,
}

impl CollectionName {
    /// Every collection, in a stable order
    pub const ALL: [CollectionName; 3] = [
        CollectionName::Executions,
        CollectionName::Conversations,
        CollectionName::Comparisons,
    ];

    /// Storage key of the collection
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Executions => "executions",
            Self::Conversations => "conversations",
            Self::Comparisons => "comparisons",
        }
    }
}

impl std::fmt::Display for CollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key/value persistence of the named collections
///
/// Implementations store opaque JSON text. A collection that was never saved
/// loads as `None`.
pub trait DurableStore: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Replace the stored snapshot of a collection
    ///
    /// # Errors
    ///
    /// Returns `PromptbenchError::Storage` if the write fails
    fn save(&self, collection: CollectionName, snapshot: &str) -> Result<()>;

    /// Read the last saved snapshot of a collection
    ///
    /// # Errors
    ///
    /// Returns `PromptbenchError::Storage` if the read fails
    fn load(&self, collection: CollectionName) -> Result<Option<String>>;

    /// Erase every stored snapshot
    ///
    /// # Errors
    ///
    /// Returns `PromptbenchError::Storage` if the delete fails
    fn clear(&self) -> Result<()>;
}

/// Serialize a collection to its persisted form
pub fn encode_collection<T: Serialize>(items: &[T]) -> Result<String> {
    serde_json::to_string(items).map_err(|e| {
        PromptbenchError::Storage(format!("Serialization failed: {}", e)).into()
    })
}

/// Load and decode a collection, treating an absent snapshot as empty
///
/// # Errors
///
/// Returns `PromptbenchError::Storage` if the adapter fails or the snapshot
/// does not parse
///
/// # Examples
///
/// ```
/// use promptbench::models::Execution;
/// use promptbench::storage::{load_collection, CollectionName, MemoryStore};
///
/// let store = MemoryStore::new();
/// let executions: Vec<Execution> = load_collection(&store, CollectionName::Executions).unwrap();
/// assert!(executions.is_empty());
/// ```
pub fn load_collection<T: DeserializeOwned>(
    store: &dyn DurableStore,
    collection: CollectionName,
) -> Result<Vec<T>> {
    match store.load(collection)? {
        Some(snapshot) => serde_json::from_str(&snapshot).map_err(|e| {
            PromptbenchError::Storage(format!(
                "Failed to decode stored {}: {}",
                collection, e
            ))
            .into()
        }),
        None => Ok(Vec::new()),
    }
}

/// Default data directory for on-disk stores
///
/// # Errors
///
/// Returns `PromptbenchError::Storage` if the platform data directory cannot
/// be determined or created
pub fn default_data_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "promptbench", "promptbench")
        .ok_or_else(|| PromptbenchError::Storage("Could not determine data directory".into()))?;

    let data_dir = proj_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)
        .map_err(|e| PromptbenchError::Storage(format!("Failed to create data directory: {}", e)))?;

    Ok(data_dir)
}

/// Open the durable store described by configuration
///
/// # Arguments
///
/// * `config` - Storage configuration
///
/// # Errors
///
/// Returns error if the backend name is unknown or the database cannot be opened
///
/// # Examples
///
/// ```
/// use promptbench::config::StorageConfig;
/// use promptbench::storage::open_store;
///
/// let config = StorageConfig {
///     backend: "memory".to_string(),
///     path: None,
/// };
/// let store = open_store(&config).unwrap();
/// assert_eq!(store.name(), "memory");
/// ```
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn DurableStore>> {
    let store: Arc<dyn DurableStore> = match config.backend.as_str() {
        "memory" => Arc::new(MemoryStore::new()),
        "sled" => {
            let path = match &config.path {
                Some(path) => path.clone(),
                None => default_data_dir()?.join("sessions.sled"),
            };
            Arc::new(SledStore::new(path)?)
        }
        "sqlite" => {
            let path = match &config.path {
                Some(path) => path.clone(),
                None => default_data_dir()?.join("sessions.db"),
            };
            Arc::new(SqliteStore::new_with_path(path)?)
        }
        other => {
            return Err(
                PromptbenchError::Storage(format!("Unknown storage backend: {}", other)).into(),
            )
        }
    };

    tracing::info!(storage.backend = store.name(), "Opened durable store");
    Ok(store)
}
