//! In-process store
//!
//! Nothing survives the process. Useful for tests and for `--storage memory`
//! runs that should leave no trace on disk.

use super::{CollectionName, DurableStore};
use crate::error::{PromptbenchError, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// Durable store that keeps snapshots in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: Mutex<HashMap<CollectionName, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<CollectionName, String>>> {
        self.snapshots
            .lock()
            .map_err(|_| PromptbenchError::Storage("Memory store lock poisoned".to_string()).into())
    }
}

impl DurableStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn save(&self, collection: CollectionName, snapshot: &str) -> Result<()> {
        self.lock()?.insert(collection, snapshot.to_string());
        Ok(())
    }

    fn load(&self, collection: CollectionName) -> Result<Option<String>> {
        Ok(self.lock()?.get(&collection).cloned())
    }

    fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_save_load_clear() {
        let store = MemoryStore::new();
        assert_eq!(store.load(CollectionName::Comparisons).unwrap(), None);

        store.save(CollectionName::Comparisons, "[1]").unwrap();
        store.save(CollectionName::Comparisons, "[2]").unwrap();
        assert_eq!(
            store.load(CollectionName::Comparisons).unwrap().as_deref(),
            Some("[2]")
        );
        assert_eq!(store.load(CollectionName::Executions).unwrap(), None);

        store.clear().unwrap();
        assert_eq!(store.load(CollectionName::Comparisons).unwrap(), None);
    }
}
