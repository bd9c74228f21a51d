//! In-process store — backs the `transient` memory mode and tests.

use async_trait::async_trait;
use scrivener_core::error::MemoryError;
use scrivener_core::memory::{Memory, MemoryStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A store that keeps records in a map for the life of the process.
///
/// Documents in one batch that share a key see each other's updates;
/// nothing survives a restart.
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<String, Memory>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Memory>, MemoryError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, memory: &Memory) -> Result<(), MemoryError> {
        self.records.write().await.insert(key.to_string(), memory.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, MemoryError> {
        Ok(self.records.write().await.remove(key).is_some())
    }
}
