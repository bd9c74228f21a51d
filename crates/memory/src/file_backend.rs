//! File-based store — backs the `persistent-local` memory mode.
//!
//! All records live in one human-readable JSON object mapping memory key to
//! record. The file is read once on open and rewritten on every mutation.
//!
//! Default location: `~/.scrivener/memory.json`

use async_trait::async_trait;
use scrivener_core::error::MemoryError;
use scrivener_core::memory::{Memory, MemoryStore};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A file-backed memory store.
pub struct FileStore {
    path: PathBuf,
    records: Arc<RwLock<BTreeMap<String, Memory>>>,
}

impl FileStore {
    /// Open the store at `path`.
    ///
    /// A missing file starts empty (created on first write). A file that
    /// cannot be parsed is logged and also treated as empty; it is only
    /// overwritten once something is saved.
    pub fn open(path: PathBuf) -> Self {
        let records = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = records.len(), "File memory store loaded");
        Self {
            path,
            records: Arc::new(RwLock::new(records)),
        }
    }

    fn load_from_disk(path: &Path) -> BTreeMap<String, Memory> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return BTreeMap::new(), // File doesn't exist yet — start empty
        };

        if content.trim().is_empty() {
            return BTreeMap::new();
        }

        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Memory file is corrupted, starting empty");
                BTreeMap::new()
            }
        }
    }

    /// Write every record to disk via a temp file and rename.
    async fn flush(&self, records: &BTreeMap<String, Memory>) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(records)
            .map_err(|e| MemoryError::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await.map_err(|e| {
            MemoryError::Storage(format!("Failed to write memory file: {e}"))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            MemoryError::Storage(format!("Failed to replace memory file: {e}"))
        })?;

        Ok(())
    }
}

#[async_trait]
impl MemoryStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<Memory>, MemoryError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, memory: &Memory) -> Result<(), MemoryError> {
        let mut records = self.records.write().await;
        let previous = records.insert(key.to_string(), memory.clone());
        if let Err(e) = self.flush(&records).await {
            // Keep the in-memory view consistent with what is on disk.
            match previous {
                Some(p) => records.insert(key.to_string(), p),
                None => records.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, MemoryError> {
        let mut records = self.records.write().await;
        if records.remove(key).is_none() {
            return Ok(false);
        }
        self.flush(&records).await?;
        Ok(true)
    }
}
