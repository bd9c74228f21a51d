//! Memory store implementations for Scrivener.

pub mod in_memory;
pub mod file_backend;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use file_backend::FileStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use std::sync::Arc;
use scrivener_config::{MemoryConfig, MemoryMode};
use scrivener_core::error::MemoryError;
use scrivener_core::memory::MemoryStore;

/// Open the store backing `mode`.
pub async fn open_store(
    mode: MemoryMode,
    config: &MemoryConfig,
) -> Result<Arc<dyn MemoryStore>, MemoryError> {
    match mode {
        MemoryMode::Transient => Ok(Arc::new(InMemoryStore::new())),
        MemoryMode::PersistentLocal => Ok(Arc::new(FileStore::open(config.store_path()))),
        MemoryMode::PersistentRemote => open_remote(config).await,
    }
}

#[cfg(feature = "postgres")]
async fn open_remote(config: &MemoryConfig) -> Result<Arc<dyn MemoryStore>, MemoryError> {
    let url = config.database_url.as_deref().ok_or_else(|| {
        MemoryError::NotConfigured("persistent-remote needs memory.database_url".into())
    })?;
    Ok(Arc::new(PostgresStore::connect(url).await?))
}

#[cfg(not(feature = "postgres"))]
async fn open_remote(_config: &MemoryConfig) -> Result<Arc<dyn MemoryStore>, MemoryError> {
    Err(MemoryError::NotConfigured(
        "persistent-remote requires building with the `postgres` feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transient_mode_opens_in_memory_store() {
        let store = open_store(MemoryMode::Transient, &MemoryConfig::default())
            .await
            .unwrap();
        assert_eq!(store.name(), "in_memory");
    }

    #[tokio::test]
    async fn local_mode_opens_file_store_at_configured_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = MemoryConfig {
            path: Some(dir.path().join("m.json")),
            database_url: None,
        };
        let store = open_store(MemoryMode::PersistentLocal, &config).await.unwrap();
        assert_eq!(store.name(), "file");
    }

    #[cfg(not(feature = "postgres"))]
    #[tokio::test]
    async fn remote_mode_without_feature_is_not_configured() {
        let result = open_store(MemoryMode::PersistentRemote, &MemoryConfig::default()).await;
        assert!(matches!(result, Err(MemoryError::NotConfigured(_))));
    }
}
