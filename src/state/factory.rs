use crate::config::{PointerBackend, StateBackend, StateConfig};
use crate::error::{AppError, Result};
use crate::state::{
    ChangeLog, DocumentStore, InMemoryPointerCache, InMemoryStore, IndexPointerCache,
    RedisPointerCache, SledStore,
};
use std::sync::Arc;

/// The three storage seams, wired to their configured backends
#[derive(Clone)]
pub struct Stores {
    pub documents: Arc<dyn DocumentStore>,
    pub change_log: Arc<dyn ChangeLog>,
    pub pointer: Arc<dyn IndexPointerCache>,
}

/// Create the document store, change log and pointer cache from configuration
pub async fn create_stores(config: &StateConfig) -> Result<Stores> {
    let (documents, change_log, sled): (Arc<dyn DocumentStore>, Arc<dyn ChangeLog>, Option<SledStore>) =
        match config.backend {
            StateBackend::Sled => {
                let path = config.path.as_ref().ok_or_else(|| {
                    AppError::Configuration(
                        "Sled backend requires 'path' configuration".to_string(),
                    )
                })?;

                tracing::info!(path = ?path, "Initializing Sled storage backend");

                let store = SledStore::new(path)?;
                (Arc::new(store.clone()), Arc::new(store.clone()), Some(store))
            }

            StateBackend::Memory => {
                tracing::warn!("Using in-memory document store; towns are lost on restart");
                let store = InMemoryStore::new();
                (Arc::new(store.clone()), Arc::new(store), None)
            }
        };

    let pointer: Arc<dyn IndexPointerCache> = match config.pointer_backend {
        PointerBackend::Redis => {
            let redis_url = config.redis_url.as_ref().ok_or_else(|| {
                AppError::Configuration(
                    "Redis pointer backend requires 'redis_url' configuration".to_string(),
                )
            })?;

            tracing::info!(url = %redis_url, "Initializing Redis pointer cache");
            Arc::new(RedisPointerCache::new_with_prefix(redis_url, &config.redis_key_prefix).await?)
        }

        PointerBackend::Sled => {
            let store = sled.ok_or_else(|| {
                AppError::Configuration(
                    "Sled pointer backend requires the sled document backend".to_string(),
                )
            })?;
            tracing::info!("Index pointer kept in the Sled database");
            Arc::new(store)
        }

        PointerBackend::Memory => {
            tracing::warn!("Using in-memory index pointer; only valid for a single process");
            Arc::new(InMemoryPointerCache::new())
        }
    };

    Ok(Stores {
        documents,
        change_log,
        pointer,
    })
}

/// In-memory stores (for testing and development)
pub fn create_in_memory_stores() -> Stores {
    tracing::info!("Initializing in-memory storage backend");
    let store = InMemoryStore::new();
    Stores {
        documents: Arc::new(store.clone()),
        change_log: Arc::new(store),
        pointer: Arc::new(InMemoryPointerCache::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(backend: StateBackend, pointer_backend: PointerBackend) -> StateConfig {
        StateConfig {
            backend,
            pointer_backend,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_sled_stores() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config(StateBackend::Sled, PointerBackend::Sled);
        config.path = Some(temp_dir.path().to_path_buf());

        let stores = create_stores(&config).await.unwrap();
        assert_eq!(stores.change_log.backlog().await.unwrap(), 0);
        stores.pointer.set("towns", "towns_1").await.unwrap();
        assert_eq!(stores.pointer.get("towns").await.unwrap().as_deref(), Some("towns_1"));
    }

    #[tokio::test]
    async fn test_sled_requires_path() {
        let mut config = config(StateBackend::Sled, PointerBackend::Memory);
        config.path = None;
        assert!(matches!(
            create_stores(&config).await,
            Err(AppError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_sled_pointer_requires_sled_documents() {
        let config = config(StateBackend::Memory, PointerBackend::Sled);
        assert!(matches!(
            create_stores(&config).await,
            Err(AppError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_redis_requires_url() {
        let mut config = config(StateBackend::Memory, PointerBackend::Redis);
        config.redis_url = None;
        assert!(matches!(
            create_stores(&config).await,
            Err(AppError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_create_in_memory_stores() {
        let stores = create_in_memory_stores();
        assert_eq!(stores.change_log.backlog().await.unwrap(), 0);
        assert!(stores.pointer.get("towns").await.unwrap().is_none());
    }
}
