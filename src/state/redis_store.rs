use crate::error::{AppError, Result};
use crate::state::IndexPointerCache;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Index pointer cache kept in Redis, shared by every process that reads
/// or swaps the live generation.
#[derive(Clone)]
pub struct RedisPointerCache {
    connection: ConnectionManager,
    key_prefix: String,
}

impl RedisPointerCache {
    /// Connect with the default key prefix
    pub async fn new(redis_url: &str) -> Result<Self> {
        Self::new_with_prefix(redis_url, "villagerdb").await
    }

    /// Connect with a custom key prefix
    pub async fn new_with_prefix(redis_url: &str, prefix: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            AppError::Configuration(format!("Invalid Redis URL: {}", e))
        })?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Network(format!("Failed to connect to Redis: {}", e)))?;

        let mut test_conn = connection.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut test_conn)
            .await
            .map_err(|e| AppError::Network(format!("Redis connection test failed: {}", e)))?;

        tracing::info!(prefix = %prefix, "Initialized Redis pointer cache");

        Ok(Self {
            connection,
            key_prefix: prefix.to_string(),
        })
    }

    fn pointer_key(&self, key: &str) -> String {
        format!("{}:pointer:{}", self.key_prefix, key)
    }
}

#[async_trait]
impl IndexPointerCache for RedisPointerCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(self.pointer_key(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.set(self.pointer_key(key), value).await?;
        Ok(())
    }

    async fn replace(&self, key: &str, value: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let previous: Option<String> = conn.getset(self.pointer_key(key), value).await?;
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string())
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_replace_returns_previous() {
        let cache = RedisPointerCache::new_with_prefix(&redis_url(), "villagerdb-test")
            .await
            .unwrap();
        let key = format!("towns-{}", uuid::Uuid::new_v4());

        assert_eq!(cache.get(&key).await.unwrap(), None);
        assert_eq!(cache.replace(&key, "towns_1").await.unwrap(), None);
        assert_eq!(
            cache.replace(&key, "towns_2").await.unwrap().as_deref(),
            Some("towns_1")
        );
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("towns_2"));
    }

    #[tokio::test]
    async fn test_invalid_url_is_configuration_error() {
        let result = RedisPointerCache::new("not a url").await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }
}
