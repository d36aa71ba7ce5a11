//! Redis backend

use super::KvBackend;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

const CONNECT_RETRIES: usize = 2;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis client holding one managed connection for the whole process.
///
/// The connection is opened on first use and cloned per operation, so
/// concurrent requests share it. When the server drops it, the manager
/// reconnects in the background; the request that saw the drop fails with
/// `StoreUnavailable` and later requests use the new connection.
pub struct RedisBackend {
    client: Client,
    connection: RwLock<Option<ConnectionManager>>,
}

impl RedisBackend {
    /// Create a new backend. No connection is made yet.
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(|e| AppError::Configuration {
            message: format!("Failed to create Redis client: {}", e),
        })?;

        Ok(Self {
            client,
            connection: RwLock::new(None),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok(conn.clone());
        }

        // Connect without holding the lock; a concurrent winner is kept
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(CONNECT_RETRIES)
            .set_connection_timeout(CONNECT_TIMEOUT);
        let conn = ConnectionManager::new_with_config(self.client.clone(), config)
            .await
            .map_err(|e| AppError::StoreUnavailable {
                message: format!("Failed to connect to Redis: {}", e),
            })?;

        let mut slot = self.connection.write().await;
        if slot.is_none() {
            info!("Redis connection established");
        }
        Ok(slot.get_or_insert(conn).clone())
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;

        let value: Option<String> = conn.get(key).await.map_err(|e| AppError::StoreUnavailable {
            message: format!("Failed to get key '{}': {}", key, e),
        })?;

        debug!(key = %key, hit = value.is_some(), "Redis get");
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        let ttl_secs = ttl.as_secs().max(1);

        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(|e| AppError::StoreUnavailable {
                message: format!("Failed to set key '{}': {}", key, e),
            })?;

        debug!(key = %key, ttl_secs, "Redis set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;

        let deleted: i64 = conn.del(key).await.map_err(|e| AppError::StoreUnavailable {
            message: format!("Failed to delete key '{}': {}", key, e),
        })?;

        debug!(key = %key, deleted = deleted > 0, "Redis delete");
        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| AppError::StoreUnavailable {
                message: format!("Redis ping failed: {}", e),
            })?;
        Ok(())
    }

    async fn close(&self) {
        if self.connection.write().await.take().is_some() {
            info!("Redis connection closed");
        }
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
