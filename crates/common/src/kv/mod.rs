//! Key-value backends for session storage
//!
//! Provides:
//! - The [`KvBackend`] trait the session store is written against
//! - A Redis implementation sharing one lazily opened connection
//! - An in-process implementation for tests and local development

mod memory;
mod redis;

pub use self::memory::MemoryBackend;
pub use self::redis::RedisBackend;

use crate::config::RedisConfig;
use crate::errors::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// URL scheme selecting [`MemoryBackend`]
pub const MEMORY_URL: &str = "memory://";

/// Single-key string storage with per-key expiry
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Read a value. Expired keys read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value that expires `ttl` from now, replacing any previous
    /// value and deadline.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Remove a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Check connectivity
    async fn ping(&self) -> Result<()>;

    /// Release the underlying connection. Later calls may reconnect.
    async fn close(&self);

    /// Backend name for logs and health output
    fn name(&self) -> &'static str;
}

/// Create a backend based on configuration
pub fn create_backend(config: &RedisConfig) -> Result<Arc<dyn KvBackend>> {
    if config.url.starts_with(MEMORY_URL) {
        tracing::warn!("Using in-process session store; sessions are lost on restart");
        return Ok(Arc::new(MemoryBackend::new()));
    }

    Ok(Arc::new(RedisBackend::new(&config.url)?))
}
