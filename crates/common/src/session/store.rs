//! Key-value backed session repository
//!
//! Every successful `get`, `update` and `extend` rewrites the record with a
//! fresh `now + ttl` deadline (sliding expiration). The read and the rewrite
//! are separate backend calls: a `delete` landing between them is overwritten,
//! which can keep a logged-out session alive for one more ttl window. This
//! weak consistency is accepted; callers needing a hard revoke must not rely on
//! a concurrent logout winning.

use super::record::{SessionRecord, StoredSession, UserData};
use crate::errors::Result;
use crate::kv::KvBackend;
use crate::metrics;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Session repository over a shared key-value backend
pub struct SessionStore<T = UserData> {
    backend: Arc<dyn KvBackend>,
    key_prefix: String,
    ttl: Duration,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Clone for SessionStore<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            key_prefix: self.key_prefix.clone(),
            ttl: self.ttl,
            _payload: PhantomData,
        }
    }
}

impl<T> fmt::Debug for SessionStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("backend", &self.backend.name())
            .field("key_prefix", &self.key_prefix)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<T> SessionStore<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    pub fn new(backend: Arc<dyn KvBackend>, key_prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            backend,
            key_prefix: key_prefix.into(),
            ttl,
            _payload: PhantomData,
        }
    }

    /// Sliding lifetime applied on every touch
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend(&self) -> &Arc<dyn KvBackend> {
        &self.backend
    }

    /// Build a prefixed key
    fn key(&self, session_id: &str) -> String {
        format!("{}:{}", self.key_prefix, session_id)
    }

    /// Create a session and return its fresh id
    pub async fn create(&self, user_data: T) -> Result<String> {
        let session_id = Uuid::new_v4().to_string();
        self.save(&session_id, &StoredSession::new(user_data)).await?;

        metrics::record_session_event("created");
        info!(session_id = %session_id, ttl_secs = self.ttl.as_secs(), "Session created");
        Ok(session_id)
    }

    /// Load a live session and re-arm its expiry
    pub async fn get(&self, session_id: &str) -> Result<Option<SessionRecord<T>>> {
        let Some(mut stored) = self.load(session_id).await? else {
            return Ok(None);
        };

        stored.touch();
        self.save(session_id, &stored).await?;

        Ok(Some(stored.into_record(session_id)))
    }

    /// Replace the payload of a live session
    pub async fn update(&self, session_id: &str, user_data: T) -> Result<bool> {
        let Some(mut stored) = self.load(session_id).await? else {
            return Ok(false);
        };

        stored.user_data = user_data;
        stored.touch();
        self.save(session_id, &stored).await?;

        metrics::record_session_event("updated");
        debug!(session_id = %session_id, "Session updated");
        Ok(true)
    }

    /// Reset a live session's expiry without changing its payload
    pub async fn extend(&self, session_id: &str) -> Result<bool> {
        let Some(mut stored) = self.load(session_id).await? else {
            return Ok(false);
        };

        stored.touch();
        self.save(session_id, &stored).await?;

        metrics::record_session_event("extended");
        debug!(session_id = %session_id, "Session extended");
        Ok(true)
    }

    /// Remove a session, returning whether it existed
    pub async fn delete(&self, session_id: &str) -> Result<bool> {
        let deleted = self.backend.delete(&self.key(session_id)).await.inspect_err(|_| {
            metrics::record_store_error("delete");
        })?;

        if deleted {
            metrics::record_session_event("deleted");
            info!(session_id = %session_id, "Session deleted");
        }
        Ok(deleted)
    }

    async fn load(&self, session_id: &str) -> Result<Option<StoredSession<T>>> {
        let raw = self.backend.get(&self.key(session_id)).await.inspect_err(|_| {
            metrics::record_store_error("get");
        })?;

        let Some(raw) = raw else {
            debug!(session_id = %session_id, "Session absent");
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Discarding unreadable session");
                Ok(None)
            }
        }
    }

    async fn save(&self, session_id: &str, stored: &StoredSession<T>) -> Result<()> {
        let json = serde_json::to_string(stored)?;
        self.backend
            .set_ex(&self.key(session_id), &json, self.ttl)
            .await
            .inspect_err(|_| metrics::record_store_error("set"))
    }
}
