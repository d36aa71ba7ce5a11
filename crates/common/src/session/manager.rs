//! Session manager: token issuance on top of the session store

use super::record::{SessionRecord, UserData};
use super::store::SessionStore;
use super::token::TokenCodec;
use crate::config::{RedisConfig, SessionConfig};
use crate::errors::Result;
use crate::kv::KvBackend;
use crate::metrics;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Entry point for login, per-request authentication and logout
pub struct SessionManager<T = UserData> {
    codec: TokenCodec,
    store: SessionStore<T>,
}

impl<T> Clone for SessionManager<T> {
    fn clone(&self) -> Self {
        Self {
            codec: self.codec.clone(),
            store: self.store.clone(),
        }
    }
}

impl<T> SessionManager<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    pub fn new(codec: TokenCodec, store: SessionStore<T>) -> Self {
        Self { codec, store }
    }

    /// Build a manager over an already created backend
    pub fn from_config(
        session: &SessionConfig,
        redis: &RedisConfig,
        backend: Arc<dyn KvBackend>,
    ) -> Result<Self> {
        let codec = TokenCodec::new(&session.secret_key)?;
        let store = SessionStore::new(
            backend,
            redis.key_prefix.clone(),
            session.ttl(),
        );
        Ok(Self::new(codec, store))
    }

    /// Start a session, returning its id and the token to hand to the client
    pub async fn login(&self, user_data: T) -> Result<(String, String)> {
        let session_id = self.store.create(user_data).await?;
        let token = self.codec.encode(&session_id);
        Ok((session_id, token))
    }

    /// Resolve a client token to a live session, refreshing its expiry.
    ///
    /// A token that fails verification and a session that no longer exists
    /// both yield `Ok(None)`. Only backend failures are errors.
    pub async fn authenticate(&self, token: &str) -> Result<Option<SessionRecord<T>>> {
        let session_id = match self.codec.decode(token) {
            Ok(id) => id,
            Err(e) => {
                metrics::record_auth_failure("invalid_token");
                debug!(error = %e, "Rejected session token");
                return Ok(None);
            }
        };

        let record = self.store.get(&session_id).await?;
        if record.is_none() {
            metrics::record_auth_failure("session_absent");
            debug!(session_id = %session_id, "Token refers to no live session");
        }
        Ok(record)
    }

    /// End a session. Ending one that is already gone is not an error.
    pub async fn logout(&self, session_id: &str) -> Result<bool> {
        self.store.delete(session_id).await
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<SessionRecord<T>>> {
        self.store.get(session_id).await
    }

    pub async fn update(&self, session_id: &str, user_data: T) -> Result<bool> {
        self.store.update(session_id, user_data).await
    }

    pub async fn extend(&self, session_id: &str) -> Result<bool> {
        self.store.extend(session_id).await
    }

    /// Re-issue the token for an existing session id
    pub fn token_for(&self, session_id: &str) -> String {
        self.codec.encode(session_id)
    }

    pub fn ttl(&self) -> Duration {
        self.store.ttl()
    }

    /// Check the backing store is reachable
    pub async fn ping(&self) -> Result<()> {
        self.store.backend().ping().await
    }

    /// Release the backing store connection at process shutdown
    pub async fn shutdown(&self) {
        self.store.backend().close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryBackend;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(3600);

    fn manager() -> SessionManager {
        let backend = Arc::new(MemoryBackend::new());
        SessionManager::new(
            TokenCodec::new("test-secret").unwrap(),
            SessionStore::new(backend, "session", TTL),
        )
    }

    fn user(name: &str) -> UserData {
        let mut data = UserData::new();
        data.insert("username".into(), json!(name));
        data.insert("role".into(), json!("admin"));
        data.insert("login_time".into(), json!("2024-01-01T00:00:00Z"));
        data
    }

    #[tokio::test]
    async fn test_login_then_authenticate() {
        let manager = manager();
        let (session_id, token) = manager.login(user("admin")).await.unwrap();

        let record = manager.authenticate(&token).await.unwrap().unwrap();
        assert_eq!(record.session_id, session_id);
        assert_eq!(record.user_data, user("admin"));
    }

    #[tokio::test]
    async fn test_logout_is_terminal() {
        let manager = manager();
        let (session_id, token) = manager.login(user("admin")).await.unwrap();

        assert!(manager.logout(&session_id).await.unwrap());
        // Token still verifies, but there is nothing behind it
        assert!(manager.codec.decode(&token).is_ok());
        assert!(manager.authenticate(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let manager = manager();
        let (session_id, _) = manager.login(user("admin")).await.unwrap();
        assert!(manager.logout(&session_id).await.unwrap());
        assert!(!manager.logout(&session_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_tampered_token_never_yields_a_session() {
        let manager = manager();
        let (_, token_a) = manager.login(user("a")).await.unwrap();
        let (_, token_b) = manager.login(user("b")).await.unwrap();

        for (i, c) in token_a.char_indices() {
            let replacement = if c == 'x' { "y" } else { "x" };
            let mut tampered = token_a.clone();
            tampered.replace_range(i..i + c.len_utf8(), replacement);
            assert!(manager.authenticate(&tampered).await.unwrap().is_none());
        }

        // Splicing one session's signature onto another's id fails too
        let (payload_a, _) = token_a.split_once('.').unwrap();
        let (_, signature_b) = token_b.split_once('.').unwrap();
        let spliced = format!("{}.{}", payload_a, signature_b);
        assert!(manager.authenticate(&spliced).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_logins_are_independent() {
        let manager = manager();
        let (a, b) = tokio::join!(manager.login(user("alice")), manager.login(user("bob")));
        let (id_a, token_a) = a.unwrap();
        let (id_b, token_b) = b.unwrap();
        assert_ne!(id_a, id_b);

        let record_a = manager.authenticate(&token_a).await.unwrap().unwrap();
        let record_b = manager.authenticate(&token_b).await.unwrap().unwrap();
        assert_eq!(record_a.user_data["username"], "alice");
        assert_eq!(record_b.user_data["username"], "bob");
    }

    #[tokio::test]
    async fn test_many_concurrent_logins() {
        let manager = manager();
        let logins = (0..32).map(|i| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.login(user(&format!("user{}", i))).await })
        });

        let results = futures::future::join_all(logins).await;
        let mut ids = std::collections::HashSet::new();
        for result in results {
            let (id, token) = result.unwrap().unwrap();
            assert!(ids.insert(id.clone()));
            let record = manager.authenticate(&token).await.unwrap().unwrap();
            assert_eq!(record.session_id, id);
        }
        assert_eq!(ids.len(), 32);
    }

    #[tokio::test]
    async fn test_token_for_matches_login_token() {
        let manager = manager();
        let (session_id, token) = manager.login(user("admin")).await.unwrap();
        assert_eq!(manager.token_for(&session_id), token);
    }

    #[tokio::test(start_paused = true)]
    async fn test_authenticate_refreshes_expiry() {
        let manager = manager();
        let (_, token) = manager.login(user("admin")).await.unwrap();

        for _ in 0..4 {
            tokio::time::advance(TTL - Duration::from_secs(1)).await;
            assert!(manager.authenticate(&token).await.unwrap().is_some());
        }

        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        assert!(manager.authenticate(&token).await.unwrap().is_none());
    }

    #[test]
    fn test_from_config_rejects_empty_secret() {
        let mut config = crate::config::AppConfig::default();
        config.session.secret_key.clear();
        let result: Result<SessionManager> = SessionManager::from_config(
            &config.session,
            &config.redis,
            Arc::new(MemoryBackend::new()),
        );
        assert!(result.is_err());
    }
}
