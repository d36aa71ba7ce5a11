//! Credential check hook for login

use crate::config::AuthConfig;
use crate::session::UserData;
use async_trait::async_trait;
use chrono::Utc;
use constant_time_eq::constant_time_eq_32;
use serde_json::json;
use sha2::{Digest, Sha256};

/// Verifies login credentials and produces the session payload
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Return the user data to store in the new session, or `None` if the
    /// credentials are not accepted
    async fn verify(&self, username: &str, password: &str) -> Option<UserData>;
}

/// Single configured account. Stands in for a real user directory.
pub struct StaticCredentials {
    username: String,
    username_hash: [u8; 32],
    password_hash: [u8; 32],
    role: String,
}

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: &str, role: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            username_hash: digest(&username),
            username,
            password_hash: digest(password),
            role: role.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.username.clone(), &config.password, config.role.clone())
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

#[async_trait]
impl Authenticator for StaticCredentials {
    async fn verify(&self, username: &str, password: &str) -> Option<UserData> {
        // Both comparisons always run
        let user_ok = constant_time_eq_32(&digest(username), &self.username_hash);
        let password_ok = constant_time_eq_32(&digest(password), &self.password_hash);

        if !(user_ok && password_ok) {
            tracing::info!(username = %username, "Login rejected");
            return None;
        }

        let mut data = UserData::new();
        data.insert("username".into(), json!(self.username));
        data.insert("role".into(), json!(self.role));
        data.insert("login_time".into(), json!(Utc::now().to_rfc3339()));
        Some(data)
    }
}
