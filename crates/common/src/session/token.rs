//! Signed session tokens
//!
//! A token is `base64url(session_id) "." base64url(HMAC-SHA256(secret, salt "." payload))`.
//! It carries nothing but the session id and has no expiry of its own;
//! lifetime is enforced by the session store alone.

use crate::errors::{AppError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Domain separator mixed into every signature
const SALT: &[u8] = b"contactdesk.session";

/// Why a token was rejected. Never shown to clients.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not match")]
    BadSignature,
}

/// Stateless signer/verifier for session ids
#[derive(Clone)]
pub struct TokenCodec {
    mac: HmacSha256,
}

impl TokenCodec {
    /// Create a codec from the process-wide signing secret
    pub fn new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(AppError::Configuration {
                message: "Session signing secret must not be empty".to_string(),
            });
        }

        let mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
            AppError::Configuration {
                message: format!("Invalid session signing secret: {}", e),
            }
        })?;

        Ok(Self { mac })
    }

    /// Sign a session id into an opaque token
    pub fn encode(&self, session_id: &str) -> String {
        let payload = URL_SAFE_NO_PAD.encode(session_id.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&payload).finalize().into_bytes());
        format!("{}.{}", payload, signature)
    }

    /// Verify a token and recover the session id
    pub fn decode(&self, token: &str) -> std::result::Result<String, DecodeError> {
        let (payload, signature) = token.split_once('.').ok_or(DecodeError::Malformed)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| DecodeError::Malformed)?;

        // Constant-time comparison
        self.sign(payload)
            .verify_slice(&signature)
            .map_err(|_| DecodeError::BadSignature)?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| DecodeError::Malformed)?;
        let session_id = String::from_utf8(bytes).map_err(|_| DecodeError::Malformed)?;

        if session_id.is_empty() {
            return Err(DecodeError::Malformed);
        }

        Ok(session_id)
    }

    fn sign(&self, payload: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(SALT);
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}
