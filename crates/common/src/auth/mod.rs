//! Authentication and authorization utilities
//!
//! Provides:
//! - The per-request authorization gate ([`CurrentSession`] extractor)
//! - Session cookie construction
//! - The credential check hook used by login

mod credentials;

pub use credentials::{Authenticator, StaticCredentials};

use crate::config::SessionConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::session::{SessionManager, SessionRecord};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use std::time::Duration;

/// Cookie settings for the session token
#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
    max_age: Duration,
    secure: bool,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, max_age: Duration, secure: bool) -> Self {
        Self {
            name: name.into(),
            max_age,
            secure,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.cookie_name.clone(),
            config.ttl(),
            config.cookie_secure,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie carrying a freshly issued token.
    ///
    /// Max-Age only hints the browser; the store's expiry is authoritative.
    pub fn issue(&self, token: String) -> Cookie<'static> {
        let max_age = i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX);

        Cookie::build((self.name.clone(), token))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .path("/")
            .max_age(time::Duration::seconds(max_age))
            .build()
    }

    /// Cookie matching the issued one, for removal from a jar
    pub fn clear(&self) -> Cookie<'static> {
        Cookie::build((self.name.clone(), "")).path("/").build()
    }

    /// Token presented on the request, if any
    pub fn token<'a>(&self, jar: &'a CookieJar) -> Option<&'a str> {
        jar.get(&self.name)
            .map(|cookie| cookie.value())
            .filter(|value| !value.is_empty())
    }
}

/// Authenticated session attached to a request.
///
/// Extracting this from a request is the authorization gate: the session
/// cookie must be present, its token must verify, and the session it names
/// must be live. Any of those failing yields the same
/// [`AppError::Unauthorized`]. The lookup also slides the session's expiry.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionRecord);

impl CurrentSession {
    pub fn session_id(&self) -> &str {
        &self.0.session_id
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    Arc<SessionManager>: FromRef<S>,
    SessionCookie: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let sessions = Arc::<SessionManager>::from_ref(state);
        let cookie = SessionCookie::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        let Some(token) = cookie.token(&jar) else {
            metrics::record_auth_failure("missing_token");
            return Err(AppError::Unauthorized);
        };

        sessions
            .authenticate(token)
            .await?
            .map(CurrentSession)
            .ok_or(AppError::Unauthorized)
    }
}
