//! Session management handlers

use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::AppState;
use contactdesk_common::{
    auth::CurrentSession,
    errors::{AppError, Result},
    session::UserData,
};

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Outcome of a session operation
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    fn ok(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
        })
    }
}

/// Current session state
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub user_data: UserData,
    pub created_at: String,
    pub last_accessed: String,
}

/// Check credentials, start a session and set the session cookie
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    let user_data = state
        .authenticator
        .verify(&request.username, &request.password)
        .await
        .ok_or(AppError::InvalidCredentials)?;

    let (session_id, token) = state.sessions.login(user_data).await?;

    tracing::info!(
        session_id = %session_id,
        username = %request.username,
        "User logged in"
    );

    let jar = jar.add(state.cookie.issue(token));
    Ok((jar, MessageResponse::ok("Login successful")))
}

/// End the current session and clear the cookie
pub async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    state.sessions.logout(&session.session_id).await?;

    tracing::info!(session_id = %session.session_id, "User logged out");

    let jar = jar.remove(state.cookie.clear());
    Ok((jar, MessageResponse::ok("Logout successful")))
}

/// Get the current session
pub async fn session_info(CurrentSession(session): CurrentSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        session_id: session.session_id,
        user_data: session.user_data,
        created_at: session.created_at.to_rfc3339(),
        last_accessed: session.last_accessed.to_rfc3339(),
    })
}

/// Reset the current session's expiry
pub async fn extend_session(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<MessageResponse>> {
    if !state.sessions.extend(&session.session_id).await? {
        // Deleted between the gate and here
        return Err(AppError::SessionExtendFailed);
    }

    tracing::debug!(session_id = %session.session_id, "Session extended");
    Ok(MessageResponse::ok("Session extended"))
}
