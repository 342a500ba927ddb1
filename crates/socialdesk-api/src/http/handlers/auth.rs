//! Session lifecycle endpoints.
//!
//! Sessions are created by the OAuth flow in front of this service; these
//! routes only inspect, extend, and end them.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::{Value, json};

use crate::http::cookies::{SESSION_COOKIE, SetCookies, request_cookies};
use crate::http::error::AppError;
use crate::http::extractors::auth::AuthenticatedUser;
use crate::state::AppState;

/// GET /auth/status
pub async fn status(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    match state.identity.authenticated(&request_cookies(&headers)).await {
        Some(user) => Json(json!({ "authenticated": true, "user": user })),
        None => Json(json!({ "authenticated": false })),
    }
}

/// GET /auth/me
pub async fn me(auth: AuthenticatedUser) -> Json<Value> {
    Json(json!(auth.user))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (SetCookies, Json<Value>) {
    if let Some(session_id) = request_cookies(&headers).session_id {
        state.sessions.delete(&session_id).await;
    }

    let mut cookies = SetCookies::new(state.config.session.secure_cookies);
    cookies.clear(SESSION_COOKIE);
    (cookies, Json(json!({ "message": "Logged out successfully" })))
}

/// POST /auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<(SetCookies, Json<Value>), AppError> {
    let ttl = state.session_ttl();
    if !state.sessions.refresh(&auth.session_id, ttl).await {
        return Err(AppError::Unauthorized("Session expired".to_string()));
    }

    let mut cookies = SetCookies::new(state.config.session.secure_cookies);
    cookies.set(SESSION_COOKIE, &auth.session_id, ttl);
    Ok((
        cookies,
        Json(json!({
            "message": "Session refreshed",
            "expires_in_days": state.config.session.ttl_days,
        })),
    ))
}
