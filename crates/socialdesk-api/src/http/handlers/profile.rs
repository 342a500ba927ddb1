//! Caller profile and health endpoints.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use socialdesk_types::user::User;

use crate::http::cookies::SetCookies;
use crate::http::error::AppError;
use crate::http::extractors::caller::Caller;
use crate::state::AppState;

/// GET /me
pub async fn me(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<(SetCookies, Json<User>), AppError> {
    let user = state.identity.profile(&caller.identity).await?;
    Ok((caller.cookies, Json(user)))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
