//! Business profile endpoints. Authenticated callers only.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use socialdesk_core::business::BusinessInput;
use socialdesk_types::user::BusinessProfile;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthenticatedUser;
use crate::state::AppState;

/// GET /business. `null` when no profile exists.
pub async fn get_business(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Option<BusinessProfile>>, AppError> {
    Ok(Json(state.business.get(&auth.user.id).await?))
}

/// POST /business. Creates or replaces the profile.
pub async fn save_business(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Json(input): Json<BusinessInput>,
) -> Result<Json<BusinessProfile>, AppError> {
    // The profile row references the user row.
    state.identity.ensure_user_exists(&auth.identity()).await?;
    let profile = state.business.save(&auth.user.id, input).await?;
    tracing::info!(user_id = %auth.user.id, "business profile saved");
    Ok(Json(profile))
}

/// DELETE /business
pub async fn delete_business(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<Value>, AppError> {
    state.business.delete(&auth.user.id).await?;
    Ok(Json(json!({ "message": "Business information deleted successfully" })))
}
