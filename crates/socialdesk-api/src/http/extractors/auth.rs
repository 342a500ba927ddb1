//! Authenticated-session extractor.
//!
//! Rejects with 401 unless the `session_id` cookie names a live session.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use socialdesk_core::identity::Identity;
use socialdesk_types::session::SessionUser;

use crate::http::cookies::{SESSION_COOKIE, cookie_value};
use crate::http::error::AppError;
use crate::state::AppState;

pub struct AuthenticatedUser {
    pub session_id: String,
    pub user: SessionUser,
}

impl AuthenticatedUser {
    pub fn identity(&self) -> Identity {
        Identity::from_session(self.user.clone())
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let unauthorized = || AppError::Unauthorized("Authentication required".to_string());

        let session_id = cookie_value(&parts.headers, SESSION_COOKIE).ok_or_else(unauthorized)?;
        let record = state
            .sessions
            .get(&session_id)
            .await
            .ok_or_else(unauthorized)?;

        Ok(AuthenticatedUser {
            session_id,
            user: record.user,
        })
    }
}
