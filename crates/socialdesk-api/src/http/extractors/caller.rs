//! Caller identity extractor.
//!
//! Resolves who is calling (session first, then the anonymous cookie),
//! makes sure a user row exists, and prepares the anonymous cookie so its
//! 30-day window slides with every request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::TimeDelta;
use socialdesk_core::identity::Identity;

use crate::http::cookies::{ANONYMOUS_COOKIE, SetCookies, request_cookies};
use crate::http::error::AppError;
use crate::state::AppState;

/// The resolved caller plus cookies the response must carry.
pub struct Caller {
    pub identity: Identity,
    pub cookies: SetCookies,
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let request_cookies = request_cookies(&parts.headers);
        let identity = state.identity.resolve(&request_cookies).await;
        state.identity.ensure_user_exists(&identity).await?;

        let mut cookies = SetCookies::new(state.config.session.secure_cookies);
        if identity.is_anonymous {
            cookies.set(
                ANONYMOUS_COOKIE,
                &identity.user_id,
                TimeDelta::days(state.config.session.anonymous_cookie_days),
            );
        }

        Ok(Caller { identity, cookies })
    }
}
