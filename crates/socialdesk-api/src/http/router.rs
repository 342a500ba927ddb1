//! Axum router configuration with middleware.
//!
//! Middleware: CORS and request tracing. With configured origins, CORS
//! allows credentials so browsers send the identity cookies; without any,
//! every origin is allowed and cookies are not shared cross-origin.

use axum::Router;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT])
        .allow_credentials(true)
}

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let chat_routes = Router::new()
        .route("/new-conversation", post(handlers::chat::new_conversation))
        .route("/conversations", get(handlers::chat::list_conversations))
        .route(
            "/migrate-conversations",
            post(handlers::chat::migrate_conversations),
        )
        .route(
            "/{id}",
            get(handlers::chat::get_chat).post(handlers::chat::post_chat),
        );

    let auth_routes = Router::new()
        .route("/status", get(handlers::auth::status))
        .route("/me", get(handlers::auth::me))
        .route("/logout", post(handlers::auth::logout))
        .route("/refresh", post(handlers::auth::refresh));

    Router::new()
        .nest("/chat", chat_routes)
        .nest("/auth", auth_routes)
        .route("/me", get(handlers::profile::me))
        .route(
            "/business",
            get(handlers::business::get_business)
                .post(handlers::business::save_business)
                .delete(handlers::business::delete_business),
        )
        .route("/health", get(handlers::profile::health))
        .layer(cors_layer(&state.config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
