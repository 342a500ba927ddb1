//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use socialdesk_types::error::{BusinessError, ChatError, IdentityError, RepositoryError};
use socialdesk_types::llm::LlmError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Chat(ChatError),
    Identity(IdentityError),
    Business(BusinessError),
    Repository(RepositoryError),
    /// Authentication required or session expired.
    Unauthorized(String),
    /// Malformed request input.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<IdentityError> for AppError {
    fn from(e: IdentityError) -> Self {
        AppError::Identity(e)
    }
}

impl From<BusinessError> for AppError {
    fn from(e: BusinessError) -> Self {
        AppError::Business(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

fn repository_parts(e: &RepositoryError) -> (StatusCode, &'static str, String) {
    match e {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", "Not found".to_string()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        e => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", e.to_string()),
    }
}

fn upstream_parts(e: &LlmError) -> (StatusCode, &'static str, String) {
    let status = match e {
        LlmError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, "UPSTREAM_ERROR", format!("Model call failed: {e}"))
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Chat(ChatError::NotFound) => (
                StatusCode::NOT_FOUND,
                "CONVERSATION_NOT_FOUND",
                "Conversation not found".to_string(),
            ),
            AppError::Chat(ChatError::EmptyPrompt) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", ChatError::EmptyPrompt.to_string())
            }
            AppError::Chat(ChatError::Repository(e)) => repository_parts(e),
            AppError::Chat(ChatError::Llm(e)) => upstream_parts(e),
            AppError::Chat(e @ ChatError::Topic(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "UPSTREAM_ERROR", e.to_string())
            }
            AppError::Chat(e @ ChatError::Persist(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", e.to_string())
            }
            AppError::Identity(IdentityError::Unauthenticated) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "User must be authenticated to migrate conversations".to_string(),
            ),
            AppError::Identity(e @ IdentityError::InvalidAnonymousId(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Identity(IdentityError::Repository(e)) => repository_parts(e),
            AppError::Business(BusinessError::NotFound) => (
                StatusCode::NOT_FOUND,
                "BUSINESS_NOT_FOUND",
                "No business information found".to_string(),
            ),
            AppError::Business(BusinessError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Business(BusinessError::Repository(e)) => repository_parts(e),
            AppError::Repository(e) => repository_parts(e),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, error = %message, "request failed");
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": uuid::Uuid::new_v4().to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
