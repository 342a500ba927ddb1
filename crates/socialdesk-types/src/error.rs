use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in socialdesk-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors related to session records.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session payload: {0}")]
    Validation(String),

    #[error("session storage error: {0}")]
    Storage(String),
}

/// Errors from identity resolution and anonymous-history migration.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid anonymous user id: {0}")]
    InvalidAnonymousId(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Errors from business-profile operations.
#[derive(Debug, Error)]
pub enum BusinessError {
    #[error("business profile not found")]
    NotFound,

    #[error("invalid business profile: {0}")]
    Validation(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Errors raised while running a chat turn.
///
/// Once the response stream has started these are delivered as a terminal
/// item, so the caller can tell an aborted turn from a normal end of stream.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("conversation not found")]
    NotFound,

    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("topic generation failed: {0}")]
    Topic(String),

    #[error("failed to persist turn: {0}")]
    Persist(String),
}
