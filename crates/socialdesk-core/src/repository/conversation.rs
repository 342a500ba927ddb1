//! ConversationRepository trait definition.
//!
//! Conversations and their message batches. Batches are opaque strings at this
//! layer; encoding and decoding happen in `ConversationStore`.

use chrono::{DateTime, Utc};
use socialdesk_types::conversation::{Conversation, ConversationSummary};
use socialdesk_types::error::RepositoryError;

/// Repository trait for conversation and message-batch persistence.
///
/// Implementations live in socialdesk-infra (e.g., `SqliteConversationRepository`).
pub trait ConversationRepository: Send + Sync {
    fn exists(
        &self,
        conversation_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Owner of the conversation, or `None` if it does not exist.
    fn owner_of(
        &self,
        conversation_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, RepositoryError>> + Send;

    /// Insert a conversation row. A duplicate id is `RepositoryError::Conflict`.
    fn create(
        &self,
        conversation: &Conversation,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Active conversations of a user, most recently updated first.
    fn list_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationSummary>, RepositoryError>> + Send;

    /// Append one batch and bump the conversation's `updated_at`.
    fn append_batch(
        &self,
        conversation_id: &str,
        batch: &str,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All batches in insertion order.
    fn get_batches(
        &self,
        conversation_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send;

    /// Reassign one conversation. Returns `false` if it does not exist.
    fn transfer_owner(
        &self,
        conversation_id: &str,
        new_user_id: &str,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Reassign every active conversation of `from_user_id`; returns rows moved.
    fn transfer_all(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
