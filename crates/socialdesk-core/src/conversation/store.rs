//! Conversation store.
//!
//! Wraps a `ConversationRepository` with the ownership gate, list-limit
//! clamping, and batch encoding. `user_owns` is the only authorization check
//! callers need before touching a conversation's messages.

use chrono::Utc;
use socialdesk_types::conversation::{Conversation, ConversationSummary};
use socialdesk_types::error::RepositoryError;
use socialdesk_types::message::{ModelMessage, decode_batch, encode_batch};
use tracing::debug;

use crate::repository::conversation::ConversationRepository;

/// Largest page the conversation list will return.
pub const MAX_LIST_LIMIT: i64 = 200;

pub struct ConversationStore<C: ConversationRepository> {
    repo: C,
    default_limit: i64,
}

impl<C: ConversationRepository> ConversationStore<C> {
    pub fn new(repo: C, default_limit: i64) -> Self {
        Self {
            repo,
            default_limit: default_limit.clamp(1, MAX_LIST_LIMIT),
        }
    }

    /// Resolve a requested page size: absent or non-positive means the
    /// default, anything above the maximum is clamped.
    pub fn effective_limit(&self, requested: Option<i64>) -> i64 {
        match requested {
            Some(n) if n > 0 => n.min(MAX_LIST_LIMIT),
            _ => self.default_limit,
        }
    }

    pub async fn exists(&self, conversation_id: &str) -> Result<bool, RepositoryError> {
        self.repo.exists(conversation_id).await
    }

    pub async fn owner_of(&self, conversation_id: &str) -> Result<Option<String>, RepositoryError> {
        self.repo.owner_of(conversation_id).await
    }

    /// `false` for conversations owned by someone else and for ids that do
    /// not exist.
    pub async fn user_owns(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<bool, RepositoryError> {
        Ok(self.repo.owner_of(conversation_id).await?.as_deref() == Some(user_id))
    }

    /// Insert a conversation under a caller-minted id.
    ///
    /// Fails with `RepositoryError::Conflict` if the id is taken.
    pub async fn create_with_id(
        &self,
        conversation_id: &str,
        user_id: &str,
        title: &str,
    ) -> Result<Conversation, RepositoryError> {
        let now = Utc::now();
        let conversation = Conversation {
            id: conversation_id.to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
            is_active: true,
        };
        self.repo.create(&conversation).await?;
        debug!(conversation_id, user_id, "conversation created");
        Ok(conversation)
    }

    pub async fn list_for_user(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ConversationSummary>, RepositoryError> {
        self.repo
            .list_for_user(user_id, self.effective_limit(limit))
            .await
    }

    /// Append one turn's messages as a single batch.
    pub async fn append_messages(
        &self,
        conversation_id: &str,
        messages: &[ModelMessage],
    ) -> Result<(), RepositoryError> {
        let batch = encode_batch(messages)
            .map_err(|e| RepositoryError::Query(format!("failed to encode batch: {e}")))?;
        self.repo
            .append_batch(conversation_id, &batch, Utc::now())
            .await
    }

    /// Full history: all batches in insertion order, flattened.
    pub async fn get_history(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ModelMessage>, RepositoryError> {
        let batches = self.repo.get_batches(conversation_id).await?;
        let mut history = Vec::new();
        for raw in &batches {
            let decoded = decode_batch(raw)
                .map_err(|e| RepositoryError::Query(format!("corrupt message batch: {e}")))?;
            history.extend(decoded);
        }
        Ok(history)
    }

    pub async fn transfer_owner(
        &self,
        conversation_id: &str,
        new_user_id: &str,
    ) -> Result<bool, RepositoryError> {
        self.repo
            .transfer_owner(conversation_id, new_user_id, Utc::now())
            .await
    }

    pub async fn transfer_all(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> Result<u64, RepositoryError> {
        self.repo
            .transfer_all(from_user_id, to_user_id, Utc::now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryConversationRepository;
    use socialdesk_types::message::to_chat_lines;

    fn store() -> ConversationStore<InMemoryConversationRepository> {
        ConversationStore::new(InMemoryConversationRepository::default(), 50)
    }

    #[test]
    fn test_effective_limit_clamps() {
        let store = store();
        assert_eq!(store.effective_limit(None), 50);
        assert_eq!(store.effective_limit(Some(0)), 50);
        assert_eq!(store.effective_limit(Some(-3)), 50);
        assert_eq!(store.effective_limit(Some(10)), 10);
        assert_eq!(store.effective_limit(Some(10_000)), MAX_LIST_LIMIT);
    }

    #[tokio::test]
    async fn test_user_owns_is_false_for_other_user_and_missing() {
        let store = store();
        store.create_with_id("c1", "u1", "Hello").await.unwrap();

        assert!(store.user_owns("c1", "u1").await.unwrap());
        assert!(!store.user_owns("c1", "u2").await.unwrap());
        assert!(!store.user_owns("nope", "u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_id_conflicts() {
        let store = store();
        store.create_with_id("c1", "u1", "One").await.unwrap();
        let err = store.create_with_id("c1", "u2", "Two").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.owner_of("c1").await.unwrap().as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_history_preserves_batch_order() {
        let store = store();
        store.create_with_id("c1", "u1", "Chat").await.unwrap();
        let ts = Utc::now();

        store
            .append_messages(
                "c1",
                &[
                    ModelMessage::user_prompt("first", ts, vec![]),
                    ModelMessage::model_text("reply one", None, ts),
                ],
            )
            .await
            .unwrap();
        store
            .append_messages(
                "c1",
                &[
                    ModelMessage::user_prompt("second", ts, vec![]),
                    ModelMessage::model_text("reply two", None, ts),
                ],
            )
            .await
            .unwrap();

        let lines = to_chat_lines(&store.get_history("c1").await.unwrap());
        let contents: Vec<&str> = lines.iter().map(|l| l.content.as_str()).collect();
        assert_eq!(contents, ["first", "reply one", "second", "reply two"]);
    }

    #[tokio::test]
    async fn test_transfer_all_moves_every_conversation() {
        let store = store();
        store.create_with_id("a1", "anon", "One").await.unwrap();
        store.create_with_id("a2", "anon", "Two").await.unwrap();
        store.create_with_id("b1", "user", "Mine").await.unwrap();

        let moved = store.transfer_all("anon", "user").await.unwrap();
        assert_eq!(moved, 2);
        assert!(store.list_for_user("anon", None).await.unwrap().is_empty());
        assert_eq!(store.list_for_user("user", None).await.unwrap().len(), 3);
        assert!(store.user_owns("a1", "user").await.unwrap());
    }

    #[tokio::test]
    async fn test_transfer_owner_missing_is_false() {
        let store = store();
        assert!(!store.transfer_owner("ghost", "user").await.unwrap());
    }
}
