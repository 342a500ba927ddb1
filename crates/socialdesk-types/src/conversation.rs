//! Conversation types.
//!
//! A conversation is a titled thread owned by exactly one user. Its history is
//! stored separately as append-only message batches (see [`crate::message`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

/// One entry of the conversation list shown to the owner.
///
/// `message_count` is the number of stored batches (one per completed turn).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: u32,
}

/// Mint a new conversation id. Nothing is persisted until the first turn.
pub fn new_conversation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
