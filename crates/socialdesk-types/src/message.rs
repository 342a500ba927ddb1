//! Stored chat history and the chat-line wire shape.
//!
//! History is persisted as message batches: each batch is a JSON array of
//! [`ModelMessage`] values, one batch per completed turn. Batches are opaque
//! to the database and decoded only by the conversation store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;

/// One message exchanged with the model, tagged by direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ModelMessage {
    /// Sent to the model (user turn, optional system prompt).
    Request { parts: Vec<RequestPart> },
    /// Produced by the model.
    Response {
        parts: Vec<ResponsePart>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model_name: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part_kind", rename_all = "kebab-case")]
pub enum RequestPart {
    SystemPrompt {
        content: String,
    },
    UserPrompt {
        content: String,
        timestamp: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attachments: Vec<Attachment>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part_kind", rename_all = "kebab-case")]
pub enum ResponsePart {
    Text { content: String },
}

impl ModelMessage {
    /// A user turn carrying the prompt text and the attachments that were sent.
    pub fn user_prompt(
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
        attachments: Vec<Attachment>,
    ) -> Self {
        ModelMessage::Request {
            parts: vec![RequestPart::UserPrompt {
                content: content.into(),
                timestamp,
                attachments,
            }],
        }
    }

    /// A model turn made of a single text part.
    pub fn model_text(
        content: impl Into<String>,
        model_name: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        ModelMessage::Response {
            parts: vec![ResponsePart::Text {
                content: content.into(),
            }],
            model_name,
            timestamp,
        }
    }
}

/// Who produced a chat line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// A single line of the newline-delimited chat stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLine {
    pub role: ChatRole,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

impl ChatLine {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: ChatRole::User,
            timestamp,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: ChatRole::Model,
            timestamp,
            content: content.into(),
        }
    }
}

/// Flatten stored messages into chat lines, one per user-prompt or text part.
///
/// System prompts are never shown to the client.
pub fn to_chat_lines(messages: &[ModelMessage]) -> Vec<ChatLine> {
    let mut lines = Vec::new();
    for message in messages {
        match message {
            ModelMessage::Request { parts } => {
                for part in parts {
                    if let RequestPart::UserPrompt {
                        content, timestamp, ..
                    } = part
                    {
                        lines.push(ChatLine::user(content.clone(), *timestamp));
                    }
                }
            }
            ModelMessage::Response {
                parts, timestamp, ..
            } => {
                for ResponsePart::Text { content } in parts {
                    lines.push(ChatLine::model(content.clone(), *timestamp));
                }
            }
        }
    }
    lines
}

/// Serialize one batch for storage.
pub fn encode_batch(messages: &[ModelMessage]) -> Result<String, serde_json::Error> {
    serde_json::to_string(messages)
}

/// Decode one stored batch.
pub fn decode_batch(raw: &str) -> Result<Vec<ModelMessage>, serde_json::Error> {
    serde_json::from_str(raw)
}
