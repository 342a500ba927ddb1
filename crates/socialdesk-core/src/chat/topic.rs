//! Conversation topic labels via LLM.
//!
//! `generate_topic` turns the first prompt of a conversation into a 2-6 word
//! label addressed to the user in the second person.

use socialdesk_types::llm::{CompletionRequest, LlmError, Message};

use crate::llm::box_provider::BoxLlmProvider;

/// System prompt for the topic labelling call.
const TOPIC_SYSTEM_PROMPT: &str = "You are a friendly personal assistant.
Label the conversation based on the user's initial message.
Always refer to the user as 'you' or 'you're'; never say 'User'.
Output a concise topic label (2 to 6 words). Return ONLY the label text.";

/// Longest label kept, in words.
const MAX_TOPIC_WORDS: usize = 6;

/// Strip quotes and trailing punctuation, collapse whitespace, cap the length.
fn clean_topic(raw: &str) -> String {
    let trimmed = raw
        .trim()
        .trim_start_matches(|c| c == '"' || c == '\'')
        .trim_end_matches(|c| c == '"' || c == '\'' || c == '.')
        .trim();
    let trimmed = trimmed.strip_prefix("Topic:").unwrap_or(trimmed);
    trimmed
        .split_whitespace()
        .take(MAX_TOPIC_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Generate a topic label for a new conversation.
///
/// Low temperature, tight token cap. An empty label is an error so that a
/// conversation is never created without a title.
#[tracing::instrument(name = "generate_topic", skip(provider, first_prompt), fields(model = %model))]
pub async fn generate_topic(
    provider: &BoxLlmProvider,
    first_prompt: &str,
    model: &str,
) -> Result<String, LlmError> {
    let request = CompletionRequest {
        model: model.to_string(),
        messages: vec![Message::user(first_prompt)],
        system: Some(TOPIC_SYSTEM_PROMPT.to_string()),
        max_tokens: 30,
        temperature: Some(0.3),
        stream: false,
        tools: Vec::new(),
    };

    let response = provider.complete(&request).await?;
    let topic = clean_topic(&response.content);
    if topic.is_empty() {
        return Err(LlmError::Deserialization(
            "model returned an empty topic".to_string(),
        ));
    }
    Ok(topic)
}
