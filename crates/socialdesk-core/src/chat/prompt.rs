//! Model input assembly: system prompt, replayed history, and media refs.

use chrono::NaiveDate;
use socialdesk_types::attachment::{Attachment, AttachmentKind};
use socialdesk_types::llm::{MediaKind, MediaRef, Message};
use socialdesk_types::message::{ModelMessage, RequestPart, ResponsePart};
use socialdesk_types::user::BusinessProfile;

/// Build the marketing-assistant system prompt for one turn.
///
/// Web search is only mentioned when the `web_search` tool is attached.
pub fn system_prompt(
    today: NaiveDate,
    business: Option<&BusinessProfile>,
    web_search: bool,
) -> String {
    let mut prompt = format!(
        "You are a helpful marketing assistant and expert researcher specializing in helping businesses grow.\n\
         Today's date is {}.\n",
        today.format("%Y-%m-%d")
    );
    if web_search {
        prompt.push_str(
            "Use the web_search tool when you need up-to-date information about markets, \
             competitors, or trends, and cite the sources you used.\n",
        );
    }

    match business {
        Some(profile) => {
            prompt.push_str("\n--- CLIENT BUSINESS CONTEXT ---\n");
            prompt.push_str(&format!("Business Name: {}\n", profile.name));
            if let Some(url) = &profile.url {
                prompt.push_str(&format!("Website: {url}\n"));
            }
            if let Some(description) = &profile.description {
                prompt.push_str(&format!("Business Description: {description}\n"));
            }
            prompt.push_str(
                "\nWhen providing marketing advice, content suggestions, competitive analysis, or research insights, \
                 always consider this specific business context. Tailor your responses to be directly relevant \
                 and actionable for this business.\n",
            );
            if web_search {
                prompt.push_str(
                    "If you need to research competitors or market trends, use the business name \
                     and description to focus your search queries.\n",
                );
            }
        }
        None => prompt.push_str(
            "\nNote: No specific business context is available. Provide general marketing advice \
             and ask clarifying questions about the user's business when relevant.\n",
        ),
    }

    prompt
}

/// Map accepted attachments to model media references.
///
/// Unsupported kinds are dropped here as well, so stored history replays
/// cleanly even if the accepted set changes.
pub fn to_media(attachments: &[Attachment]) -> Vec<MediaRef> {
    attachments
        .iter()
        .filter_map(|a| {
            let kind = match a.kind() {
                AttachmentKind::Image => MediaKind::Image,
                AttachmentKind::Document => MediaKind::Document,
                AttachmentKind::Unsupported => return None,
            };
            Some(MediaRef {
                kind,
                url: a.url.clone(),
                mime_type: a.file_type.clone(),
                name: a.friendly_name.clone(),
            })
        })
        .collect()
}

/// The user message for the current turn.
pub fn user_message(prompt: &str, attachments: &[Attachment]) -> Message {
    Message {
        media: to_media(attachments),
        ..Message::user(prompt)
    }
}

/// Replay stored history as provider messages.
///
/// Stored system prompts are skipped; the current one is sent separately.
pub fn history_messages(history: &[ModelMessage]) -> Vec<Message> {
    let mut messages = Vec::new();
    for entry in history {
        match entry {
            ModelMessage::Request { parts } => {
                for part in parts {
                    if let RequestPart::UserPrompt {
                        content,
                        attachments,
                        ..
                    } = part
                    {
                        messages.push(user_message(content, attachments));
                    }
                }
            }
            ModelMessage::Response { parts, .. } => {
                let text: String = parts
                    .iter()
                    .map(|ResponsePart::Text { content }| content.as_str())
                    .collect();
                if !text.is_empty() {
                    messages.push(Message::assistant(text));
                }
            }
        }
    }
    messages
}
