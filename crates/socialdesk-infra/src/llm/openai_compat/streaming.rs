//! SSE streaming for the chat completions endpoint.
//!
//! The server sends one `data:` line per `chat.completion.chunk` and ends
//! with `data: [DONE]`. With `stream_options.include_usage` set, the last
//! chunk before the sentinel carries usage and no choices.
//!
//! Tool calls arrive as fragments keyed by index; they are assembled here and
//! reported as whole [`StreamEvent::ToolCall`]s just before `Done`.

use std::collections::BTreeMap;

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};

use socialdesk_core::llm::provider::LlmEventStream;
use socialdesk_types::llm::{LlmError, StreamEvent, ToolCall, Usage};

use super::error_for_status;
use super::types::{ChatCompletionChunk, ChatCompletionRequest, ChunkToolCall};

const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Default)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

/// Streamed tool-call fragments, merged per call index.
#[derive(Debug, Default)]
pub(crate) struct ToolCallAccumulator {
    calls: BTreeMap<u32, PendingCall>,
}

impl ToolCallAccumulator {
    fn absorb(&mut self, fragment: ChunkToolCall) {
        let pending = self.calls.entry(fragment.index).or_default();
        if let Some(id) = fragment.id.filter(|id| !id.is_empty()) {
            pending.id = id;
        }
        if let Some(function) = fragment.function {
            if let Some(name) = function.name.filter(|n| !n.is_empty()) {
                pending.name = name;
            }
            if let Some(arguments) = function.arguments {
                pending.arguments.push_str(&arguments);
            }
        }
    }

    /// Completed calls in index order. Fragments that never got a name are
    /// dropped.
    pub(crate) fn finish(&mut self) -> Vec<ToolCall> {
        std::mem::take(&mut self.calls)
            .into_iter()
            .filter(|(_, call)| !call.name.is_empty())
            .map(|(index, call)| ToolCall {
                id: if call.id.is_empty() {
                    format!("call_{index}")
                } else {
                    call.id
                },
                name: call.name,
                arguments: call.arguments,
            })
            .collect()
    }
}

/// Events produced by a single chunk, in emission order.
///
/// `model_seen` tracks whether the model name was already reported; tool
/// call fragments are folded into `calls`.
pub(crate) fn chunk_events(
    chunk: ChatCompletionChunk,
    model_seen: &mut bool,
    calls: &mut ToolCallAccumulator,
) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    if !*model_seen {
        if let Some(name) = chunk.model.filter(|m| !m.is_empty()) {
            *model_seen = true;
            events.push(StreamEvent::Model { name });
        }
    }
    for choice in chunk.choices {
        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
            events.push(StreamEvent::TextDelta { text });
        }
        for fragment in choice.delta.tool_calls {
            calls.absorb(fragment);
        }
    }
    if let Some(usage) = chunk.usage {
        events.push(StreamEvent::Usage(Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        }));
    }
    events
}

/// Open a streaming completion and map it to provider-agnostic events.
pub fn create_stream(
    client: reqwest::Client,
    url: String,
    body: ChatCompletionRequest,
    api_key: SecretString,
) -> LlmEventStream {
    Box::pin(async_stream::try_stream! {
        let response = client
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider { message: e.to_string() })?;

        let response = error_for_status(response).await?;
        yield StreamEvent::Connected;

        let mut events = response.bytes_stream().eventsource();
        let mut model_seen = false;
        let mut calls = ToolCallAccumulator::default();
        let mut finished = false;

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| LlmError::Stream(e.to_string()))?;
            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == DONE_SENTINEL {
                finished = true;
                break;
            }
            let chunk: ChatCompletionChunk = serde_json::from_str(data)
                .map_err(|e| LlmError::Deserialization(e.to_string()))?;
            for mapped in chunk_events(chunk, &mut model_seen, &mut calls) {
                yield mapped;
            }
        }

        if !finished {
            tracing::debug!("completion stream closed without [DONE]");
        }
        for call in calls.finish() {
            yield StreamEvent::ToolCall(call);
        }
        yield StreamEvent::Done;
    })
}
