//! Chat streaming pipeline.
//!
//! One turn runs as its own task and walks
//! `Start -> CreateIfMissing -> HistoryLoaded -> Streaming -> Persisting -> Done`,
//! with `Error` reachable from every state. Lines are pushed into a bounded
//! channel that backs the HTTP response body; a closed channel means the
//! client went away.
//!
//! What reached the client (`lines_flushed`) and what reached storage
//! (`persisted`) are tracked separately in [`TurnOutcome`] so partial
//! failures can be reasoned about after the fact.
//!
//! When a search backend is attached, the model may answer with `web_search`
//! calls. Each call is executed, its result appended as a tool message, and
//! the stream reopened, up to `max_rounds` times per turn. Only the user
//! prompt and the final model text are stored.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use socialdesk_types::attachment::Attachment;
use socialdesk_types::config::StreamMode;
use socialdesk_types::error::ChatError;
use socialdesk_types::llm::{CompletionRequest, Message, StreamEvent};
use socialdesk_types::message::{ChatLine, ModelMessage};
use socialdesk_types::user::BusinessProfile;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::topic::generate_topic;
use super::{prompt, tools};
use crate::conversation::ConversationStore;
use crate::llm::box_provider::BoxLlmProvider;
use crate::repository::conversation::ConversationRepository;
use crate::search::BoxSearchProvider;

/// Item type of the per-turn channel. An `Err` is always the last item.
pub type ChatStreamItem = Result<ChatLine, ChatError>;

/// Buffered lines between the pipeline task and the response body.
const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub chat_model: String,
    pub topic_model: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    /// Minimum gap between two model lines on the wire.
    pub debounce: Duration,
    pub stream_mode: StreamMode,
}

/// An authorized turn, ready to run.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub conversation_id: String,
    pub user_id: String,
    pub prompt: String,
    pub attachments: Vec<Attachment>,
    pub business: Option<BusinessProfile>,
    /// The conversation row does not exist yet and must be created.
    pub is_new: bool,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Start,
    CreateIfMissing,
    HistoryLoaded,
    Streaming,
    Persisting,
    Done,
    Error,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub state: TurnState,
    pub lines_flushed: usize,
    pub model_chars: usize,
    pub persisted: bool,
    pub disconnected: bool,
    pub tool_rounds: u32,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TurnOutcome {
    fn new() -> Self {
        Self {
            state: TurnState::Start,
            lines_flushed: 0,
            model_chars: 0,
            persisted: false,
            disconnected: false,
            tool_rounds: 0,
            input_tokens: 0,
            output_tokens: 0,
        }
    }
}

/// Accumulated model text plus the framing of unflushed output.
struct ModelOutput {
    mode: StreamMode,
    started_at: DateTime<Utc>,
    text: String,
    flushed: usize,
}

impl ModelOutput {
    fn new(mode: StreamMode) -> Self {
        Self {
            mode,
            started_at: Utc::now(),
            text: String::new(),
            flushed: 0,
        }
    }

    fn push(&mut self, delta: &str) {
        self.text.push_str(delta);
    }

    fn has_pending(&self) -> bool {
        self.flushed < self.text.len()
    }

    /// Next line to send, or `None` if nothing new arrived since the last one.
    fn take_line(&mut self) -> Option<ChatLine> {
        if !self.has_pending() {
            return None;
        }
        let line = match self.mode {
            StreamMode::Cumulative => ChatLine::model(self.text.clone(), self.started_at),
            StreamMode::Delta => ChatLine::model(&self.text[self.flushed..], Utc::now()),
        };
        self.flushed = self.text.len();
        Some(line)
    }
}

struct WebSearch {
    provider: BoxSearchProvider,
    max_results: u32,
    max_rounds: u32,
}

pub struct ChatPipeline<C: ConversationRepository> {
    conversations: Arc<ConversationStore<C>>,
    provider: Arc<BoxLlmProvider>,
    settings: PipelineSettings,
    search: Option<WebSearch>,
}

impl<C: ConversationRepository + 'static> ChatPipeline<C> {
    pub fn new(
        conversations: Arc<ConversationStore<C>>,
        provider: Arc<BoxLlmProvider>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            conversations,
            provider,
            settings,
            search: None,
        }
    }

    /// Offer the `web_search` tool to the chat model.
    pub fn with_search(
        mut self,
        provider: BoxSearchProvider,
        max_results: u32,
        max_rounds: u32,
    ) -> Self {
        self.search = Some(WebSearch {
            provider,
            max_results,
            max_rounds,
        });
        self
    }

    /// Validate a turn and check ownership before any byte is streamed.
    ///
    /// A conversation owned by someone else reads as `NotFound`; an unknown
    /// id becomes a new conversation owned by the caller.
    pub async fn prepare(
        &self,
        conversation_id: &str,
        user_id: &str,
        prompt: String,
        attachments: Vec<Attachment>,
        business: Option<BusinessProfile>,
    ) -> Result<ChatTurn, ChatError> {
        if prompt.trim().is_empty() {
            return Err(ChatError::EmptyPrompt);
        }
        let is_new = match self.conversations.owner_of(conversation_id).await? {
            None => true,
            Some(owner) if owner == user_id => false,
            Some(_) => return Err(ChatError::NotFound),
        };
        Ok(ChatTurn {
            conversation_id: conversation_id.to_string(),
            user_id: user_id.to_string(),
            prompt,
            attachments,
            business,
            is_new,
            received_at: Utc::now(),
        })
    }

    /// Run the turn on its own task and hand back the line receiver.
    pub fn spawn(self: &Arc<Self>, turn: ChatTurn) -> mpsc::Receiver<ChatStreamItem> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            pipeline.run(turn, tx).await;
        });
        rx
    }

    /// Drive one turn to completion, sending lines into `tx`.
    pub async fn run(&self, turn: ChatTurn, tx: mpsc::Sender<ChatStreamItem>) -> TurnOutcome {
        let mut outcome = TurnOutcome::new();

        if let Err(e) = self.drive(&turn, &tx, &mut outcome).await {
            warn!(
                conversation_id = %turn.conversation_id,
                failed_in = ?outcome.state,
                error = %e,
                "chat turn failed"
            );
            outcome.state = TurnState::Error;
            // The client may already be gone; nothing else to do then.
            let _ = tx.send(Err(e)).await;
        }

        info!(
            conversation_id = %turn.conversation_id,
            state = ?outcome.state,
            lines_flushed = outcome.lines_flushed,
            model_chars = outcome.model_chars,
            persisted = outcome.persisted,
            disconnected = outcome.disconnected,
            tool_rounds = outcome.tool_rounds,
            input_tokens = outcome.input_tokens,
            output_tokens = outcome.output_tokens,
            "chat turn finished"
        );
        outcome
    }

    fn enter(&self, outcome: &mut TurnOutcome, next: TurnState, conversation_id: &str) {
        debug!(conversation_id, from = ?outcome.state, to = ?next, "turn state");
        outcome.state = next;
    }

    async fn emit(
        &self,
        tx: &mpsc::Sender<ChatStreamItem>,
        line: ChatLine,
        outcome: &mut TurnOutcome,
    ) -> bool {
        if tx.send(Ok(line)).await.is_err() {
            outcome.disconnected = true;
            return false;
        }
        outcome.lines_flushed += 1;
        true
    }

    fn build_request(&self, turn: &ChatTurn, history: &[ModelMessage]) -> CompletionRequest {
        let mut messages = prompt::history_messages(history);
        messages.push(prompt::user_message(&turn.prompt, &turn.attachments));
        let web_search = self.search.as_ref().is_some_and(|s| s.max_rounds > 0);
        CompletionRequest {
            model: self.settings.chat_model.clone(),
            messages,
            system: Some(prompt::system_prompt(
                turn.received_at.date_naive(),
                turn.business.as_ref(),
                web_search,
            )),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            stream: true,
            tools: if web_search {
                vec![tools::web_search_definition()]
            } else {
                Vec::new()
            },
        }
    }

    fn turn_messages(
        &self,
        turn: &ChatTurn,
        output: &ModelOutput,
        model_name: Option<String>,
    ) -> [ModelMessage; 2] {
        [
            ModelMessage::user_prompt(
                turn.prompt.clone(),
                turn.received_at,
                turn.attachments.clone(),
            ),
            ModelMessage::model_text(output.text.clone(), model_name, output.started_at),
        ]
    }

    async fn drive(
        &self,
        turn: &ChatTurn,
        tx: &mpsc::Sender<ChatStreamItem>,
        outcome: &mut TurnOutcome,
    ) -> Result<(), ChatError> {
        let id = turn.conversation_id.as_str();

        // Echo first so the client sees its own message before any model call.
        let echo = ChatLine::user(turn.prompt.clone(), turn.received_at);
        if !self.emit(tx, echo, outcome).await {
            self.enter(outcome, TurnState::Done, id);
            return Ok(());
        }

        if turn.is_new {
            self.enter(outcome, TurnState::CreateIfMissing, id);
            let title = generate_topic(&self.provider, &turn.prompt, &self.settings.topic_model)
                .await
                .map_err(|e| ChatError::Topic(e.to_string()))?;
            self.conversations
                .create_with_id(id, &turn.user_id, &title)
                .await?;
        }

        self.enter(outcome, TurnState::HistoryLoaded, id);
        let history = if turn.is_new {
            Vec::new()
        } else {
            self.conversations.get_history(id).await?
        };

        self.enter(outcome, TurnState::Streaming, id);
        let mut request = self.build_request(turn, &history);
        let mut output = ModelOutput::new(self.settings.stream_mode);
        let mut model_name = None;
        let mut last_flush: Option<Instant> = None;

        'rounds: loop {
            let mut stream = self.provider.stream(request.clone());
            let round_start = output.text.len();
            let mut calls = Vec::new();

            loop {
                // Buffered text goes out once the debounce window closes, even
                // if the model stalls.
                let flush_at =
                    last_flush.map_or_else(Instant::now, |t| t + self.settings.debounce);
                let event = tokio::select! {
                    biased;
                    _ = tx.closed() => {
                        outcome.disconnected = true;
                        break 'rounds;
                    }
                    _ = tokio::time::sleep_until(flush_at), if output.has_pending() => {
                        if let Some(line) = output.take_line() {
                            if !self.emit(tx, line, outcome).await {
                                break 'rounds;
                            }
                            last_flush = Some(Instant::now());
                        }
                        continue;
                    }
                    event = stream.next() => event,
                };

                match event {
                    Some(Ok(StreamEvent::TextDelta { text })) => {
                        output.push(&text);
                        outcome.model_chars += text.len();
                        let due = last_flush.is_none_or(|t| t.elapsed() >= self.settings.debounce);
                        if due {
                            if let Some(line) = output.take_line() {
                                if !self.emit(tx, line, outcome).await {
                                    break 'rounds;
                                }
                                last_flush = Some(Instant::now());
                            }
                        }
                    }
                    Some(Ok(StreamEvent::Model { name })) => model_name = Some(name),
                    Some(Ok(StreamEvent::Usage(usage))) => {
                        outcome.input_tokens += usage.input_tokens;
                        outcome.output_tokens += usage.output_tokens;
                    }
                    Some(Ok(StreamEvent::ToolCall(call))) => calls.push(call),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                }
            }

            if calls.is_empty() {
                break;
            }
            let Some(search) = &self.search else {
                warn!(
                    conversation_id = id,
                    calls = calls.len(),
                    "tool calls without a search backend"
                );
                break;
            };
            if outcome.tool_rounds >= search.max_rounds {
                warn!(
                    conversation_id = id,
                    rounds = outcome.tool_rounds,
                    "tool round limit reached"
                );
                break;
            }

            outcome.tool_rounds += 1;
            debug!(
                conversation_id = id,
                round = outcome.tool_rounds,
                calls = calls.len(),
                "tool round"
            );
            let round_text = output.text[round_start..].to_string();
            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                let content = tools::execute(&search.provider, call, search.max_results).await;
                results.push(Message::tool_result(call.id.clone(), content));
            }
            request
                .messages
                .push(Message::assistant_tool_calls(round_text, calls));
            request.messages.extend(results);
            // Last allowed round: the model has to answer in text.
            if outcome.tool_rounds >= search.max_rounds {
                request.tools.clear();
            }
        }

        if outcome.disconnected {
            if output.text.is_empty() {
                debug!(conversation_id = id, "client left before any model output");
            } else {
                self.enter(outcome, TurnState::Persisting, id);
                let messages = self.turn_messages(turn, &output, model_name);
                match self.conversations.append_messages(id, &messages).await {
                    Ok(()) => outcome.persisted = true,
                    Err(e) => {
                        warn!(conversation_id = id, error = %e, "failed to persist partial turn")
                    }
                }
            }
            self.enter(outcome, TurnState::Done, id);
            return Ok(());
        }

        if let Some(line) = output.take_line() {
            self.emit(tx, line, outcome).await;
        }

        self.enter(outcome, TurnState::Persisting, id);
        let messages = self.turn_messages(turn, &output, model_name);
        self.conversations
            .append_messages(id, &messages)
            .await
            .map_err(|e| ChatError::Persist(e.to_string()))?;
        outcome.persisted = true;

        self.enter(outcome, TurnState::Done, id);
        Ok(())
    }
}
