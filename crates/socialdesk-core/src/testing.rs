//! In-memory fakes shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use socialdesk_types::conversation::{Conversation, ConversationSummary};
use socialdesk_types::error::{RepositoryError, SessionError};
use socialdesk_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StreamEvent, ToolCall, Usage,
};
use socialdesk_types::search::{SearchError, SearchResult};
use socialdesk_types::session::{Provider, SessionUser};
use socialdesk_types::user::{BusinessProfile, User};

use crate::llm::provider::{LlmEventStream, LlmProvider};
use crate::repository::conversation::ConversationRepository;
use crate::repository::user::{BusinessRepository, UserRepository};
use crate::search::SearchProvider;
use crate::session::SessionBackend;

pub fn session_user(id: &str, name: &str) -> SessionUser {
    SessionUser {
        id: id.to_string(),
        provider_id: id.trim_start_matches("google_").to_string(),
        email: format!("{id}@example.com"),
        name: name.to_string(),
        picture: None,
        provider: Provider::Google,
    }
}

/// A session backend whose every call fails.
pub struct FailingSessionBackend;

impl SessionBackend for FailingSessionBackend {
    async fn put(&self, _: &str, _: &str, _: DateTime<Utc>) -> Result<(), SessionError> {
        Err(SessionError::Storage("connection refused".to_string()))
    }

    async fn get(&self, _: &str) -> Result<Option<String>, SessionError> {
        Err(SessionError::Storage("connection refused".to_string()))
    }

    async fn delete(&self, _: &str) -> Result<bool, SessionError> {
        Err(SessionError::Storage("connection refused".to_string()))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<DashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn count(&self) -> usize {
        self.users.len()
    }
}

impl UserRepository for InMemoryUserRepository {
    async fn get(&self, user_id: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }

    async fn create_if_missing(&self, user_id: &str, username: &str) -> Result<bool, RepositoryError> {
        if self.users.contains_key(user_id) {
            return Ok(false);
        }
        let now = Utc::now();
        self.users.insert(
            user_id.to_string(),
            User {
                id: user_id.to_string(),
                username: username.to_string(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(true)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryBusinessRepository {
    profiles: Arc<DashMap<String, BusinessProfile>>,
}

impl BusinessRepository for InMemoryBusinessRepository {
    async fn get(&self, user_id: &str) -> Result<Option<BusinessProfile>, RepositoryError> {
        Ok(self.profiles.get(user_id).map(|p| p.clone()))
    }

    async fn upsert(&self, profile: &BusinessProfile) -> Result<BusinessProfile, RepositoryError> {
        let mut stored = profile.clone();
        if let Some(existing) = self.profiles.get(&profile.user_id) {
            stored.created_at = existing.created_at;
        }
        self.profiles.insert(profile.user_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, user_id: &str) -> Result<bool, RepositoryError> {
        Ok(self.profiles.remove(user_id).is_some())
    }
}

#[derive(Default)]
struct ConversationTables {
    conversations: HashMap<String, Conversation>,
    /// (conversation_id, batch) in insertion order.
    batches: Vec<(String, String)>,
}

#[derive(Clone, Default)]
pub struct InMemoryConversationRepository {
    tables: Arc<Mutex<ConversationTables>>,
    fail_appends: Arc<AtomicBool>,
}

impl InMemoryConversationRepository {
    pub fn fail_appends(&self) {
        self.fail_appends.store(true, Ordering::SeqCst);
    }

    pub fn title_of(&self, conversation_id: &str) -> Option<String> {
        let tables = self.tables.lock().unwrap();
        tables
            .conversations
            .get(conversation_id)
            .map(|c| c.title.clone())
    }

    pub fn batch_count(&self, conversation_id: &str) -> usize {
        let tables = self.tables.lock().unwrap();
        tables
            .batches
            .iter()
            .filter(|(id, _)| id == conversation_id)
            .count()
    }
}

impl ConversationRepository for InMemoryConversationRepository {
    async fn exists(&self, conversation_id: &str) -> Result<bool, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .conversations
            .contains_key(conversation_id))
    }

    async fn owner_of(&self, conversation_id: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .conversations
            .get(conversation_id)
            .map(|c| c.user_id.clone()))
    }

    async fn create(&self, conversation: &Conversation) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.conversations.contains_key(&conversation.id) {
            return Err(RepositoryError::Conflict(format!(
                "conversation '{}' already exists",
                conversation.id
            )));
        }
        tables
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        let mut owned: Vec<&Conversation> = tables
            .conversations
            .values()
            .filter(|c| c.user_id == user_id && c.is_active)
            .collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(owned
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|c| ConversationSummary {
                id: c.id.clone(),
                title: c.title.clone(),
                created_at: c.created_at,
                updated_at: c.updated_at,
                message_count: tables.batches.iter().filter(|(id, _)| *id == c.id).count() as u32,
            })
            .collect())
    }

    async fn append_batch(
        &self,
        conversation_id: &str,
        batch: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection);
        }
        let mut tables = self.tables.lock().unwrap();
        let Some(conversation) = tables.conversations.get_mut(conversation_id) else {
            return Err(RepositoryError::NotFound);
        };
        conversation.updated_at = at;
        tables
            .batches
            .push((conversation_id.to_string(), batch.to_string()));
        Ok(())
    }

    async fn get_batches(&self, conversation_id: &str) -> Result<Vec<String>, RepositoryError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .batches
            .iter()
            .filter(|(id, _)| id == conversation_id)
            .map(|(_, batch)| batch.clone())
            .collect())
    }

    async fn transfer_owner(
        &self,
        conversation_id: &str,
        new_user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.conversations.get_mut(conversation_id) {
            Some(c) => {
                c.user_id = new_user_id.to_string();
                c.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn transfer_all(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.lock().unwrap();
        let mut moved = 0;
        for c in tables.conversations.values_mut() {
            if c.user_id == from_user_id && c.is_active {
                c.user_id = to_user_id.to_string();
                c.updated_at = at;
                moved += 1;
            }
        }
        Ok(moved)
    }
}

/// LLM provider that replays a fixed script and records every request.
pub struct ScriptedProvider {
    deltas: Vec<String>,
    completion: String,
    completion_fails: bool,
    stream_error: Option<String>,
    delay: Duration,
    tail_delay: Duration,
    usage: Option<Usage>,
    tool_call: Option<ToolCall>,
    completions: Arc<Mutex<Vec<CompletionRequest>>>,
    streams: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedProvider {
    pub fn new(deltas: Vec<&str>, completion: &str) -> Self {
        Self {
            deltas: deltas.into_iter().map(String::from).collect(),
            completion: completion.to_string(),
            completion_fails: false,
            stream_error: None,
            delay: Duration::ZERO,
            tail_delay: Duration::ZERO,
            usage: None,
            tool_call: None,
            completions: Arc::default(),
            streams: Arc::default(),
        }
    }

    pub fn failing_completion(mut self) -> Self {
        self.completion_fails = true;
        self
    }

    /// Fail the stream after all deltas were produced.
    pub fn failing_stream(mut self, message: &str) -> Self {
        self.stream_error = Some(message.to_string());
        self
    }

    /// Sleep before each delta.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sleep after the last delta, before the stream ends.
    pub fn with_tail_delay(mut self, delay: Duration) -> Self {
        self.tail_delay = delay;
        self
    }

    pub fn with_usage(mut self, input_tokens: u32, output_tokens: u32) -> Self {
        self.usage = Some(Usage {
            input_tokens,
            output_tokens,
        });
        self
    }

    /// Answer the first stream request with a single tool call instead of text.
    pub fn with_tool_call(mut self, name: &str, arguments: &str) -> Self {
        self.tool_call = Some(ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        });
        self
    }

    pub fn completions(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        self.completions.clone()
    }

    pub fn streams(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        self.streams.clone()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.completions.lock().unwrap().push(request.clone());
        if self.completion_fails {
            return Err(LlmError::Provider {
                message: "topic model unavailable".to_string(),
            });
        }
        Ok(CompletionResponse {
            id: "cmpl-test".to_string(),
            content: self.completion.clone(),
            model: request.model.clone(),
            usage: Usage::default(),
        })
    }

    fn stream(&self, request: CompletionRequest) -> LlmEventStream {
        let round = {
            let mut streams = self.streams.lock().unwrap();
            streams.push(request);
            streams.len() - 1
        };
        let deltas = self.deltas.clone();
        let stream_error = self.stream_error.clone();
        let delay = self.delay;
        let tail_delay = self.tail_delay;
        let usage = self.usage.clone();
        let tool_call = self.tool_call.clone().filter(|_| round == 0);

        Box::pin(async_stream::stream! {
            yield Ok(StreamEvent::Connected);
            if let Some(call) = tool_call {
                yield Ok(StreamEvent::ToolCall(call));
                yield Ok(StreamEvent::Done);
                return;
            }
            for text in deltas {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                yield Ok(StreamEvent::TextDelta { text });
            }
            if let Some(message) = stream_error {
                yield Err(LlmError::Stream(message));
                return;
            }
            if !tail_delay.is_zero() {
                tokio::time::sleep(tail_delay).await;
            }
            if let Some(usage) = usage {
                yield Ok(StreamEvent::Usage(usage));
            }
            yield Ok(StreamEvent::Model { name: "scripted-model".to_string() });
            yield Ok(StreamEvent::Done);
        })
    }
}

/// Search backend returning one canned hit and recording every query.
#[derive(Default)]
pub struct StaticSearch {
    fails: bool,
    queries: Arc<Mutex<Vec<(String, u32)>>>,
}

impl StaticSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.fails = true;
        self
    }

    pub fn queries(&self) -> Arc<Mutex<Vec<(String, u32)>>> {
        self.queries.clone()
    }
}

impl SearchProvider for StaticSearch {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>, SearchError> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), max_results));
        if self.fails {
            return Err(SearchError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(vec![SearchResult {
            title: "Bakery trends".to_string(),
            url: "https://news.example.com/bakery-trends".to_string(),
            content: "Sourdough keeps growing.".to_string(),
        }])
    }
}
