//! Application state wiring all services together.
//!
//! Services in `socialdesk-core` are generic over repository and backend
//! traits; AppState pins them to the concrete SQLite implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{TimeDelta, Utc};
use socialdesk_core::business::BusinessService;
use socialdesk_core::chat::{ChatPipeline, PipelineSettings};
use socialdesk_core::conversation::ConversationStore;
use socialdesk_core::identity::IdentityResolver;
use socialdesk_core::llm::box_provider::BoxLlmProvider;
use socialdesk_core::search::BoxSearchProvider;
use socialdesk_core::session::SessionStore;
use socialdesk_infra::config::{resolve_api_key, resolve_search_key};
use socialdesk_infra::filesystem::ensure_data_dir;
use socialdesk_infra::llm::create_provider;
use socialdesk_infra::search::create_search_provider;
use socialdesk_infra::sqlite::business::SqliteBusinessRepository;
use socialdesk_infra::sqlite::conversation::SqliteConversationRepository;
use socialdesk_infra::sqlite::pool::DatabasePool;
use socialdesk_infra::sqlite::session::SqliteSessionBackend;
use socialdesk_infra::sqlite::user::SqliteUserRepository;
use socialdesk_types::config::ServerConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteSessionStore = SessionStore<SqliteSessionBackend>;

pub type ConcreteConversationStore = ConversationStore<SqliteConversationRepository>;

pub type ConcreteIdentityResolver =
    IdentityResolver<SqliteUserRepository, SqliteConversationRepository, SqliteSessionBackend>;

pub type ConcreteBusinessService = BusinessService<SqliteBusinessRepository>;

pub type ConcreteChatPipeline = ChatPipeline<SqliteConversationRepository>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub sessions: Arc<ConcreteSessionStore>,
    pub conversations: Arc<ConcreteConversationStore>,
    pub identity: Arc<ConcreteIdentityResolver>,
    pub business: Arc<ConcreteBusinessService>,
    pub chat: Arc<ConcreteChatPipeline>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to DB, build the model
    /// provider and the optional search backend, wire services.
    pub async fn init(data_dir: PathBuf, config: ServerConfig) -> anyhow::Result<Self> {
        let api_key = resolve_api_key(&config.llm);
        let provider = create_provider(&config.llm, api_key).with_context(|| {
            format!(
                "no model API key: set the {} environment variable",
                config.llm.api_key_env
            )
        })?;
        let search = create_search_provider(&config.search, resolve_search_key(&config.search));
        if search.is_none() {
            tracing::info!(
                key_env = %config.search.api_key_env,
                "web search disabled: no API key"
            );
        }
        Self::with_provider(data_dir, config, provider, search).await
    }

    /// Wire services around an already constructed model provider.
    pub async fn with_provider(
        data_dir: PathBuf,
        config: ServerConfig,
        provider: BoxLlmProvider,
        search: Option<BoxSearchProvider>,
    ) -> anyhow::Result<Self> {
        ensure_data_dir(&data_dir)
            .await
            .with_context(|| format!("cannot create data directory {}", data_dir.display()))?;

        let db_pool = DatabasePool::open(&data_dir)
            .await
            .context("cannot open database")?;

        let session_backend = SqliteSessionBackend::new(db_pool.clone());
        match session_backend.purge_expired(Utc::now()).await {
            Ok(0) => {}
            Ok(purged) => tracing::info!(purged, "removed expired sessions"),
            Err(e) => tracing::warn!(error = %e, "failed to purge expired sessions"),
        }
        let sessions = Arc::new(SessionStore::new(session_backend));

        let conversations = Arc::new(ConversationStore::new(
            SqliteConversationRepository::new(db_pool.clone()),
            config.chat.list_limit,
        ));

        let identity = IdentityResolver::new(
            SqliteUserRepository::new(db_pool.clone()),
            sessions.clone(),
            conversations.clone(),
        );

        let business = BusinessService::new(SqliteBusinessRepository::new(db_pool.clone()));

        let settings = PipelineSettings {
            chat_model: config.llm.chat_model.clone(),
            topic_model: config.llm.topic_model.clone(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            debounce: Duration::from_millis(config.chat.debounce_ms),
            stream_mode: config.chat.stream_mode,
        };
        tracing::info!(
            provider = provider.name(),
            chat_model = %settings.chat_model,
            stream_mode = ?settings.stream_mode,
            search = search.as_ref().map(|s| s.name()),
            "chat pipeline ready"
        );
        let mut chat = ChatPipeline::new(conversations.clone(), Arc::new(provider), settings);
        if let Some(search) = search {
            chat = chat.with_search(
                search,
                config.search.max_results,
                config.search.max_rounds,
            );
        }

        Ok(Self {
            config: Arc::new(config),
            sessions,
            conversations,
            identity: Arc::new(identity),
            business: Arc::new(business),
            chat: Arc::new(chat),
            data_dir,
            db_pool,
        })
    }

    /// Session lifetime from config.
    pub fn session_ttl(&self) -> TimeDelta {
        TimeDelta::days(self.config.session.ttl_days)
    }
}
