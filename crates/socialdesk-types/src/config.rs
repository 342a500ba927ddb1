//! Server configuration types for SocialDesk.
//!
//! `ServerConfig` represents the `config.toml` in the data directory. Every
//! section and field has a default, so an empty file is a valid config.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins. Empty means any origin without credentials.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// `[llm]` section. Points at any OpenAI-compatible chat completions API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Smaller model used for conversation topic labels.
    #[serde(default = "default_topic_model")]
    pub topic_model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f64>,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o".to_string()
}

fn default_topic_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            topic_model: default_topic_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: None,
        }
    }
}

/// How model output is framed on the chat stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    /// Each line carries all text generated so far, with a fixed timestamp.
    #[default]
    Cumulative,
    /// Each line carries only the text produced since the previous line.
    Delta,
}

/// `[chat]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Minimum gap between two streamed model lines.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default)]
    pub stream_mode: StreamMode,
    /// Default page size for the conversation list.
    #[serde(default = "default_list_limit")]
    pub list_limit: i64,
}

fn default_debounce_ms() -> u64 {
    50
}

fn default_list_limit() -> i64 {
    50
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            stream_mode: StreamMode::default(),
            list_limit: default_list_limit(),
        }
    }
}

/// `[session]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_ttl_days")]
    pub ttl_days: i64,
    #[serde(default = "default_anonymous_cookie_days")]
    pub anonymous_cookie_days: i64,
    /// Mark cookies `Secure` (set when serving over HTTPS).
    #[serde(default)]
    pub secure_cookies: bool,
}

fn default_ttl_days() -> i64 {
    7
}

fn default_anonymous_cookie_days() -> i64 {
    30
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_ttl_days(),
            anonymous_cookie_days: default_anonymous_cookie_days(),
            secure_cookies: false,
        }
    }
}

/// `[search]` section. Web search is offered to the chat model only when
/// the key variable is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the search API key.
    #[serde(default = "default_search_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_search_max_results")]
    pub max_results: u32,
    /// Upper bound on search rounds within one chat turn.
    #[serde(default = "default_search_max_rounds")]
    pub max_rounds: u32,
}

fn default_search_base_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_search_api_key_env() -> String {
    "TAVILY_API_KEY".to_string()
}

fn default_search_max_results() -> u32 {
    5
}

fn default_search_max_rounds() -> u32 {
    2
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            api_key_env: default_search_api_key_env(),
            max_results: default_search_max_results(),
            max_rounds: default_search_max_rounds(),
        }
    }
}
