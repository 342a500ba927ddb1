//! LLM provider implementations.
//!
//! Contains the concrete [`LlmProvider`](socialdesk_core::llm::provider::LlmProvider)
//! used by the chat pipeline, plus a factory ([`create_provider`]) that
//! builds it from the `[llm]` section of the server config.

pub mod openai_compat;

use secrecy::SecretString;

use socialdesk_core::llm::box_provider::BoxLlmProvider;
use socialdesk_types::config::LlmConfig;
use socialdesk_types::llm::LlmError;

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Create a [`BoxLlmProvider`] from the LLM config.
///
/// # Errors
///
/// Returns [`LlmError::AuthenticationFailed`] when no API key was resolved.
pub fn create_provider(
    config: &LlmConfig,
    api_key: Option<SecretString>,
) -> Result<BoxLlmProvider, LlmError> {
    let api_key = api_key.ok_or(LlmError::AuthenticationFailed)?;
    let provider = OpenAiCompatibleProvider::new(OpenAiCompatConfig {
        provider_name: provider_name_for(&config.base_url),
        base_url: config.base_url.clone(),
        api_key,
    });
    Ok(BoxLlmProvider::new(provider))
}

/// Derive a short provider name from the base URL host.
fn provider_name_for(base_url: &str) -> String {
    if base_url.contains("api.openai.com") {
        return "openai".to_string();
    }
    base_url
        .split("://")
        .nth(1)
        .and_then(|rest| rest.split(['/', ':']).next())
        .filter(|host| !host.is_empty())
        .unwrap_or("openai-compatible")
        .to_string()
}
