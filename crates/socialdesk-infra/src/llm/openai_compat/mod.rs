//! OpenAI-compatible LLM provider.
//!
//! Talks to any `/chat/completions` endpoint that speaks the OpenAI wire
//! format, which covers OpenAI itself and most hosted gateways.

pub mod config;
pub mod streaming;
pub mod types;

use secrecy::{ExposeSecret, SecretString};

use socialdesk_core::llm::provider::{LlmEventStream, LlmProvider};
use socialdesk_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};

use self::config::OpenAiCompatConfig;
use self::types::{ChatCompletionRequest, ChatCompletionResponse};

/// Map a non-success HTTP status to an [`LlmError`].
pub(crate) async fn error_for_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let retry_after_ms = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(|secs| secs * 1000);
    let body = response.text().await.unwrap_or_default();

    Err(match status.as_u16() {
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited { retry_after_ms },
        400 | 404 | 422 => LlmError::InvalidRequest(format!("HTTP {status}: {body}")),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    })
}

/// Provider for any OpenAI-compatible API.
///
/// Does NOT derive Debug; the API key must never reach log output.
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    provider_name: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            provider_name: config.provider_name,
        }
    }

    /// Create an OpenAI provider.
    pub fn openai(api_key: SecretString) -> Self {
        Self::new(config::openai_defaults(api_key))
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = ChatCompletionRequest::from_request(request, false);

        let response = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: e.to_string(),
            })?;

        let response = error_for_status(response).await?;
        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        let usage = parsed
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: parsed.id,
            content,
            model: parsed.model,
            usage,
        })
    }

    fn stream(&self, request: CompletionRequest) -> LlmEventStream {
        let body = ChatCompletionRequest::from_request(&request, true);
        tracing::debug!(
            provider = %self.provider_name,
            model = %request.model,
            messages = body.messages.len(),
            "opening completion stream"
        );
        streaming::create_stream(self.client.clone(), self.url(), body, self.api_key.clone())
    }
}
