//! Tavily search API client.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use socialdesk_core::search::SearchProvider;
use socialdesk_types::search::{SearchError, SearchResult};

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: &'static str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

impl From<SearchHit> for SearchResult {
    fn from(hit: SearchHit) -> Self {
        Self {
            title: hit.title,
            url: hit.url,
            content: hit.content,
        }
    }
}

/// Does NOT derive Debug; the API key must never reach log output.
pub struct TavilySearchClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl TavilySearchClient {
    pub fn new(base_url: &str, api_key: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/search", self.base_url)
    }
}

impl SearchProvider for TavilySearchClient {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>, SearchError> {
        let body = SearchRequest {
            query,
            max_results,
            search_depth: "basic",
        };
        let response = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;

        let status = response.status();
        if matches!(status.as_u16(), 401 | 403) {
            return Err(SearchError::AuthenticationFailed);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Deserialization(e.to_string()))?;
        Ok(parsed
            .results
            .into_iter()
            .take(max_results as usize)
            .map(SearchResult::from)
            .collect())
    }
}
