//! SearchProvider trait definition.

use socialdesk_types::search::{SearchError, SearchResult};

/// Trait for web search backends.
///
/// Implementations live in socialdesk-infra (e.g., `TavilySearchClient`).
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Run one query, returning at most `max_results` hits.
    fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> impl std::future::Future<Output = Result<Vec<SearchResult>, SearchError>> + Send;
}
