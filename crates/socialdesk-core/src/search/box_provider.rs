//! BoxSearchProvider -- object-safe dynamic dispatch wrapper for SearchProvider.

use std::future::Future;
use std::pin::Pin;

use socialdesk_types::search::{SearchError, SearchResult};

use super::provider::SearchProvider;

type SearchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<SearchResult>, SearchError>> + Send + 'a>>;

/// Object-safe version of [`SearchProvider`] with boxed futures.
pub trait SearchProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn search_boxed<'a>(&'a self, query: &'a str, max_results: u32) -> SearchFuture<'a>;
}

impl<T: SearchProvider> SearchProviderDyn for T {
    fn name(&self) -> &str {
        SearchProvider::name(self)
    }

    fn search_boxed<'a>(&'a self, query: &'a str, max_results: u32) -> SearchFuture<'a> {
        Box::pin(self.search(query, max_results))
    }
}

/// Type-erased search backend, chosen at startup.
pub struct BoxSearchProvider {
    inner: Box<dyn SearchProviderDyn + Send + Sync>,
}

impl BoxSearchProvider {
    pub fn new<T: SearchProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.inner.search_boxed(query, max_results).await
    }
}
