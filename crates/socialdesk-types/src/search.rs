//! Web search result shapes shared by the search client and the chat tool.

use serde::{Deserialize, Serialize};

/// One hit returned by a web search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    /// Extracted snippet or page summary.
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(String),

    #[error("search API rejected the key")]
    AuthenticationFailed,

    #[error("search returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unreadable search response: {0}")]
    Deserialization(String),
}
