//! Web search backends.
//!
//! [`create_search_provider`] builds the backend from the `[search]` config
//! section. Without a key there is no backend and the chat model is not
//! offered the `web_search` tool.

pub mod tavily;

use secrecy::SecretString;

use socialdesk_core::search::BoxSearchProvider;
use socialdesk_types::config::SearchConfig;

use self::tavily::TavilySearchClient;

pub fn create_search_provider(
    config: &SearchConfig,
    api_key: Option<SecretString>,
) -> Option<BoxSearchProvider> {
    let api_key = api_key?;
    Some(BoxSearchProvider::new(TavilySearchClient::new(
        &config.base_url,
        api_key,
    )))
}
