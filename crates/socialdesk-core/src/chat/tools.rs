//! The `web_search` tool offered to the chat model.

use serde::Deserialize;
use serde_json::json;
use socialdesk_types::llm::{ToolCall, ToolDefinition};
use tracing::{debug, warn};

use crate::search::BoxSearchProvider;

pub const WEB_SEARCH: &str = "web_search";

pub fn web_search_definition() -> ToolDefinition {
    ToolDefinition {
        name: WEB_SEARCH.to_string(),
        description: "Search the web for current information about markets, competitors, \
                      trends, or anything that may have changed recently."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        }),
    }
}

#[derive(Debug, Deserialize)]
struct WebSearchArgs {
    query: String,
}

fn parse_query(arguments: &str) -> Result<String, String> {
    let args: WebSearchArgs =
        serde_json::from_str(arguments).map_err(|e| format!("invalid arguments: {e}"))?;
    let query = args.query.trim();
    if query.is_empty() {
        return Err("query must not be empty".to_string());
    }
    Ok(query.to_string())
}

/// Run one tool call and render the result as the tool message content.
///
/// Failures are reported back to the model as text, never to the client.
pub async fn execute(search: &BoxSearchProvider, call: &ToolCall, max_results: u32) -> String {
    if call.name != WEB_SEARCH {
        warn!(tool = %call.name, "model called an unknown tool");
        return json!({ "error": format!("unknown tool '{}'", call.name) }).to_string();
    }
    let query = match parse_query(&call.arguments) {
        Ok(query) => query,
        Err(e) => return json!({ "error": e }).to_string(),
    };

    match search.search(&query, max_results).await {
        Ok(results) => {
            debug!(provider = search.name(), %query, hits = results.len(), "web search done");
            json!({ "query": query, "results": results }).to_string()
        }
        Err(e) => {
            warn!(provider = search.name(), %query, error = %e, "web search failed");
            json!({ "error": format!("search failed: {e}") }).to_string()
        }
    }
}
