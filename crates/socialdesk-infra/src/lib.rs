//! Infrastructure layer for SocialDesk.
//!
//! Contains implementations of the traits defined in `socialdesk-core`:
//! SQLite storage for users, conversations, sessions and business profiles,
//! the OpenAI-compatible LLM provider, the Tavily web search client, config
//! loading, and data directory resolution.

pub mod config;
pub mod filesystem;
pub mod llm;
pub mod search;
pub mod sqlite;
