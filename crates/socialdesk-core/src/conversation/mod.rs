//! Conversation ownership and message history.

pub mod store;

pub use store::ConversationStore;
