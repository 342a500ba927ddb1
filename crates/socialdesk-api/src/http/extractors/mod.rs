//! Request extractors: caller identity and the chat form body.

pub mod auth;
pub mod caller;
pub mod chat_form;
