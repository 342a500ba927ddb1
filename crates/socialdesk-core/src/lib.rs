//! Business logic and repository trait definitions for SocialDesk.
//!
//! This crate defines the "ports" (repository and provider traits) that the
//! infrastructure layer implements, plus the services built on them: session
//! store, identity resolver, conversation store, business profiles, the web
//! search port, and the chat streaming pipeline. It depends only on
//! `socialdesk-types` -- never on `socialdesk-infra` or any database/IO crate.

pub mod business;
pub mod chat;
pub mod conversation;
pub mod identity;
pub mod llm;
pub mod repository;
pub mod search;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
