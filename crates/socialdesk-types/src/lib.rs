//! Shared domain types for SocialDesk.
//!
//! This crate contains the core domain types used across the SocialDesk backend:
//! users, sessions, conversations, stored message batches, attachments, LLM
//! request shapes, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, url.

pub mod attachment;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod message;
pub mod search;
pub mod session;
pub mod user;
