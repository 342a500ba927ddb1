//! HTTP layer for SocialDesk.
//!
//! Axum routes for chat, auth session lifecycle, profile and business data.
//! Callers are identified by cookies; errors use a JSON envelope.

pub mod cookies;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;

#[cfg(test)]
mod tests;
