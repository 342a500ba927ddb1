//! HTTP request handlers.

pub mod auth;
pub mod business;
pub mod chat;
pub mod profile;
