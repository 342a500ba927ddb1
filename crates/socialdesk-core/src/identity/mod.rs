//! Per-request caller identity: authenticated via session, or anonymous via
//! a long-lived cookie.

pub mod resolver;

pub use resolver::{Identity, IdentityResolver, RequestCookies};
