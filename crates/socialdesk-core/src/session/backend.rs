//! SessionBackend trait definition.

use chrono::{DateTime, Utc};
use socialdesk_types::error::SessionError;

/// Raw key-value storage for serialized session records.
///
/// Backends store opaque payloads; they never interpret them. `expires_at` is
/// handed over so a backend may evict dead rows on its own, but `SessionStore`
/// does not rely on that.
pub trait SessionBackend: Send + Sync {
    /// Insert or overwrite a session payload.
    fn put(
        &self,
        session_id: &str,
        payload: &str,
        expires_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;

    fn get(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, SessionError>> + Send;

    /// Returns `true` if a record existed.
    fn delete(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, SessionError>> + Send;
}
