//! SQLite session backend.
//!
//! Stores opaque session payloads keyed by session id. Expiry is judged by
//! `SessionStore` from the payload; `expires_at` is kept as a column so
//! stale rows can be purged in bulk.

use chrono::{DateTime, Utc};
use socialdesk_core::session::SessionBackend;
use socialdesk_types::error::SessionError;
use sqlx::Row;

use super::format_datetime;
use super::pool::DatabasePool;

fn storage_error(e: sqlx::Error) -> SessionError {
    SessionError::Storage(e.to_string())
}

/// SQLite-backed implementation of `SessionBackend`.
#[derive(Clone)]
pub struct SqliteSessionBackend {
    pool: DatabasePool,
}

impl SqliteSessionBackend {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Delete every session that expired at or before `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(format_datetime(&now))
            .execute(&self.pool.writer)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected())
    }
}

impl SessionBackend for SqliteSessionBackend {
    async fn put(
        &self,
        session_id: &str,
        payload: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        sqlx::query(
            r#"INSERT INTO sessions (session_id, payload, expires_at) VALUES (?, ?, ?)
               ON CONFLICT(session_id) DO UPDATE SET
                   payload = excluded.payload,
                   expires_at = excluded.expires_at"#,
        )
        .bind(session_id)
        .bind(payload)
        .bind(format_datetime(&expires_at))
        .execute(&self.pool.writer)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<String>, SessionError> {
        let row = sqlx::query("SELECT payload FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(storage_error)?;

        row.map(|r| r.try_get("payload").map_err(storage_error))
            .transpose()
    }

    async fn delete(&self, session_id: &str) -> Result<bool, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool.writer)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }
}
