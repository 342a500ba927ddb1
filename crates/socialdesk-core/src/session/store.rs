//! Session store with validation, lazy expiry, and in-memory failover.
//!
//! Every read checks `expires_at` before the payload is trusted. Expired and
//! corrupt records are deleted on the read that finds them; nothing sweeps
//! idle sessions in the background.
//!
//! If the primary backend fails, the store logs once, switches to an
//! in-process map for the rest of the process lifetime, and keeps serving.
//! Sessions that only existed in the primary then read as absent.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use socialdesk_types::error::SessionError;
use socialdesk_types::session::{SessionRecord, SessionUser};
use tracing::{debug, warn};
use uuid::Uuid;

use super::backend::SessionBackend;
use super::memory::MemorySessionBackend;

/// Generate an opaque session id with 244 bits of randomness.
fn new_session_id() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub struct SessionStore<B: SessionBackend> {
    primary: B,
    fallback: MemorySessionBackend,
    degraded: AtomicBool,
}

impl<B: SessionBackend> SessionStore<B> {
    pub fn new(primary: B) -> Self {
        Self {
            primary,
            fallback: MemorySessionBackend::new(),
            degraded: AtomicBool::new(false),
        }
    }

    /// Whether the store has failed over to in-process storage.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    fn degrade(&self, op: &str, err: &SessionError) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            warn!(operation = op, error = %err, "session backend failed, falling back to in-memory sessions");
        }
    }

    async fn put_raw(&self, session_id: &str, payload: &str, expires_at: DateTime<Utc>) {
        if !self.is_degraded() {
            match self.primary.put(session_id, payload, expires_at).await {
                Ok(()) => return,
                Err(e) => self.degrade("put", &e),
            }
        }
        if let Err(e) = self.fallback.put(session_id, payload, expires_at).await {
            warn!(error = %e, "in-memory session put failed");
        }
    }

    async fn get_raw(&self, session_id: &str) -> Option<String> {
        if !self.is_degraded() {
            match self.primary.get(session_id).await {
                Ok(found) => return found,
                Err(e) => self.degrade("get", &e),
            }
        }
        self.fallback.get(session_id).await.ok().flatten()
    }

    async fn delete_raw(&self, session_id: &str) -> bool {
        if !self.is_degraded() {
            match self.primary.delete(session_id).await {
                Ok(existed) => return existed,
                Err(e) => self.degrade("delete", &e),
            }
        }
        self.fallback.delete(session_id).await.unwrap_or(false)
    }

    /// Create a session for `user` that lives for `ttl`, returning its id.
    ///
    /// A negative `ttl` is treated as zero (the session is born expired).
    pub async fn create(&self, user: SessionUser, ttl: TimeDelta) -> Result<String, SessionError> {
        user.validate()?;

        let now = Utc::now();
        let record = SessionRecord {
            user,
            created_at: now,
            expires_at: now + ttl.max(TimeDelta::zero()),
        };
        let payload =
            serde_json::to_string(&record).map_err(|e| SessionError::Validation(e.to_string()))?;

        let session_id = new_session_id();
        self.put_raw(&session_id, &payload, record.expires_at).await;
        debug!(user_id = %record.user.id, "session created");
        Ok(session_id)
    }

    /// Look up a live session.
    ///
    /// Missing, corrupt, and expired sessions all return `None`; the latter
    /// two are deleted as a side effect.
    pub async fn get(&self, session_id: &str) -> Option<SessionRecord> {
        let raw = self.get_raw(session_id).await?;

        let record = match serde_json::from_str::<SessionRecord>(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "corrupt session payload, deleting");
                self.delete_raw(session_id).await;
                return None;
            }
        };
        if let Err(e) = record.user.validate() {
            warn!(error = %e, "invalid session payload, deleting");
            self.delete_raw(session_id).await;
            return None;
        }
        if record.is_expired_at(Utc::now()) {
            debug!(user_id = %record.user.id, "session expired, deleting");
            self.delete_raw(session_id).await;
            return None;
        }

        Some(record)
    }

    /// Delete a session. Idempotent; returns whether a record existed.
    pub async fn delete(&self, session_id: &str) -> bool {
        self.delete_raw(session_id).await
    }

    /// Push expiry to `now + ttl` for a live session.
    ///
    /// Returns `false` if the session is missing, corrupt, or already expired.
    pub async fn refresh(&self, session_id: &str, ttl: TimeDelta) -> bool {
        let Some(mut record) = self.get(session_id).await else {
            return false;
        };
        record.expires_at = Utc::now() + ttl.max(TimeDelta::zero());
        match serde_json::to_string(&record) {
            Ok(payload) => {
                self.put_raw(session_id, &payload, record.expires_at).await;
                true
            }
            Err(e) => {
                warn!(error = %e, "failed to serialize refreshed session");
                false
            }
        }
    }
}
