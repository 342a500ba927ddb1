//! In-process session backend.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use socialdesk_types::error::SessionError;

use super::backend::SessionBackend;

/// Session backend held in a concurrent map. Contents are lost on restart.
#[derive(Default)]
pub struct MemorySessionBackend {
    entries: DashMap<String, (String, DateTime<Utc>)>,
}

impl MemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionBackend for MemorySessionBackend {
    async fn put(
        &self,
        session_id: &str,
        payload: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.entries
            .insert(session_id.to_string(), (payload.to_string(), expires_at));
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<String>, SessionError> {
        Ok(self
            .entries
            .get(session_id)
            .map(|entry| entry.value().0.clone()))
    }

    async fn delete(&self, session_id: &str) -> Result<bool, SessionError> {
        Ok(self.entries.remove(session_id).is_some())
    }
}
