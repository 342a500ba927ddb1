//! Login session records.
//!
//! A session is created by the OAuth collaborator after a successful login and
//! looked up on every authenticated request. Payloads are validated at the
//! store boundary: a record that fails [`SessionUser::validate`] is treated
//! as corrupt and never reaches business logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::error::SessionError;

/// OAuth provider that authenticated the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Facebook,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Google => write!(f, "google"),
            Provider::Facebook => write!(f, "facebook"),
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "facebook" => Ok(Provider::Facebook),
            other => Err(format!("invalid provider: '{other}'")),
        }
    }
}

/// The authenticated user carried by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Stable user id (also the `users.id` primary key).
    pub id: String,
    /// Subject id issued by the OAuth provider.
    pub provider_id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub provider: Provider,
}

impl SessionUser {
    /// Check that every required field is present and non-blank.
    pub fn validate(&self) -> Result<(), SessionError> {
        let required = [
            ("id", &self.id),
            ("provider_id", &self.provider_id),
            ("email", &self.email),
            ("name", &self.name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SessionError::Validation(format!("`{field}` must not be empty")));
            }
        }
        Ok(())
    }

    /// Parse and validate a loosely-typed payload (e.g. from an OAuth callback).
    pub fn from_value(value: serde_json::Value) -> Result<Self, SessionError> {
        let user: SessionUser = serde_json::from_value(value)
            .map_err(|e| SessionError::Validation(e.to_string()))?;
        user.validate()?;
        Ok(user)
    }

    /// First word of the display name, used as the stored username.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

/// A stored session: the user payload plus its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(flatten)]
    pub user: SessionUser,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Expiry is inclusive: a record whose `expires_at` equals `now` is dead.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
