//! User and business-profile types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of every anonymous user id (`anon_<uuid>`).
pub const ANONYMOUS_ID_PREFIX: &str = "anon_";

/// A user row. Ids are opaque strings: provider-derived for authenticated
/// users, `anon_<uuid>` for anonymous ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mint a fresh anonymous user id.
pub fn new_anonymous_id() -> String {
    format!("{ANONYMOUS_ID_PREFIX}{}", uuid::Uuid::new_v4())
}

/// Whether a client-supplied value has the shape of a minted anonymous id.
///
/// Rejecting anything else keeps a forged cookie from naming a real user.
pub fn is_anonymous_id(value: &str) -> bool {
    value
        .strip_prefix(ANONYMOUS_ID_PREFIX)
        .and_then(|rest| uuid::Uuid::parse_str(rest).ok())
        .is_some()
}

/// Deterministic display name for an anonymous id.
///
/// Takes the first eight characters after the last `_`, so the same id
/// always yields the same name.
pub fn anonymous_username(user_id: &str) -> String {
    let suffix = user_id.rsplit('_').next().unwrap_or(user_id);
    let short: String = suffix.chars().take(8).collect();
    format!("Anonymous-{short}")
}

/// Marketing context a user attaches to their account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
