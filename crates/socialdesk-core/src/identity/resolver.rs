//! Identity resolver.
//!
//! A live session always wins over an anonymous cookie. Without one, the
//! caller is anonymous: the cookie value is reused if it has the shape of a
//! minted id, otherwise a fresh id is minted and must be echoed back to the
//! client.

use std::sync::Arc;

use socialdesk_types::error::{IdentityError, RepositoryError};
use socialdesk_types::session::SessionUser;
use socialdesk_types::user::{User, anonymous_username, is_anonymous_id, new_anonymous_id};
use tracing::{debug, info, warn};

use crate::conversation::ConversationStore;
use crate::repository::conversation::ConversationRepository;
use crate::repository::user::UserRepository;
use crate::session::{SessionBackend, SessionStore};

/// Identity-relevant cookies extracted from a request.
#[derive(Debug, Clone, Default)]
pub struct RequestCookies {
    pub session_id: Option<String>,
    pub anonymous_user_id: Option<String>,
}

/// The resolved caller.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub is_anonymous: bool,
    /// Session payload for authenticated callers.
    pub session: Option<SessionUser>,
    /// Set when the anonymous id was minted for this request and still has
    /// to be sent back as a cookie.
    pub minted: bool,
}

impl Identity {
    pub fn from_session(user: SessionUser) -> Self {
        Self {
            user_id: user.id.clone(),
            is_anonymous: false,
            session: Some(user),
            minted: false,
        }
    }

    /// Username stored for this caller on first contact.
    pub fn display_name(&self) -> String {
        match &self.session {
            Some(user) => user.first_name().to_string(),
            None => anonymous_username(&self.user_id),
        }
    }
}

pub struct IdentityResolver<U, C, B>
where
    U: UserRepository,
    C: ConversationRepository,
    B: SessionBackend,
{
    users: U,
    sessions: Arc<SessionStore<B>>,
    conversations: Arc<ConversationStore<C>>,
}

impl<U, C, B> IdentityResolver<U, C, B>
where
    U: UserRepository,
    C: ConversationRepository,
    B: SessionBackend,
{
    pub fn new(
        users: U,
        sessions: Arc<SessionStore<B>>,
        conversations: Arc<ConversationStore<C>>,
    ) -> Self {
        Self {
            users,
            sessions,
            conversations,
        }
    }

    /// Look up the live session named by the session cookie, if any.
    pub async fn authenticated(&self, cookies: &RequestCookies) -> Option<SessionUser> {
        let session_id = cookies.session_id.as_deref()?;
        self.sessions.get(session_id).await.map(|record| record.user)
    }

    /// Decide who the caller is. Never fails: storage trouble degrades to
    /// "no session" inside the session store.
    pub async fn resolve(&self, cookies: &RequestCookies) -> Identity {
        if let Some(user) = self.authenticated(cookies).await {
            return Identity::from_session(user);
        }

        match cookies.anonymous_user_id.as_deref() {
            Some(existing) if is_anonymous_id(existing) => Identity {
                user_id: existing.to_string(),
                is_anonymous: true,
                session: None,
                minted: false,
            },
            other => {
                if other.is_some() {
                    warn!("ignoring malformed anonymous_user_id cookie");
                }
                let user_id = new_anonymous_id();
                debug!(user_id = %user_id, "minted anonymous identity");
                Identity {
                    user_id,
                    is_anonymous: true,
                    session: None,
                    minted: true,
                }
            }
        }
    }

    /// Create the caller's user row if it does not exist yet.
    ///
    /// Returns `true` when a row was inserted.
    pub async fn ensure_user_exists(&self, identity: &Identity) -> Result<bool, RepositoryError> {
        let created = self
            .users
            .create_if_missing(&identity.user_id, &identity.display_name())
            .await?;
        if created {
            info!(
                user_id = %identity.user_id,
                anonymous = identity.is_anonymous,
                "user created"
            );
        }
        Ok(created)
    }

    /// The caller's user record, created on first contact.
    ///
    /// Authenticated callers are shown under the first name of their
    /// current session, which may differ from the stored username.
    pub async fn profile(&self, identity: &Identity) -> Result<User, RepositoryError> {
        self.ensure_user_exists(identity).await?;
        let mut user = self
            .users
            .get(&identity.user_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if let Some(session) = &identity.session {
            user.username = session.first_name().to_string();
        }
        Ok(user)
    }

    /// Fold an anonymous user's conversations into the authenticated caller.
    ///
    /// The target is always the caller's own resolved id; a client can only
    /// choose which anonymous id to pull from.
    pub async fn migrate(
        &self,
        caller: &Identity,
        anonymous_user_id: &str,
    ) -> Result<u64, IdentityError> {
        if caller.is_anonymous {
            return Err(IdentityError::Unauthenticated);
        }
        if !is_anonymous_id(anonymous_user_id) {
            return Err(IdentityError::InvalidAnonymousId(
                anonymous_user_id.to_string(),
            ));
        }

        self.ensure_user_exists(caller).await?;
        let moved = self
            .conversations
            .transfer_all(anonymous_user_id, &caller.user_id)
            .await?;
        info!(
            from = anonymous_user_id,
            to = %caller.user_id,
            moved,
            "migrated anonymous conversations"
        );
        Ok(moved)
    }
}
