//! UserRepository and BusinessRepository trait definitions.

use socialdesk_types::error::RepositoryError;
use socialdesk_types::user::{BusinessProfile, User};

/// Repository trait for user rows.
///
/// Implementations live in socialdesk-infra (e.g., `SqliteUserRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait UserRepository: Send + Sync {
    /// Get a user by id.
    fn get(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Insert the user unless a row with this id already exists.
    ///
    /// Returns `true` when a row was created.
    fn create_if_missing(
        &self,
        user_id: &str,
        username: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}

/// Repository trait for the per-user business profile.
pub trait BusinessRepository: Send + Sync {
    fn get(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<BusinessProfile>, RepositoryError>> + Send;

    /// Create or replace the profile for `profile.user_id`.
    ///
    /// `created_at` of an existing row is preserved.
    fn upsert(
        &self,
        profile: &BusinessProfile,
    ) -> impl std::future::Future<Output = Result<BusinessProfile, RepositoryError>> + Send;

    /// Returns `true` if a profile existed.
    fn delete(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
