//! SQLite business profile repository.

use socialdesk_core::repository::user::BusinessRepository;
use socialdesk_types::error::RepositoryError;
use socialdesk_types::user::BusinessProfile;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `BusinessRepository`.
#[derive(Clone)]
pub struct SqliteBusinessRepository {
    pool: DatabasePool,
}

impl SqliteBusinessRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct BusinessRow {
    user_id: String,
    name: String,
    url: Option<String>,
    description: Option<String>,
    created_at: String,
    updated_at: String,
}

impl BusinessRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            url: row.try_get("url")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_profile(self) -> Result<BusinessProfile, RepositoryError> {
        Ok(BusinessProfile {
            user_id: self.user_id,
            name: self.name,
            url: self.url,
            description: self.description,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

const SELECT_PROFILE: &str =
    "SELECT user_id, name, url, description, created_at, updated_at FROM businesses WHERE user_id = ?";

impl BusinessRepository for SqliteBusinessRepository {
    async fn get(&self, user_id: &str) -> Result<Option<BusinessProfile>, RepositoryError> {
        let row = sqlx::query(SELECT_PROFILE)
            .bind(user_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|r| BusinessRow::from_row(&r).map_err(query_error)?.into_profile())
            .transpose()
    }

    async fn upsert(&self, profile: &BusinessProfile) -> Result<BusinessProfile, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO businesses (user_id, name, url, description, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(user_id) DO UPDATE SET
                   name = excluded.name,
                   url = excluded.url,
                   description = excluded.description,
                   updated_at = excluded.updated_at"#,
        )
        .bind(&profile.user_id)
        .bind(&profile.name)
        .bind(&profile.url)
        .bind(&profile.description)
        .bind(format_datetime(&profile.created_at))
        .bind(format_datetime(&profile.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        // Read back through the writer so the stored created_at is returned.
        let row = sqlx::query(SELECT_PROFILE)
            .bind(&profile.user_id)
            .fetch_one(&self.pool.writer)
            .await
            .map_err(query_error)?;
        BusinessRow::from_row(&row).map_err(query_error)?.into_profile()
    }

    async fn delete(&self, user_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM businesses WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;
        Ok(result.rows_affected() > 0)
    }
}
