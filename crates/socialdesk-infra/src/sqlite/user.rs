//! SQLite user repository.

use chrono::Utc;
use socialdesk_core::repository::user::UserRepository;
use socialdesk_types::error::RepositoryError;
use socialdesk_types::user::User;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `UserRepository`.
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct UserRow {
    id: String,
    username: String,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_user(self) -> Result<User, RepositoryError> {
        Ok(User {
            id: self.id,
            username: self.username,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

impl UserRepository for SqliteUserRepository {
    async fn get(&self, user_id: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, created_at, updated_at FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|r| UserRow::from_row(&r).map_err(query_error)?.into_user())
            .transpose()
    }

    async fn create_if_missing(&self, user_id: &str, username: &str) -> Result<bool, RepositoryError> {
        let now = format_datetime(&Utc::now());
        let result = sqlx::query(
            r#"INSERT INTO users (id, username, created_at, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(id) DO NOTHING"#,
        )
        .bind(user_id)
        .bind(username)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(result.rows_affected() == 1)
    }
}
