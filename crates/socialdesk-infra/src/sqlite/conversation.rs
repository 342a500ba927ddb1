//! SQLite conversation repository.
//!
//! Conversations live in `conversations`; each persisted turn is one row in
//! `messages` holding the JSON-encoded batch. Batch order is the
//! autoincrement id, so history replays in insertion order.

use chrono::{DateTime, Utc};
use socialdesk_core::repository::conversation::ConversationRepository;
use socialdesk_types::conversation::{Conversation, ConversationSummary};
use socialdesk_types::error::RepositoryError;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, query_error};

/// SQLite-backed implementation of `ConversationRepository`.
#[derive(Clone)]
pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct SummaryRow {
    id: String,
    title: String,
    created_at: String,
    updated_at: String,
    message_count: i64,
}

impl SummaryRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            message_count: row.try_get("message_count")?,
        })
    }

    fn into_summary(self) -> Result<ConversationSummary, RepositoryError> {
        Ok(ConversationSummary {
            id: self.id,
            title: self.title,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
            message_count: self.message_count as u32,
        })
    }
}

impl ConversationRepository for SqliteConversationRepository {
    async fn exists(&self, conversation_id: &str) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT 1 FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;
        Ok(row.is_some())
    }

    async fn owner_of(&self, conversation_id: &str) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query("SELECT user_id FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|r| r.try_get("user_id").map_err(query_error))
            .transpose()
    }

    async fn create(&self, conversation: &Conversation) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO conversations (id, user_id, title, created_at, updated_at, is_active)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&conversation.id)
        .bind(&conversation.user_id)
        .bind(&conversation.title)
        .bind(format_datetime(&conversation.created_at))
        .bind(format_datetime(&conversation.updated_at))
        .bind(conversation.is_active)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation());
            if duplicate {
                RepositoryError::Conflict(format!(
                    "conversation '{}' already exists",
                    conversation.id
                ))
            } else {
                query_error(e)
            }
        })?;

        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT c.id, c.title, c.created_at, c.updated_at, COUNT(m.id) AS message_count
               FROM conversations c
               LEFT JOIN messages m ON m.conversation_id = c.id
               WHERE c.user_id = ? AND c.is_active = 1
               GROUP BY c.id
               ORDER BY c.updated_at DESC, c.rowid DESC
               LIMIT ?"#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows.iter()
            .map(|row| {
                SummaryRow::from_row(row)
                    .map_err(query_error)?
                    .into_summary()
            })
            .collect()
    }

    async fn append_batch(
        &self,
        conversation_id: &str,
        batch: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let at = format_datetime(&at);
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        let updated = sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(&at)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            "INSERT INTO messages (conversation_id, message_list, created_at) VALUES (?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(batch)
        .bind(&at)
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        tx.commit().await.map_err(query_error)?;
        Ok(())
    }

    async fn get_batches(&self, conversation_id: &str) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT message_list FROM messages WHERE conversation_id = ? ORDER BY id ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows.iter()
            .map(|row| row.try_get("message_list").map_err(query_error))
            .collect()
    }

    async fn transfer_owner(
        &self,
        conversation_id: &str,
        new_user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE conversations SET user_id = ?, updated_at = ? WHERE id = ?")
            .bind(new_user_id)
            .bind(format_datetime(&at))
            .bind(conversation_id)
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn transfer_all(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE conversations SET user_id = ?, updated_at = ?
               WHERE user_id = ? AND is_active = 1"#,
        )
        .bind(to_user_id)
        .bind(format_datetime(&at))
        .bind(from_user_id)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::test_support::test_pool;
    use crate::sqlite::user::SqliteUserRepository;
    use chrono::TimeDelta;
    use socialdesk_core::repository::user::UserRepository;

    async fn repo_with_users(users: &[&str]) -> SqliteConversationRepository {
        let pool = test_pool().await;
        let user_repo = SqliteUserRepository::new(pool.clone());
        for user in users {
            user_repo.create_if_missing(user, user).await.unwrap();
        }
        SqliteConversationRepository::new(pool)
    }

    fn conversation(id: &str, user_id: &str, at: DateTime<Utc>) -> Conversation {
        Conversation {
            id: id.to_string(),
            user_id: user_id.to_string(),
            title: format!("Topic {id}"),
            created_at: at,
            updated_at: at,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_create_and_owner() {
        let repo = repo_with_users(&["u1"]).await;
        repo.create(&conversation("c1", "u1", Utc::now())).await.unwrap();

        assert!(repo.exists("c1").await.unwrap());
        assert_eq!(repo.owner_of("c1").await.unwrap().as_deref(), Some("u1"));
        assert!(repo.owner_of("c404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_is_conflict() {
        let repo = repo_with_users(&["u1"]).await;
        repo.create(&conversation("c1", "u1", Utc::now())).await.unwrap();
        let err = repo
            .create(&conversation("c1", "u1", Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_batches_keep_insertion_order() {
        let repo = repo_with_users(&["u1"]).await;
        let t0 = Utc::now();
        repo.create(&conversation("c1", "u1", t0)).await.unwrap();

        repo.append_batch("c1", "[\"b1\"]", t0 + TimeDelta::seconds(1))
            .await
            .unwrap();
        repo.append_batch("c1", "[\"b2\"]", t0 + TimeDelta::seconds(2))
            .await
            .unwrap();

        assert_eq!(repo.get_batches("c1").await.unwrap(), vec!["[\"b1\"]", "[\"b2\"]"]);
    }

    #[tokio::test]
    async fn test_append_to_missing_conversation() {
        let repo = repo_with_users(&["u1"]).await;
        let err = repo.append_batch("nope", "[]", Utc::now()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_most_recent_first_with_counts() {
        let repo = repo_with_users(&["u1", "u2"]).await;
        let t0 = Utc::now();
        repo.create(&conversation("old", "u1", t0)).await.unwrap();
        repo.create(&conversation("new", "u1", t0 + TimeDelta::seconds(1)))
            .await
            .unwrap();
        repo.create(&conversation("other", "u2", t0)).await.unwrap();
        repo.append_batch("old", "[]", t0 + TimeDelta::seconds(5))
            .await
            .unwrap();

        let listed = repo.list_for_user("u1", 50).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["old", "new"]);
        assert_eq!(listed[0].message_count, 1);
        assert_eq!(listed[1].message_count, 0);

        assert_eq!(repo.list_for_user("u1", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_all_moves_every_conversation() {
        let repo = repo_with_users(&["anon_a", "google_b"]).await;
        let t0 = Utc::now();
        repo.create(&conversation("c1", "anon_a", t0)).await.unwrap();
        repo.create(&conversation("c2", "anon_a", t0)).await.unwrap();

        let moved = repo.transfer_all("anon_a", "google_b", Utc::now()).await.unwrap();
        assert_eq!(moved, 2);
        assert!(repo.list_for_user("anon_a", 50).await.unwrap().is_empty());
        assert_eq!(repo.list_for_user("google_b", 50).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_transfer_owner() {
        let repo = repo_with_users(&["u1", "u2"]).await;
        repo.create(&conversation("c1", "u1", Utc::now())).await.unwrap();

        assert!(repo.transfer_owner("c1", "u2", Utc::now()).await.unwrap());
        assert!(!repo.transfer_owner("c404", "u2", Utc::now()).await.unwrap());
        assert_eq!(repo.owner_of("c1").await.unwrap().as_deref(), Some("u2"));
    }
}
