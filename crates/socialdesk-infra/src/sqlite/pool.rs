//! SQLite connection pools for the SocialDesk database.
//!
//! Every mutation goes through a single writer connection; reads fan out
//! over a small read-only pool against the WAL. The schema is migrated on
//! the writer before any reader connects.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};

const DATABASE_FILE: &str = "socialdesk.db";
const READER_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database URL for the SocialDesk database inside `data_dir`.
pub fn database_url(data_dir: &Path) -> String {
    format!("sqlite://{}/{DATABASE_FILE}?mode=rwc", data_dir.display())
}

fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    Ok(SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT))
}

/// Writer and reader pools over one database file.
#[derive(Clone)]
pub struct DatabasePool {
    /// Read-only connections for SELECTs.
    pub reader: SqlitePool,
    /// The only connection that writes.
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open (creating if needed) the database in `data_dir`.
    pub async fn open(data_dir: &Path) -> Result<Self, sqlx::Error> {
        Self::connect(&database_url(data_dir)).await
    }

    /// Connect to `database_url` and bring the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = connect_options(database_url)?;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;

        let migrator = sqlx::migrate!("../../migrations");
        migrator.run(&writer).await?;
        tracing::debug!(
            migrations = migrator.iter().count(),
            "database schema up to date"
        );

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(options.read_only(true))
            .await?;

        Ok(Self { reader, writer })
    }

    /// Close readers, then the writer.
    pub async fn close(&self) {
        self.reader.close().await;
        self.writer.close().await;
    }
}
