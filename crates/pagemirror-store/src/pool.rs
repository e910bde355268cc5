//! Database connection pool management
//!
//! File databases run in WAL mode with a busy timeout; the in-memory mode
//! used by tests is pinned to a single connection, since every SQLite
//! connection opens its own private `:memory:` database.
//!
//! The schema version lives in `PRAGMA user_version`. Migrations newer
//! than the stored version are applied in order on connect.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::StoreError;

/// Ordered schema migrations; index + 1 is the resulting `user_version`
const MIGRATIONS: &[&str] = &[include_str!("migrations/0001_initial.sql")];

const FILE_POOL_SIZE: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool of SQLite connections backing the destination store
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if needed) the database file at `db_path` and brings
    /// its schema up to date. Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// `StoreError::ConnectionFailed` when the directory or connection
    /// cannot be created, `StoreError::MigrationFailed` when the schema
    /// cannot be applied.
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = Self::connect(options, FILE_POOL_SIZE, &db_path.display().to_string()).await?;
        info!(path = %db_path.display(), "Database pool initialized");
        Ok(pool)
    }

    /// Creates a migrated in-memory database, mainly for tests
    ///
    /// # Errors
    ///
    /// Same as [`DatabasePool::new`].
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StoreError::ConnectionFailed(format!("Invalid in-memory connection string: {e}"))
        })?;
        Self::connect(options, 1, ":memory:").await
    }

    async fn connect(
        options: SqliteConnectOptions,
        max_connections: u32,
        label: &str,
    ) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to open database {label}: {e}"))
            })?;

        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns the underlying SQLx pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Schema version recorded in the database
    pub async fn schema_version(&self) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
        let current: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("Failed to read schema version: {e}")))?;

        for (index, sql) in MIGRATIONS.iter().enumerate() {
            let version = index as i64 + 1;
            if version <= current {
                continue;
            }
            sqlx::raw_sql(sql).execute(pool).await.map_err(|e| {
                StoreError::MigrationFailed(format!("Migration {version} failed: {e}"))
            })?;
            // PRAGMA does not accept bound parameters
            sqlx::raw_sql(&format!("PRAGMA user_version = {version}"))
                .execute(pool)
                .await
                .map_err(|e| {
                    StoreError::MigrationFailed(format!("Failed to record version {version}: {e}"))
                })?;
            debug!(version, "Applied schema migration");
        }
        Ok(())
    }
}
