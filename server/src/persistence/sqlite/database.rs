//! Connection pool and embedded migrations for the coach database.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use super::{
    SqliteAnalysisRepository, SqliteLinkRepository, SqliteProgressRepository,
    SqlitePuzzleCacheStore,
};
use crate::persistence::PersistenceError;

const MAX_CONNECTIONS: u32 = 5;
/// Concurrent writers wait this long before failing with SQLITE_BUSY.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle to the coach database. Cloning shares the pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database file at `path` and bring the schema up
    /// to date. Missing parent directories are created.
    pub async fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .synchronous(SqliteSynchronous::Normal);
        tracing::debug!(path = %path.display(), "Opening coach database");
        Self::connect(options, MAX_CONNECTIONS).await
    }

    /// Private in-memory database with the schema applied. A single
    /// connection keeps every query on the same memory database.
    #[cfg(test)]
    pub async fn new_in_memory() -> Result<Self, PersistenceError> {
        Self::connect(SqliteConnectOptions::from_str("sqlite::memory:")?, 1).await
    }

    async fn connect(
        options: SqliteConnectOptions,
        max_connections: u32,
    ) -> Result<Self, PersistenceError> {
        let options = options
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| PersistenceError::Migration(e.to_string()))?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn analyses(&self) -> SqliteAnalysisRepository {
        SqliteAnalysisRepository::new(self.pool.clone())
    }

    pub fn progress(&self) -> SqliteProgressRepository {
        SqliteProgressRepository::new(self.pool.clone())
    }

    pub fn links(&self) -> SqliteLinkRepository {
        SqliteLinkRepository::new(self.pool.clone())
    }

    pub fn puzzle_cache(&self) -> SqlitePuzzleCacheStore {
        SqlitePuzzleCacheStore::new(self.pool.clone())
    }
}
