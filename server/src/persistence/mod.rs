//! Storage for analysis rows, puzzle progress, puzzle links and the puzzle cache.

pub mod sqlite;
mod traits;

pub use sqlite::{
    Database, SqliteAnalysisRepository, SqliteLinkRepository, SqliteProgressRepository,
    SqlitePuzzleCacheStore,
};
pub use traits::{AnalysisRepository, ErrorTheme, LinkRepository, ProgressRepository};

use std::time::{SystemTime, UNIX_EPOCH};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Get the current unix timestamp in seconds.
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
