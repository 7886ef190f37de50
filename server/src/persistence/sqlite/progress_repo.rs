//! SQLite-backed implementation of [`ProgressRepository`].

use sqlx::{Row, SqlitePool};

use super::helpers::{from_db_u32, from_db_u64, to_db_u64};
use crate::persistence::traits::ProgressRepository;
use crate::persistence::PersistenceError;
use puzzles::ProgressRecord;

pub struct SqliteProgressRepository {
    pool: SqlitePool,
}

impl SqliteProgressRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SELECT_PROGRESS: &str = r#"
    SELECT puzzle_id, user_id, attempts, solved, first_attempt_correct,
           total_time_ms, streak, last_attempt_at
    FROM puzzle_progress
"#;

fn progress_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ProgressRecord, PersistenceError> {
    Ok(ProgressRecord {
        puzzle_id: row.try_get("puzzle_id")?,
        user_id: row.try_get("user_id")?,
        attempts: from_db_u32(row.try_get("attempts")?),
        solved: row.try_get("solved")?,
        first_attempt_correct: row.try_get("first_attempt_correct")?,
        total_time_ms: from_db_u64(row.try_get("total_time_ms")?),
        streak: from_db_u32(row.try_get("streak")?),
        last_attempt_at: row.try_get("last_attempt_at")?,
    })
}

impl ProgressRepository for SqliteProgressRepository {
    async fn load_progress(
        &self,
        puzzle_id: &str,
        user_id: &str,
    ) -> Result<Option<ProgressRecord>, PersistenceError> {
        let row = sqlx::query(&format!(
            "{SELECT_PROGRESS} WHERE puzzle_id = ? AND user_id = ?"
        ))
        .bind(puzzle_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(progress_from_row).transpose()
    }

    async fn save_progress(&self, record: &ProgressRecord) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            INSERT INTO puzzle_progress
                (puzzle_id, user_id, attempts, solved, first_attempt_correct,
                 total_time_ms, streak, last_attempt_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (puzzle_id, user_id) DO UPDATE SET
                attempts = excluded.attempts,
                solved = excluded.solved,
                first_attempt_correct = excluded.first_attempt_correct,
                total_time_ms = excluded.total_time_ms,
                streak = excluded.streak,
                last_attempt_at = excluded.last_attempt_at
            "#,
        )
        .bind(&record.puzzle_id)
        .bind(&record.user_id)
        .bind(i64::from(record.attempts))
        .bind(record.solved)
        .bind(record.first_attempt_correct)
        .bind(to_db_u64(record.total_time_ms))
        .bind(i64::from(record.streak))
        .bind(record.last_attempt_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn progress_for_user(&self, user_id: &str) -> Result<Vec<ProgressRecord>, PersistenceError> {
        let rows = sqlx::query(&format!(
            "{SELECT_PROGRESS} WHERE user_id = ? ORDER BY last_attempt_at DESC, puzzle_id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(progress_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::Database;

    #[tokio::test]
    async fn attempts_accumulate_across_saves() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = db.progress();

        let mut record = ProgressRecord::new("p1", "alice");
        record.record_attempt(false, 45_000, 1_000);
        repo.save_progress(&record).await.unwrap();

        let mut loaded = repo.load_progress("p1", "alice").await.unwrap().unwrap();
        assert_eq!(loaded, record);

        loaded.record_attempt(true, 15_000, 2_000);
        repo.save_progress(&loaded).await.unwrap();

        let again = repo.load_progress("p1", "alice").await.unwrap().unwrap();
        assert_eq!(again.attempts, 2);
        assert!(again.solved);
        assert!(!again.first_attempt_correct);
        assert_eq!(again.total_time_ms, 60_000);
        assert_eq!(again.streak, 1);
    }

    #[tokio::test]
    async fn progress_is_scoped_per_user() {
        let db = Database::new_in_memory().await.unwrap();
        let repo = db.progress();

        for (puzzle, user, at) in [("p1", "alice", 10), ("p2", "alice", 20), ("p1", "bob", 30)] {
            let mut record = ProgressRecord::new(puzzle, user);
            record.record_attempt(true, 1_000, at);
            repo.save_progress(&record).await.unwrap();
        }

        let alice = repo.progress_for_user("alice").await.unwrap();
        let ids: Vec<&str> = alice.iter().map(|r| r.puzzle_id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1"]);
        assert!(repo.load_progress("p2", "bob").await.unwrap().is_none());
    }
}
