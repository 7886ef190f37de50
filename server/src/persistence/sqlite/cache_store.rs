//! SQLite rows behind the puzzle cache.

use sqlx::{Row, SqlitePool};

use super::helpers::from_db_u32;
use puzzles::{CacheError, CachedPuzzle, PuzzleCacheStore};

pub struct SqlitePuzzleCacheStore {
    pool: SqlitePool,
}

impl SqlitePuzzleCacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn storage(e: impl std::fmt::Display) -> CacheError {
    CacheError::Storage(e.to_string())
}

const SELECT_PUZZLE: &str = r#"
    SELECT puzzle_id, fen, solution_moves, themes, rating, popularity, game_url,
           cached_at, last_accessed
    FROM puzzle_cache
"#;

fn puzzle_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<CachedPuzzle, CacheError> {
    let solution: String = row.try_get("solution_moves").map_err(storage)?;
    let themes: String = row.try_get("themes").map_err(storage)?;
    Ok(CachedPuzzle {
        id: row.try_get("puzzle_id").map_err(storage)?,
        fen: row.try_get("fen").map_err(storage)?,
        solution_moves: serde_json::from_str(&solution).map_err(storage)?,
        themes: serde_json::from_str(&themes).map_err(storage)?,
        rating: from_db_u32(row.try_get("rating").map_err(storage)?),
        popularity: row.try_get("popularity").map_err(storage)?,
        game_url: row.try_get("game_url").map_err(storage)?,
        cached_at: row.try_get("cached_at").map_err(storage)?,
        last_accessed: row.try_get("last_accessed").map_err(storage)?,
    })
}

impl PuzzleCacheStore for SqlitePuzzleCacheStore {
    async fn load(&self, id: &str) -> Result<Option<CachedPuzzle>, CacheError> {
        let row = sqlx::query(&format!("{SELECT_PUZZLE} WHERE puzzle_id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.as_ref().map(puzzle_from_row).transpose()
    }

    async fn upsert(&self, puzzle: &CachedPuzzle) -> Result<(), CacheError> {
        let solution = serde_json::to_string(&puzzle.solution_moves).map_err(storage)?;
        let themes = serde_json::to_string(&puzzle.themes).map_err(storage)?;
        sqlx::query(
            r#"
            INSERT INTO puzzle_cache
                (puzzle_id, fen, solution_moves, themes, rating, popularity, game_url,
                 cached_at, last_accessed)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (puzzle_id) DO UPDATE SET
                fen = excluded.fen,
                solution_moves = excluded.solution_moves,
                themes = excluded.themes,
                rating = excluded.rating,
                popularity = excluded.popularity,
                game_url = excluded.game_url,
                cached_at = excluded.cached_at,
                last_accessed = excluded.last_accessed
            "#,
        )
        .bind(&puzzle.id)
        .bind(&puzzle.fen)
        .bind(&solution)
        .bind(&themes)
        .bind(i64::from(puzzle.rating))
        .bind(puzzle.popularity)
        .bind(&puzzle.game_url)
        .bind(puzzle.cached_at)
        .bind(puzzle.last_accessed)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn touch(&self, id: &str, at: i64) -> Result<(), CacheError> {
        sqlx::query("UPDATE puzzle_cache SET last_accessed = ? WHERE puzzle_id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn count(&self) -> Result<usize, CacheError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM puzzle_cache")
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;
        Ok(usize::try_from(row.0).unwrap_or(0))
    }

    async fn least_recently_accessed(&self) -> Result<Option<String>, CacheError> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT puzzle_id FROM puzzle_cache
            ORDER BY last_accessed ASC, cached_at ASC, puzzle_id ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        Ok(row.map(|r| r.0))
    }

    async fn delete(&self, id: &str) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM puzzle_cache WHERE puzzle_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn delete_cached_before(&self, cutoff: i64) -> Result<usize, CacheError> {
        let done = sqlx::query("DELETE FROM puzzle_cache WHERE cached_at <= ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(usize::try_from(done.rows_affected()).unwrap_or(usize::MAX))
    }

    async fn all(&self) -> Result<Vec<CachedPuzzle>, CacheError> {
        let rows = sqlx::query(&format!("{SELECT_PUZZLE} ORDER BY puzzle_id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.iter().map(puzzle_from_row).collect()
    }
}
