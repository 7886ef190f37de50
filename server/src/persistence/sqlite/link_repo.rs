//! SQLite-backed implementation of [`LinkRepository`].

use sqlx::{Row, SqlitePool};

use super::helpers::from_db_u32;
use crate::persistence::traits::LinkRepository;
use crate::persistence::PersistenceError;
use puzzles::BlunderPuzzleLink;

pub struct SqliteLinkRepository {
    pool: SqlitePool,
}

impl SqliteLinkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl LinkRepository for SqliteLinkRepository {
    async fn save_links(&self, links: &[BlunderPuzzleLink]) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;
        for link in links {
            sqlx::query(
                r#"
                INSERT INTO blunder_puzzle_links (game_id, ply, puzzle_id, match_score)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (game_id, ply, puzzle_id) DO UPDATE SET
                    match_score = excluded.match_score
                "#,
            )
            .bind(&link.game_id)
            .bind(i64::from(link.ply))
            .bind(&link.puzzle_id)
            .bind(link.match_score)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn links_for_game(&self, game_id: &str) -> Result<Vec<BlunderPuzzleLink>, PersistenceError> {
        let rows = sqlx::query(
            r#"
            SELECT game_id, ply, puzzle_id, match_score
            FROM blunder_puzzle_links
            WHERE game_id = ?
            ORDER BY ply ASC, match_score DESC, puzzle_id ASC
            "#,
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(link_from_row).collect()
    }
}

fn link_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<BlunderPuzzleLink, PersistenceError> {
    Ok(BlunderPuzzleLink {
        game_id: row.try_get("game_id")?,
        ply: from_db_u32(row.try_get("ply")?),
        puzzle_id: row.try_get("puzzle_id")?,
        match_score: row.try_get("match_score")?,
    })
}
