//! SQLite-backed implementation of [`AnalysisRepository`].

use sqlx::{Row, SqlitePool};

use super::helpers::{
    decode_classification, decode_json, decode_status, encode_status, from_db_u32, from_db_u64,
    to_db_u64,
};
use crate::persistence::now_timestamp;
use crate::persistence::traits::{AnalysisRepository, ErrorTheme};
use crate::persistence::PersistenceError;
use analysis::{GameAnalysisResult, MoveAnalysis};

/// SQLite implementation of [`AnalysisRepository`].
pub struct SqliteAnalysisRepository {
    pool: SqlitePool,
}

impl SqliteAnalysisRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AnalysisRepository for SqliteAnalysisRepository {
    async fn save_analysis(
        &self,
        result: &GameAnalysisResult,
        user_id: Option<&str>,
    ) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;

        let (status, status_error) = encode_status(&result.status);
        let skipped_json = serde_json::to_string(&result.skipped)?;

        sqlx::query(
            r#"
            INSERT INTO analyzed_games
                (game_id, user_id, status, status_error, white_accuracy, black_accuracy,
                 total_plies, analysis_depth, skipped, started_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (game_id) DO UPDATE SET
                user_id = COALESCE(excluded.user_id, analyzed_games.user_id),
                status = excluded.status,
                status_error = excluded.status_error,
                white_accuracy = excluded.white_accuracy,
                black_accuracy = excluded.black_accuracy,
                total_plies = excluded.total_plies,
                analysis_depth = excluded.analysis_depth,
                skipped = excluded.skipped,
                started_at = excluded.started_at,
                completed_at = excluded.completed_at
            "#,
        )
        .bind(&result.game_id)
        .bind(user_id)
        .bind(status)
        .bind(status_error)
        .bind(result.white_accuracy)
        .bind(result.black_accuracy)
        .bind(i64::from(result.total_plies))
        .bind(i64::from(result.analysis_depth))
        .bind(&skipped_json)
        .bind(result.started_at.map(to_db_u64))
        .bind(result.completed_at.map(to_db_u64))
        .execute(&mut *tx)
        .await?;

        let updated_at = to_db_u64(now_timestamp());
        for mv in &result.moves {
            let alternatives = serde_json::to_string(&mv.alternatives)?;
            let finding = serde_json::to_string(&mv.tactical_finding)?;
            let categorization = mv
                .categorization
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            let theme = mv.categorization.as_ref().map(|c| c.tactical_theme.as_str());

            sqlx::query(
                r#"
                INSERT INTO move_analyses
                    (game_id, ply, mover_is_white, played_move, played_san, fen_before,
                     best_move, best_move_san, evaluation_before, evaluation_after,
                     centipawn_loss, win_probability_before, win_probability_after, accuracy,
                     classification, alternatives, tactical_finding, categorization,
                     tactical_theme, depth, timed_out, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (game_id, ply) DO UPDATE SET
                    mover_is_white = excluded.mover_is_white,
                    played_move = excluded.played_move,
                    played_san = excluded.played_san,
                    fen_before = excluded.fen_before,
                    best_move = excluded.best_move,
                    best_move_san = excluded.best_move_san,
                    evaluation_before = excluded.evaluation_before,
                    evaluation_after = excluded.evaluation_after,
                    centipawn_loss = excluded.centipawn_loss,
                    win_probability_before = excluded.win_probability_before,
                    win_probability_after = excluded.win_probability_after,
                    accuracy = excluded.accuracy,
                    classification = excluded.classification,
                    alternatives = excluded.alternatives,
                    tactical_finding = excluded.tactical_finding,
                    categorization = excluded.categorization,
                    tactical_theme = excluded.tactical_theme,
                    depth = excluded.depth,
                    timed_out = excluded.timed_out,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&result.game_id)
            .bind(i64::from(mv.move_number))
            .bind(mv.mover_is_white)
            .bind(&mv.played_move)
            .bind(&mv.played_san)
            .bind(&mv.fen_before)
            .bind(mv.best_move.as_deref())
            .bind(mv.best_move_san.as_deref())
            .bind(mv.evaluation_before)
            .bind(mv.evaluation_after)
            .bind(mv.centipawn_loss)
            .bind(mv.win_probability_before)
            .bind(mv.win_probability_after)
            .bind(mv.accuracy)
            .bind(mv.classification.as_str())
            .bind(&alternatives)
            .bind(&finding)
            .bind(categorization.as_deref())
            .bind(theme)
            .bind(i64::from(mv.depth))
            .bind(mv.timed_out)
            .bind(updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(game_id = %result.game_id, rows = result.moves.len(), "Saved analysis");
        Ok(())
    }

    async fn load_analysis(
        &self,
        game_id: &str,
    ) -> Result<Option<GameAnalysisResult>, PersistenceError> {
        let header = sqlx::query(
            r#"
            SELECT status, status_error, white_accuracy, black_accuracy, total_plies,
                   analysis_depth, skipped, started_at, completed_at
            FROM analyzed_games
            WHERE game_id = ?
            "#,
        )
        .bind(game_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = header else {
            return Ok(None);
        };

        let status_str: String = row.try_get("status")?;
        let status_error: Option<String> = row.try_get("status_error")?;
        let skipped_json: String = row.try_get("skipped")?;
        let started_at: Option<i64> = row.try_get("started_at")?;
        let completed_at: Option<i64> = row.try_get("completed_at")?;

        let move_rows = sqlx::query(
            r#"
            SELECT ply, mover_is_white, played_move, played_san, fen_before, best_move,
                   best_move_san, evaluation_before, evaluation_after, centipawn_loss,
                   win_probability_before, win_probability_after, accuracy, classification,
                   alternatives, tactical_finding, categorization, depth, timed_out
            FROM move_analyses
            WHERE game_id = ?
            ORDER BY ply ASC
            "#,
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;

        let mut moves = Vec::with_capacity(move_rows.len());
        for mr in move_rows {
            let classification: String = mr.try_get("classification")?;
            let alternatives: String = mr.try_get("alternatives")?;
            let finding: String = mr.try_get("tactical_finding")?;
            let categorization: Option<String> = mr.try_get("categorization")?;

            moves.push(MoveAnalysis {
                move_number: from_db_u32(mr.try_get("ply")?),
                mover_is_white: mr.try_get("mover_is_white")?,
                played_move: mr.try_get("played_move")?,
                played_san: mr.try_get("played_san")?,
                fen_before: mr.try_get("fen_before")?,
                best_move: mr.try_get("best_move")?,
                best_move_san: mr.try_get("best_move_san")?,
                evaluation_before: mr.try_get("evaluation_before")?,
                evaluation_after: mr.try_get("evaluation_after")?,
                centipawn_loss: mr.try_get("centipawn_loss")?,
                win_probability_before: mr.try_get("win_probability_before")?,
                win_probability_after: mr.try_get("win_probability_after")?,
                accuracy: mr.try_get("accuracy")?,
                classification: decode_classification(&classification)?,
                alternatives: decode_json("alternatives", &alternatives)?,
                tactical_finding: decode_json("tactical_finding", &finding)?,
                categorization: categorization
                    .as_deref()
                    .map(|text| decode_json("categorization", text))
                    .transpose()?,
                depth: from_db_u32(mr.try_get("depth")?),
                timed_out: mr.try_get("timed_out")?,
            });
        }

        Ok(Some(GameAnalysisResult {
            game_id: game_id.to_string(),
            status: decode_status(&status_str, status_error)?,
            moves,
            skipped: decode_json("skipped", &skipped_json)?,
            white_accuracy: row.try_get("white_accuracy")?,
            black_accuracy: row.try_get("black_accuracy")?,
            total_plies: from_db_u32(row.try_get("total_plies")?),
            analysis_depth: from_db_u32(row.try_get("analysis_depth")?),
            started_at: started_at.map(from_db_u64),
            completed_at: completed_at.map(from_db_u64),
        }))
    }

    async fn error_themes(&self, game_id: &str) -> Result<Vec<ErrorTheme>, PersistenceError> {
        let rows = sqlx::query(
            r#"
            SELECT game_id, ply, tactical_theme
            FROM move_analyses
            WHERE game_id = ? AND tactical_theme IS NOT NULL
            ORDER BY ply ASC
            "#,
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(error_theme_from_row).collect()
    }

    async fn error_themes_for_user(&self, user_id: &str) -> Result<Vec<ErrorTheme>, PersistenceError> {
        let rows = sqlx::query(
            r#"
            SELECT m.game_id, m.ply, m.tactical_theme
            FROM move_analyses m
            JOIN analyzed_games g ON g.game_id = m.game_id
            WHERE g.user_id = ? AND m.tactical_theme IS NOT NULL
            ORDER BY m.game_id ASC, m.ply ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(error_theme_from_row).collect()
    }

    async fn delete_analysis(&self, game_id: &str) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM analyzed_games WHERE game_id = ?")
            .bind(game_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn error_theme_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ErrorTheme, PersistenceError> {
    Ok(ErrorTheme {
        game_id: row.try_get("game_id")?,
        ply: from_db_u32(row.try_get("ply")?),
        theme: row.try_get("tactical_theme")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::Database;
    use crate::test_support::{sample_error_move, sample_result};
    use analysis::{AnalysisStatus, MoveClassification, TacticalTheme};

    async fn repo() -> (Database, SqliteAnalysisRepository) {
        let db = Database::new_in_memory().await.unwrap();
        let repo = db.analyses();
        (db, repo)
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let (_db, repo) = repo().await;
        let result = sample_result("game-1", 4);

        repo.save_analysis(&result, Some("alice")).await.unwrap();
        let loaded = repo.load_analysis("game-1").await.unwrap().unwrap();

        assert_eq!(loaded, result);
    }

    #[tokio::test]
    async fn load_missing_game_is_none() {
        let (_db, repo) = repo().await;
        assert!(repo.load_analysis("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resave_overwrites_rows() {
        let (_db, repo) = repo().await;
        let mut result = sample_result("game-1", 3);
        repo.save_analysis(&result, None).await.unwrap();

        result.moves[1].classification = MoveClassification::Mistake;
        result.moves[1].centipawn_loss = 220;
        result.status = AnalysisStatus::Failed {
            error: "interrupted".into(),
        };
        repo.save_analysis(&result, None).await.unwrap();

        let loaded = repo.load_analysis("game-1").await.unwrap().unwrap();
        assert_eq!(loaded.moves.len(), 3);
        assert_eq!(loaded.moves[1].classification, MoveClassification::Mistake);
        assert_eq!(loaded.moves[1].centipawn_loss, 220);
        assert!(!loaded.is_completed());
    }

    #[tokio::test]
    async fn error_themes_follow_categorized_rows() {
        let (_db, repo) = repo().await;
        let mut result = sample_result("game-1", 6);
        result.moves[2] = sample_error_move(3, TacticalTheme::HangingPiece);
        result.moves[5] = sample_error_move(6, TacticalTheme::MissedFork);
        repo.save_analysis(&result, Some("alice")).await.unwrap();
        repo.save_analysis(&sample_result("game-2", 2), Some("bob"))
            .await
            .unwrap();

        let themes = repo.error_themes("game-1").await.unwrap();
        let plies: Vec<u32> = themes.iter().map(|t| t.ply).collect();
        assert_eq!(plies, vec![3, 6]);
        assert_eq!(themes[0].theme, "hanging_piece");

        assert_eq!(repo.error_themes_for_user("alice").await.unwrap(), themes);
        assert!(repo.error_themes_for_user("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resave_without_user_keeps_owner() {
        let (_db, repo) = repo().await;
        let mut result = sample_result("game-1", 2);
        result.moves[0] = sample_error_move(1, TacticalTheme::MissedPin);
        repo.save_analysis(&result, Some("alice")).await.unwrap();
        repo.save_analysis(&result, None).await.unwrap();

        assert_eq!(repo.error_themes_for_user("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_cascades_to_moves() {
        let (db, repo) = repo().await;
        repo.save_analysis(&sample_result("game-1", 3), None).await.unwrap();
        repo.delete_analysis("game-1").await.unwrap();

        assert!(repo.load_analysis("game-1").await.unwrap().is_none());
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM move_analyses")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }
}
