//! Async repository trait definitions for the persistence layer.
//!
//! Methods return `impl Future + Send` rather than using `async fn` so that
//! the futures are guaranteed `Send` and can be driven from `tokio::spawn`.

use super::PersistenceError;
use analysis::GameAnalysisResult;
use puzzles::{BlunderPuzzleLink, ProgressRecord};
use std::future::Future;

/// Tactical theme of one categorized error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTheme {
    pub game_id: String,
    pub ply: u32,
    pub theme: String,
}

/// Analysis results: one header per game plus one row per analyzed ply.
///
/// Saving is an upsert keyed on `(game_id, ply)`; the last writer wins.
pub trait AnalysisRepository: Send + Sync {
    fn save_analysis(
        &self,
        result: &GameAnalysisResult,
        user_id: Option<&str>,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn load_analysis(
        &self,
        game_id: &str,
    ) -> impl Future<Output = Result<Option<GameAnalysisResult>, PersistenceError>> + Send;
    /// Categorized errors of one game, by ply.
    fn error_themes(
        &self,
        game_id: &str,
    ) -> impl Future<Output = Result<Vec<ErrorTheme>, PersistenceError>> + Send;
    /// Categorized errors across every game owned by `user_id`.
    fn error_themes_for_user(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<ErrorTheme>, PersistenceError>> + Send;
    fn delete_analysis(
        &self,
        game_id: &str,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Per-user puzzle attempt history. Rows are never deleted.
pub trait ProgressRepository: Send + Sync {
    fn load_progress(
        &self,
        puzzle_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<ProgressRecord>, PersistenceError>> + Send;
    fn save_progress(
        &self,
        record: &ProgressRecord,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn progress_for_user(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<ProgressRecord>, PersistenceError>> + Send;
}

pub trait LinkRepository: Send + Sync {
    fn save_links(
        &self,
        links: &[BlunderPuzzleLink],
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn links_for_game(
        &self,
        game_id: &str,
    ) -> impl Future<Output = Result<Vec<BlunderPuzzleLink>, PersistenceError>> + Send;
}
