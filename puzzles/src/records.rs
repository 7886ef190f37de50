use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Public page used when a puzzle cannot be fetched.
pub const TRAINING_URL: &str = "https://lichess.org/training";

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// The fields the matcher needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleIndexEntry {
    pub id: String,
    pub themes: Vec<String>,
    pub rating: u32,
    pub popularity: i32,
}

/// A puzzle as stored in the cache. Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPuzzle {
    pub id: String,
    /// Position the solver faces; empty for stubs.
    pub fen: String,
    /// Solution in UCI notation.
    pub solution_moves: Vec<String>,
    pub themes: Vec<String>,
    pub rating: u32,
    pub popularity: i32,
    pub game_url: String,
    pub cached_at: i64,
    pub last_accessed: i64,
}

impl CachedPuzzle {
    /// Placeholder pointing at the puzzle's public page.
    pub fn stub(id: &str, now: i64) -> Self {
        Self {
            id: id.to_string(),
            fen: String::new(),
            solution_moves: Vec::new(),
            themes: Vec::new(),
            rating: 0,
            popularity: 0,
            game_url: format!("{TRAINING_URL}/{id}"),
            cached_at: now,
            last_accessed: now,
        }
    }

    pub fn is_stub(&self) -> bool {
        self.fen.is_empty()
    }

    pub fn index_entry(&self) -> PuzzleIndexEntry {
        PuzzleIndexEntry {
            id: self.id.clone(),
            themes: self.themes.clone(),
            rating: self.rating,
            popularity: self.popularity,
        }
    }
}

/// A user's history with one puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub puzzle_id: String,
    pub user_id: String,
    pub attempts: u32,
    /// Solved at least once.
    pub solved: bool,
    pub first_attempt_correct: bool,
    pub total_time_ms: u64,
    /// Consecutive successful attempts, reset by a failure.
    pub streak: u32,
    pub last_attempt_at: i64,
}

impl ProgressRecord {
    pub fn new(puzzle_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            puzzle_id: puzzle_id.into(),
            user_id: user_id.into(),
            attempts: 0,
            solved: false,
            first_attempt_correct: false,
            total_time_ms: 0,
            streak: 0,
            last_attempt_at: 0,
        }
    }

    pub fn record_attempt(&mut self, solved: bool, time_ms: u64, at: i64) {
        if self.attempts == 0 {
            self.first_attempt_correct = solved;
        }
        self.attempts += 1;
        self.solved |= solved;
        self.streak = if solved { self.streak + 1 } else { 0 };
        self.total_time_ms = self.total_time_ms.saturating_add(time_ms);
        self.last_attempt_at = at;
    }

    pub fn average_time_ms(&self) -> Option<u64> {
        (self.attempts > 0).then(|| self.total_time_ms / u64::from(self.attempts))
    }
}

/// Association between an analyzed error and a training puzzle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlunderPuzzleLink {
    pub game_id: String,
    pub ply: u32,
    pub puzzle_id: String,
    pub match_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_points_at_training_page() {
        let stub = CachedPuzzle::stub("abc12", 5);
        assert!(stub.is_stub());
        assert_eq!(stub.game_url, "https://lichess.org/training/abc12");
    }

    #[test]
    fn attempts_track_streak_and_first_try() {
        let mut progress = ProgressRecord::new("p1", "u1");
        progress.record_attempt(false, 40_000, 10);
        progress.record_attempt(true, 20_000, 20);
        progress.record_attempt(true, 30_000, 30);

        assert_eq!(progress.attempts, 3);
        assert!(progress.solved);
        assert!(!progress.first_attempt_correct);
        assert_eq!(progress.streak, 2);
        assert_eq!(progress.average_time_ms(), Some(30_000));
        assert_eq!(progress.last_attempt_at, 30);

        progress.record_attempt(false, 10_000, 40);
        assert_eq!(progress.streak, 0);
        assert!(progress.solved);
    }
}
