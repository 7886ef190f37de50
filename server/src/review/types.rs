use analysis::ClassificationConfig;
use serde::{Deserialize, Serialize};

/// One played move as submitted: UCI (`e2e4`, `e1g1`) or SAN (`Nf3`, `O-O`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedMove {
    pub notation: String,
    /// Position after the move, when the caller knows it. Lets analysis
    /// continue past a move that cannot be replayed.
    #[serde(default)]
    pub fen_after: Option<String>,
}

impl From<&str> for PlayedMove {
    fn from(notation: &str) -> Self {
        Self {
            notation: notation.to_string(),
            fen_after: None,
        }
    }
}

/// A game to analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub game_id: String,
    /// Starting position; the standard start when absent.
    #[serde(default)]
    pub start_fen: Option<String>,
    pub moves: Vec<PlayedMove>,
}

impl AnalysisRequest {
    pub fn new<'a>(
        game_id: impl Into<String>,
        start_fen: Option<String>,
        moves: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            start_fen,
            moves: moves.into_iter().map(PlayedMove::from).collect(),
        }
    }
}

/// Observable queue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueState {
    Idle,
    /// At least one submitted request has not completed.
    Draining,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("analysis queue is shut down")]
    Closed,
    #[error("analysis worker failed: {0}")]
    Worker(String),
}

/// Configuration for the analysis queue.
#[derive(Debug, Clone)]
pub struct AnalysisQueueConfig {
    /// Engine depth per position.
    pub depth: u32,
    /// Ranked alternatives per position; zero skips the multi-line search.
    pub max_alternatives: usize,
    pub classification: ClassificationConfig,
    /// Submissions buffered before `submit` waits.
    pub capacity: usize,
}

impl Default for AnalysisQueueConfig {
    fn default() -> Self {
        Self {
            depth: 15,
            max_alternatives: 3,
            classification: ClassificationConfig::default(),
            capacity: 64,
        }
    }
}
