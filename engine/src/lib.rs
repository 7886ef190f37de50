pub mod alternatives;
pub mod error;
pub mod stockfish;
pub mod traits;
pub mod uci;

pub use alternatives::{aggregate_alternatives, MAX_PV_MOVES};
pub use error::EngineError;
pub use stockfish::{find_stockfish_path, EngineConfig, EngineProcess};
pub use traits::AnalysisEngine;
pub use uci::{ScoreBound, UciError, UciMessage};

use chess::AnalysisScore;
use cozy_chess::Move;
use serde::{Deserialize, Serialize};

/// Events received from the engine's stdout reader task
#[derive(Debug, Clone)]
pub enum EngineEvent {
    UciOk,
    ReadyOk,
    BestMove(Option<Move>),
    Info(EngineInfo),
}

/// Engine analysis information
#[derive(Debug, Clone, Default)]
pub struct EngineInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    pub score: Option<AnalysisScore>,
    pub bound: ScoreBound,
    pub pv: Vec<Move>, // Principal variation
    pub multipv: Option<u32>,
    pub currmove: Option<Move>,
    pub hashfull: Option<u16>,
    pub nps: Option<u64>,
}

/// Frame of reference for a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Perspective {
    /// Positive means the side to move is better (raw engine output).
    SideToMove,
    /// Positive means White is better (storage frame).
    White,
}

/// Result of a single-line search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Best move in UCI notation; `None` when the position has no legal moves.
    pub best_move: Option<String>,
    pub score: AnalysisScore,
    pub depth: u32,
    pub perspective: Perspective,
    /// Principal variation in UCI notation.
    pub pv: Vec<String>,
    /// The deadline expired and this is the best partial report.
    pub timed_out: bool,
}

/// One ranked candidate from a multi-PV search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeLine {
    #[serde(rename = "move")]
    pub mv: String,
    pub evaluation: AnalysisScore,
    pub search_depth: u32,
    pub principal_variation: Vec<String>,
    pub rank: u32,
}
