use cozy_chess::Color;
use engine::AlternativeLine;
use serde::{Deserialize, Serialize};

use crate::accuracy::game_accuracy;
use crate::board_analysis::TacticalFinding;
use crate::categorize::BlunderCategorization;
use crate::classification::MoveClassification;
use crate::win_probability::cp_to_win_probability;

/// Analysis result for a single played move.
///
/// Evaluations are encoded centipawns from White's point of view; win
/// probabilities and accuracy are from the mover's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveAnalysis {
    /// 1-based ply.
    pub move_number: u32,
    pub mover_is_white: bool,
    pub played_move: String,
    pub played_san: String,
    pub fen_before: String,
    pub best_move: Option<String>,
    pub best_move_san: Option<String>,
    pub evaluation_before: i32,
    pub evaluation_after: i32,
    pub centipawn_loss: i32,
    pub win_probability_before: f64,
    pub win_probability_after: f64,
    pub accuracy: f64,
    pub classification: MoveClassification,
    pub alternatives: Vec<AlternativeLine>,
    pub tactical_finding: TacticalFinding,
    pub categorization: Option<BlunderCategorization>,
    pub depth: u32,
    /// A search hit its deadline and a partial result was used.
    #[serde(default)]
    pub timed_out: bool,
}

/// A ply that could not be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPly {
    pub ply: u32,
    pub played_move: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AnalysisStatus {
    Completed,
    Failed { error: String },
}

/// Full analysis result for a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameAnalysisResult {
    pub game_id: String,
    pub status: AnalysisStatus,
    pub moves: Vec<MoveAnalysis>,
    pub skipped: Vec<SkippedPly>,
    pub white_accuracy: Option<f64>,
    pub black_accuracy: Option<f64>,
    pub total_plies: u32,
    pub analysis_depth: u32,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
}

impl GameAnalysisResult {
    pub fn failed(game_id: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            game_id: game_id.into(),
            status: AnalysisStatus::Failed {
                error: error.to_string(),
            },
            moves: Vec::new(),
            skipped: Vec::new(),
            white_accuracy: None,
            black_accuracy: None,
            total_plies: 0,
            analysis_depth: 0,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == AnalysisStatus::Completed
    }

    /// Moves that received a blunder categorization.
    pub fn errors(&self) -> impl Iterator<Item = &MoveAnalysis> {
        self.moves.iter().filter(|m| m.categorization.is_some())
    }
}

/// Game accuracy for (White, Black) from the analyzed moves.
pub fn side_accuracies(moves: &[MoveAnalysis]) -> (Option<f64>, Option<f64>) {
    let Some(first) = moves.first() else {
        return (None, None);
    };
    let first_to_move = if first.mover_is_white {
        Color::White
    } else {
        Color::Black
    };

    let probs: Vec<f64> = std::iter::once(first.evaluation_before)
        .chain(moves.iter().map(|m| m.evaluation_after))
        .map(cp_to_win_probability)
        .collect();

    (
        game_accuracy(&probs, Color::White, first_to_move),
        game_accuracy(&probs, Color::Black, first_to_move),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(ply: u32, before: i32, after: i32) -> MoveAnalysis {
        MoveAnalysis {
            move_number: ply,
            mover_is_white: chess::is_white_ply(ply),
            played_move: "e2e4".into(),
            played_san: "e4".into(),
            fen_before: chess::START_FEN.into(),
            best_move: Some("e2e4".into()),
            best_move_san: Some("e4".into()),
            evaluation_before: before,
            evaluation_after: after,
            centipawn_loss: 0,
            win_probability_before: 50.0,
            win_probability_after: 50.0,
            accuracy: 100.0,
            classification: MoveClassification::Best,
            alternatives: vec![],
            tactical_finding: TacticalFinding::None,
            categorization: None,
            depth: 15,
            timed_out: false,
        }
    }

    #[test]
    fn empty_game_has_no_accuracy() {
        assert_eq!(side_accuracies(&[]), (None, None));
    }

    #[test]
    fn collapse_by_black_lowers_black_accuracy() {
        let moves = vec![
            analysis(1, 20, 25),
            analysis(2, 25, 30),
            analysis(3, 30, 35),
            analysis(4, 35, 700),
        ];
        let (white, black) = side_accuracies(&moves);
        let (white, black) = (white.unwrap(), black.unwrap());
        assert!(white > 95.0, "white {white}");
        assert!(black < white, "black {black} white {white}");
    }

    #[test]
    fn failed_result_serializes_status() {
        let result = GameAnalysisResult::failed("g1", "engine crashed");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"]["state"], "failed");
        assert_eq!(json["status"]["error"], "engine crashed");
        assert!(!result.is_completed());
    }
}
