//! Perspective conversion and centipawn loss.
//!
//! The engine reports scores relative to the side to move. Everything that is
//! stored uses a fixed reference side (White, the side that moves first in the
//! standard start position). Per-move quality is measured from the mover's side.

use chess::{AnalysisScore, MATE_BAND, MATE_SCORE};
use engine::{AlternativeLine, EvaluationResult, Perspective};

/// Convert a side-to-move evaluation into the reference (White) frame.
pub fn to_reference_perspective(eval_stm: i32, stm_is_first: bool) -> i32 {
    if stm_is_first {
        eval_stm
    } else {
        -eval_stm
    }
}

/// Convert a reference-frame evaluation into the given mover's frame.
pub fn to_mover_perspective(eval_ref: i32, mover_is_first: bool) -> i32 {
    if mover_is_first {
        eval_ref
    } else {
        -eval_ref
    }
}

/// How much the mover's evaluation dropped across the move. Never negative.
pub fn centipawn_loss(before_ref: i32, after_ref: i32, mover_is_first: bool) -> i32 {
    let before = to_mover_perspective(before_ref, mover_is_first);
    let after = to_mover_perspective(after_ref, mover_is_first);
    before.saturating_sub(after).max(0)
}

/// Signed plies to mate for an encoded evaluation, `None` outside the mate band.
///
/// Positive means the side the value is expressed for delivers mate; negative
/// means it gets mated. `Some(0)` is a position that is already mate.
pub fn mate_distance(eval: i32) -> Option<i32> {
    if eval.abs() < MATE_BAND {
        return None;
    }
    let plies = (MATE_SCORE - eval.abs()).max(0);
    Some(if eval > 0 { plies } else { -plies })
}

/// True when `eval` says the side it is expressed for is getting mated.
pub fn is_being_mated(eval: i32) -> bool {
    eval <= -MATE_BAND
}

/// Re-express an engine result in the White frame.
pub fn normalize_evaluation(result: &EvaluationResult, white_to_move: bool) -> EvaluationResult {
    if result.perspective == Perspective::White {
        return result.clone();
    }
    let score = if white_to_move {
        result.score
    } else {
        result.score.negate()
    };
    EvaluationResult {
        score,
        perspective: Perspective::White,
        ..result.clone()
    }
}

/// Encoded White-frame value of an engine result.
pub fn reference_value(result: &EvaluationResult, white_to_move: bool) -> i32 {
    normalize_evaluation(result, white_to_move).score.to_cp()
}

/// Re-express ranked alternatives, scored for the side to move, in the White frame.
pub fn normalize_alternatives(lines: Vec<AlternativeLine>, white_to_move: bool) -> Vec<AlternativeLine> {
    if white_to_move {
        return lines;
    }
    lines
        .into_iter()
        .map(|line| AlternativeLine {
            evaluation: line.evaluation.negate(),
            ..line
        })
        .collect()
}

/// Encoded value for a position with no legal moves, from White's frame.
pub fn terminal_value(checkmate: bool, white_to_move: bool) -> i32 {
    if !checkmate {
        return 0;
    }
    to_reference_perspective(AnalysisScore::Mate(0).to_cp(), white_to_move)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn black_to_move_flips_sign() {
        assert_eq!(to_reference_perspective(50, true), 50);
        assert_eq!(to_reference_perspective(50, false), -50);
        assert_eq!(to_mover_perspective(-120, false), 120);
    }

    #[test]
    fn loss_is_measured_for_the_mover() {
        // White drops from +100 to -50
        assert_eq!(centipawn_loss(100, -50, true), 150);
        // Black improves its position when White's eval drops
        assert_eq!(centipawn_loss(100, -50, false), 0);
        // Black drops from -200 (good for black) to +100
        assert_eq!(centipawn_loss(-200, 100, false), 300);
    }

    #[test]
    fn mate_distance_decodes_band() {
        assert_eq!(mate_distance(150), None);
        assert_eq!(mate_distance(AnalysisScore::Mate(2).to_cp()), Some(3));
        assert_eq!(mate_distance(AnalysisScore::Mate(-2).to_cp()), Some(-4));
        assert_eq!(mate_distance(-MATE_SCORE), Some(0));
        assert!(is_being_mated(AnalysisScore::Mate(-1).to_cp()));
        assert!(!is_being_mated(-8000));
    }

    #[test]
    fn terminal_positions() {
        assert_eq!(terminal_value(false, true), 0);
        // White to move and mated
        assert_eq!(terminal_value(true, true), -MATE_SCORE);
        assert_eq!(terminal_value(true, false), MATE_SCORE);
    }

    #[test]
    fn normalize_flips_black_results_once() {
        let raw = EvaluationResult {
            best_move: Some("e7e5".into()),
            score: AnalysisScore::Centipawns(40),
            depth: 12,
            perspective: Perspective::SideToMove,
            pv: vec![],
            timed_out: false,
        };
        let white = normalize_evaluation(&raw, false);
        assert_eq!(white.score, AnalysisScore::Centipawns(-40));
        assert_eq!(white.perspective, Perspective::White);
        assert_eq!(normalize_evaluation(&white, false), white);
    }

    #[test]
    fn alternatives_are_flipped_for_black_only() {
        let lines = vec![
            AlternativeLine {
                mv: "b3d5".into(),
                evaluation: AnalysisScore::Centipawns(900),
                search_depth: 10,
                principal_variation: vec!["b3d5".into()],
                rank: 1,
            },
            AlternativeLine {
                mv: "b3b1".into(),
                evaluation: AnalysisScore::Mate(2),
                search_depth: 10,
                principal_variation: vec!["b3b1".into()],
                rank: 2,
            },
        ];
        assert_eq!(normalize_alternatives(lines.clone(), true), lines);

        let white = normalize_alternatives(lines, false);
        assert_eq!(white[0].evaluation, AnalysisScore::Centipawns(-900));
        assert_eq!(white[1].evaluation, AnalysisScore::Mate(-2));
        assert_eq!(white[1].rank, 2);
    }

    proptest! {
        #[test]
        fn perspective_conversion_is_an_involution(v in -10_000i32..=10_000, first in any::<bool>()) {
            let reference = to_reference_perspective(v, first);
            prop_assert_eq!(to_mover_perspective(reference, first), v);
        }

        #[test]
        fn loss_is_never_negative(b in -10_000i32..=10_000, a in -10_000i32..=10_000, first in any::<bool>()) {
            prop_assert!(centipawn_loss(b, a, first) >= 0);
        }
    }
}
