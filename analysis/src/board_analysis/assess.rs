//! Move-level tactical assessment: does the played move walk into a tactic,
//! or did the best move have one the played move passed up?

use cozy_chess::{Board, Move, Piece};
use serde::{Deserialize, Serialize};

use super::detector::{MoveSnapshot, TacticalDetector};
use super::discovered_attack_detector::DiscoveredAttackDetector;
use super::fork_detector::ForkDetector;
use super::hanging_detector::HangingPieceDetector;
use super::helpers::{attackers_of, cheapest_attacker, piece_value};
use super::pin_detector::PinDetector;
use super::skewer_detector::SkewerDetector;
use super::tactical_types::{TacticalTag, TacticalTagKind};

/// Smallest stake (centipawns) worth reporting.
pub const TACTICAL_STAKE_THRESHOLD: u16 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TacticalFinding {
    None,
    /// The played move allows the opponent a pattern winning `severity` centipawns.
    TacticalBlunder { kind: TacticalTagKind, severity: u16 },
    /// The best move had a pattern the played move did not.
    MissedOpportunity { kind: TacticalTagKind },
}

impl TacticalFinding {
    pub fn kind(&self) -> Option<TacticalTagKind> {
        match *self {
            Self::None => None,
            Self::TacticalBlunder { kind, .. } | Self::MissedOpportunity { kind } => Some(kind),
        }
    }
}

fn pattern_detectors() -> [&'static dyn TacticalDetector; 4] {
    [&ForkDetector, &PinDetector, &SkewerDetector, &DiscoveredAttackDetector]
}

/// Assess `played` (and optionally the engine's `best`) from `before`.
///
/// An illegal `played` move yields [`TacticalFinding::None`].
pub fn assess_move(before: &Board, played: Move, best: Option<Move>) -> TacticalFinding {
    let mut after = before.clone();
    if after.try_play(played).is_err() {
        return TacticalFinding::None;
    }

    let captured = captured_value(before, played);
    let mut worst: Option<(TacticalTagKind, u16)> =
        best_capture_gain(&after).map(|gain| (TacticalTagKind::HangingPiece, gain.saturating_sub(captured)));

    if let Some((kind, stake)) = strongest_reply_pattern(&after) {
        if worst.map_or(true, |(_, s)| stake > s) {
            worst = Some((kind, stake));
        }
    }

    if let Some((kind, severity)) = worst {
        if severity >= TACTICAL_STAKE_THRESHOLD {
            return TacticalFinding::TacticalBlunder { kind, severity };
        }
    }

    match best {
        Some(best) if best != played => missed_pattern(before, played, best)
            .map_or(TacticalFinding::None, |kind| TacticalFinding::MissedOpportunity { kind }),
        _ => TacticalFinding::None,
    }
}

fn captured_value(board: &Board, mv: Move) -> u16 {
    match board.piece_on(mv.to) {
        Some(piece) if board.color_on(mv.to) != Some(board.side_to_move()) => piece_value(piece),
        _ => 0,
    }
}

/// Largest material the side to move nets with a single capture, counting a
/// recapture on the same square.
fn best_capture_gain(board: &Board) -> Option<u16> {
    let us = board.side_to_move();
    let mut best = None;
    board.generate_moves(|moves| {
        for mv in moves {
            let Some(victim) = board.piece_on(mv.to) else {
                continue;
            };
            if board.color_on(mv.to) == Some(us) || victim == Piece::King {
                continue;
            }
            let mut next = board.clone();
            next.play_unchecked(mv);
            let recapture = if attackers_of(&next, mv.to, !us).is_empty() {
                0
            } else {
                piece_value(moves.piece)
            };
            let gain = piece_value(victim).saturating_sub(recapture);
            if gain > 0 && best.map_or(true, |b| gain > b) {
                best = Some(gain);
            }
        }
        false
    });
    best
}

/// The opponent's most valuable fork, pin, skewer or discovery among its replies.
fn strongest_reply_pattern(after: &Board) -> Option<(TacticalTagKind, u16)> {
    let mut replies = Vec::new();
    after.generate_moves(|moves| {
        replies.extend(moves);
        false
    });

    let mut strongest: Option<(TacticalTagKind, u16)> = None;
    for reply in replies {
        let Some(snapshot) = MoveSnapshot::after_move(after, reply) else {
            continue;
        };
        let ctx = snapshot.context();
        let en_prise_value = en_prise(snapshot.after(), reply);
        for tag in pattern_detectors().iter().flat_map(|d| d.detect(&ctx)) {
            if en_prise_value.is_some_and(|v| v >= tag.material_at_stake) {
                continue;
            }
            if strongest.map_or(true, |(_, s)| tag.material_at_stake > s) {
                strongest = Some((tag.kind, tag.material_at_stake));
            }
        }
    }
    strongest
}

/// Value of the piece that just landed on `mv.to` if it can be won back.
fn en_prise(board: &Board, mv: Move) -> Option<u16> {
    let piece = board.piece_on(mv.to)?;
    let owner = board.color_on(mv.to)?;
    let takers = attackers_of(board, mv.to, !owner);
    if takers.is_empty() {
        return None;
    }
    let value = piece_value(piece);
    let defended = !attackers_of(board, mv.to, owner).is_empty();
    let cheap_taker = cheapest_attacker(board, takers).is_some_and(|v| v < value);
    (!defended || cheap_taker).then_some(value)
}

fn significant_tags(before: &Board, mv: Move) -> Vec<TacticalTag> {
    let Some(snapshot) = MoveSnapshot::after_move(before, mv) else {
        return vec![];
    };
    let ctx = snapshot.context();
    pattern_detectors()
        .iter()
        .flat_map(|d| d.detect(&ctx))
        .filter(|t| t.material_at_stake >= TACTICAL_STAKE_THRESHOLD)
        .collect()
}

fn missed_pattern(before: &Board, played: Move, best: Move) -> Option<TacticalTagKind> {
    let played_kinds: Vec<TacticalTagKind> =
        significant_tags(before, played).iter().map(|t| t.kind).collect();
    let missed = significant_tags(before, best)
        .into_iter()
        .filter(|t| !played_kinds.contains(&t.kind))
        .max_by_key(|t| t.material_at_stake);
    if let Some(tag) = missed {
        return Some(tag.kind);
    }

    // Best move grabs a piece that was already hanging.
    let snapshot = MoveSnapshot::static_position(before, before.side_to_move());
    let hanging_target = HangingPieceDetector
        .detect(&snapshot.context())
        .into_iter()
        .any(|t| t.target_square.as_deref() == Some(best.to.to_string().as_str()));
    (hanging_target && played.to != best.to).then_some(TacticalTagKind::HangingPiece)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::uci::parse_legal_uci_move;

    fn assess(fen: &str, played: &str, best: Option<&str>) -> TacticalFinding {
        let board: Board = fen.parse().expect("valid fen");
        let played = parse_legal_uci_move(&board, played).expect("legal played");
        let best = best.map(|b| parse_legal_uci_move(&board, b).expect("legal best"));
        assess_move(&board, played, best)
    }

    #[test]
    fn quiet_opening_move_is_clean() {
        assert_eq!(assess(chess::START_FEN, "e2e4", Some("e2e4")), TacticalFinding::None);
    }

    #[test]
    fn hanging_the_queen_is_a_tactical_blunder() {
        // Qd1-h5 walks into the knight on f6
        let finding = assess(
            "rnbqkb1r/pppppppp/5n2/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 1 2",
            "d1h5",
            Some("b1c3"),
        );
        assert_eq!(
            finding,
            TacticalFinding::TacticalBlunder { kind: TacticalTagKind::HangingPiece, severity: 900 }
        );
    }

    #[test]
    fn even_trade_is_not_a_blunder() {
        // Nxd5 exd5 trades knights
        let finding = assess(
            "4k3/8/4p3/3n4/8/2N5/8/4K3 w - - 0 1",
            "c3d5",
            Some("c3d5"),
        );
        assert_eq!(finding, TacticalFinding::None);
    }

    #[test]
    fn allowing_a_knight_fork() {
        // After Rh2 the knight jumps to f3, checking the king and hitting the rook
        let finding = assess(
            "4k3/8/8/8/3n4/8/8/R3K2R w - - 0 1",
            "h1h2",
            Some("e1d2"),
        );
        match finding {
            TacticalFinding::TacticalBlunder { kind, severity } => {
                assert_eq!(kind, TacticalTagKind::Fork);
                assert_eq!(severity, 500);
            }
            other => panic!("expected fork blunder, got {other:?}"),
        }
    }

    #[test]
    fn missed_free_piece_is_reported() {
        // Bishop can take the undefended knight on d5; White pushes a pawn instead
        let finding = assess(
            "4k3/8/8/3n4/8/5B2/P7/4K3 w - - 0 1",
            "a2a3",
            Some("f3d5"),
        );
        assert_eq!(
            finding,
            TacticalFinding::MissedOpportunity { kind: TacticalTagKind::HangingPiece }
        );
    }

    #[test]
    fn illegal_move_assesses_to_none() {
        let board = Board::default();
        let mv = chess::parse_uci_move("e2e5").unwrap();
        assert_eq!(assess_move(&board, mv, None), TacticalFinding::None);
    }
}
