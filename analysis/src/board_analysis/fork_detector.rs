use cozy_chess::{Piece, Square};

use super::detector::{TacticalContext, TacticalDetector};
use super::helpers::{cheapest_attacker, attackers_of, piece_attacks, piece_value, MINOR_PIECE_VALUE};
use super::tactical_types::{TacticalTag, TacticalTagKind};

/// Detects forks: one piece attacking two or more enemy pieces that are each
/// a minor piece or better, or the king.
///
/// With a known move only the piece on the destination square is considered.
pub struct ForkDetector;

impl TacticalDetector for ForkDetector {
    fn detect(&self, ctx: &TacticalContext) -> Vec<TacticalTag> {
        let board = ctx.after;
        let mover = ctx.mover;
        let enemy = !mover;

        let candidates: Vec<Square> = match ctx.mv {
            Some(mv) => vec![mv.to],
            None => board.colors(mover).into_iter().collect(),
        };

        let mut tags = Vec::new();
        for sq in candidates {
            let Some(piece) = board.piece_on(sq) else {
                continue;
            };
            if board.color_on(sq) != Some(mover) {
                continue;
            }

            let attacks = piece_attacks(board, sq, piece, mover) & board.colors(enemy);
            let mut targets: Vec<(Square, Piece)> = attacks
                .into_iter()
                .filter_map(|t| board.piece_on(t).map(|p| (t, p)))
                .filter(|(_, p)| *p == Piece::King || piece_value(*p) >= MINOR_PIECE_VALUE)
                .collect();
            if targets.len() < 2 {
                continue;
            }

            // A forker that can simply be taken for free is no fork.
            let forker_value = piece_value(piece);
            let takers = attackers_of(board, sq, enemy);
            if !takers.is_empty() {
                let defended = !attackers_of(board, sq, mover).is_empty();
                let cheap_taker = cheapest_attacker(board, takers)
                    .is_some_and(|v| v < forker_value);
                if !defended || cheap_taker {
                    continue;
                }
            }

            targets.sort_by_key(|(_, p)| std::cmp::Reverse(piece_value(*p)));
            let has_king = targets.iter().any(|(_, p)| *p == Piece::King);
            let non_king: Vec<u16> = targets
                .iter()
                .filter(|(_, p)| *p != Piece::King)
                .map(|(_, p)| piece_value(*p))
                .collect();
            // The opponent saves the most valuable piece; the next one falls.
            let stake = if has_king {
                non_king.first().copied().unwrap_or(0)
            } else {
                non_king.get(1).copied().unwrap_or(0)
            };

            tags.push(TacticalTag {
                kind: TacticalTagKind::Fork,
                attacker: Some(sq.to_string()),
                victims: targets.iter().map(|(t, _)| t.to_string()).collect(),
                target_square: None,
                material_at_stake: stake,
                confidence: if has_king { 0.95 } else { 0.85 },
                note: Some(format!(
                    "fork: {} on {} attacks {} pieces",
                    piece,
                    sq,
                    targets.len()
                )),
            });
        }

        tags
    }
}

#[cfg(test)]
mod tests {
    use cozy_chess::{Board, Color};

    use super::*;
    use crate::board_analysis::detector::MoveSnapshot;

    #[test]
    fn detects_knight_fork_king_and_rook() {
        // White knight on f6 checks e8 and hits the rook on d7.
        let board: Board = "4k3/3r4/5N2/8/8/8/8/4K3 b - - 0 1".parse().unwrap();
        let snapshot = MoveSnapshot::static_position(&board, Color::White);
        let tags = ForkDetector.detect(&snapshot.context());

        let fork = tags
            .iter()
            .find(|t| t.attacker.as_deref() == Some("f6"))
            .expect("fork by Nf6");
        assert!(fork.victims.contains(&"e8".to_string()));
        assert!(fork.victims.contains(&"d7".to_string()));
        assert_eq!(fork.material_at_stake, 500);
        assert_eq!(fork.confidence, 0.95);
    }

    #[test]
    fn stake_is_the_second_piece_without_king() {
        // Knight d5 hits rook c7 and bishop f6
        let board: Board = "4k3/2r5/5b2/3N4/8/8/8/4K3 w - - 0 1".parse().unwrap();
        let snapshot = MoveSnapshot::static_position(&board, Color::White);
        let tags = ForkDetector.detect(&snapshot.context());
        let fork = tags
            .iter()
            .find(|t| t.attacker.as_deref() == Some("d5"))
            .unwrap();
        assert_eq!(fork.material_at_stake, 330);
        assert_eq!(fork.confidence, 0.85);
    }

    #[test]
    fn pawns_are_not_fork_targets() {
        // Knight d5 hits rook c7 and pawn e7 only
        let board: Board = "4k3/2r1p3/8/3N4/8/8/8/4K3 w - - 0 1".parse().unwrap();
        let snapshot = MoveSnapshot::static_position(&board, Color::White);
        assert!(ForkDetector.detect(&snapshot.context()).is_empty());
    }

    #[test]
    fn capturable_forker_is_ignored() {
        // Knight d5 forks c7 and f6, but the e6 pawn takes it
        let board: Board = "4k3/2r5/4pb2/3N4/8/8/8/4K3 w - - 0 1".parse().unwrap();
        let snapshot = MoveSnapshot::static_position(&board, Color::White);
        assert!(ForkDetector.detect(&snapshot.context()).is_empty());
    }

    #[test]
    fn only_the_moved_piece_counts() {
        // Nc3-d5 creates the fork; nothing else on the board forks
        let before: Board = "4k3/2r5/5b2/8/8/2N5/8/4K3 w - - 0 1".parse().unwrap();
        let mv = chess::uci::parse_legal_uci_move(&before, "c3d5").unwrap();
        let snapshot = MoveSnapshot::after_move(&before, mv).unwrap();
        let tags = ForkDetector.detect(&snapshot.context());
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].attacker.as_deref(), Some("d5"));
    }

    #[test]
    fn no_forks_starting_position() {
        let snapshot = MoveSnapshot::static_position(&Board::default(), Color::White);
        assert!(ForkDetector.detect(&snapshot.context()).is_empty());
    }
}
