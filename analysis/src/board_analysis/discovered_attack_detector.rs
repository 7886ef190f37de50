use cozy_chess::Piece;

use super::detector::{TacticalContext, TacticalDetector};
use super::helpers::{attackers_of, piece_value};
use super::tactical_types::{TacticalTag, TacticalTagKind};

/// Detects discovered attacks: the moved piece unmasks a friendly slider that
/// now hits an enemy piece it did not attack before.
pub struct DiscoveredAttackDetector;

impl TacticalDetector for DiscoveredAttackDetector {
    fn detect(&self, ctx: &TacticalContext) -> Vec<TacticalTag> {
        let Some(mv) = ctx.mv else {
            return vec![];
        };
        let mover = ctx.mover;
        let enemy = !mover;
        let moving_piece = ctx.before.piece_on(mv.from).unwrap_or(Piece::Pawn);

        let mut tags = Vec::new();
        for target_sq in ctx.after.colors(enemy) {
            let Some(target_piece) = ctx.after.piece_on(target_sq) else {
                continue;
            };
            if matches!(target_piece, Piece::Pawn | Piece::King) {
                continue;
            }

            let unmasked = ctx
                .after_attacks
                .attackers_of(target_sq, mover)
                .iter()
                .filter(|a| matches!(a.piece, Piece::Bishop | Piece::Rook | Piece::Queen))
                .filter(|a| a.from != mv.to)
                .filter(|a| {
                    !ctx.before_attacks
                        .attackers_of(target_sq, mover)
                        .iter()
                        .any(|b| b.from == a.from)
                });

            for slider in unmasked {
                let target_value = piece_value(target_piece);
                let undefended = attackers_of(ctx.after, target_sq, enemy).is_empty();
                let stake = if undefended {
                    target_value
                } else {
                    target_value.saturating_sub(piece_value(slider.piece))
                };
                if stake == 0 {
                    continue;
                }

                tags.push(TacticalTag {
                    kind: TacticalTagKind::DiscoveredAttack,
                    attacker: Some(slider.from.to_string()),
                    victims: vec![target_sq.to_string()],
                    target_square: Some(target_sq.to_string()),
                    material_at_stake: stake,
                    confidence: if target_value >= piece_value(Piece::Rook) {
                        0.8
                    } else {
                        0.65
                    },
                    note: Some(format!(
                        "discovered attack: {} moves, revealing {} attack on {}",
                        moving_piece, slider.piece, target_sq
                    )),
                });
            }
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
    fn knight_move_unmasks_bishop_on_queen() {
        // Bishop a1 behind the knight on c3; black queen on e5
        let before: Board = "K6k/8/8/4q3/8/2N5/8/B7 w - - 0 1".parse().unwrap();
        let mv = chess::uci::parse_legal_uci_move(&before, "c3b5").unwrap();
        let snapshot = MoveSnapshot::after_move(&before, mv).unwrap();
        let tags = DiscoveredAttackDetector.detect(&snapshot.context());

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].attacker.as_deref(), Some("a1"));
        assert_eq!(tags[0].target_square.as_deref(), Some("e5"));
        assert_eq!(tags[0].material_at_stake, 900);
        assert_eq!(tags[0].confidence, 0.8);
    }

    #[test]
    fn no_move_no_discovery() {
        let board: Board = "K6k/8/8/4q3/8/8/8/B7 w - - 0 1".parse().unwrap();
        let snapshot = MoveSnapshot::static_position(&board, Color::White);
        assert!(DiscoveredAttackDetector.detect(&snapshot.context()).is_empty());
    }

    #[test]
    fn existing_attack_is_not_a_discovery() {
        let before: Board = "K6k/8/8/4q3/8/8/8/B7 w - - 0 1".parse().unwrap();
        let mv = chess::uci::parse_legal_uci_move(&before, "a8a7").unwrap();
        let snapshot = MoveSnapshot::after_move(&before, mv).unwrap();
        assert!(DiscoveredAttackDetector.detect(&snapshot.context()).is_empty());
    }
}
