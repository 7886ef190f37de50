use cozy_chess::Piece;

use super::attack_map::LineRelation;
use super::detector::{TacticalContext, TacticalDetector};
use super::helpers::{attackers_of, piece_value};
use super::tactical_types::{TacticalTag, TacticalTagKind};

/// Detects pins: a slider of the mover lined up with a lesser enemy piece in
/// front of a more valuable one (or the king).
pub struct PinDetector;

impl TacticalDetector for PinDetector {
    fn detect(&self, ctx: &TacticalContext) -> Vec<TacticalTag> {
        ctx.after_attacks
            .pins_by(ctx.mover)
            .filter(|pin| ctx.mv.is_none() || !ctx.before_attacks.has_line(ctx.mover, pin))
            .filter_map(|pin| pin_to_tag(ctx, pin))
            .collect()
    }
}

fn pin_to_tag(ctx: &TacticalContext, pin: &LineRelation) -> Option<TacticalTag> {
    let pinned_value = piece_value(pin.front_piece);
    let pinner_value = piece_value(pin.slider.piece);
    let undefended = attackers_of(ctx.after, pin.front, !ctx.mover).is_empty();

    // A pin only wins material when the pinned piece is worth taking.
    if pin.front_piece == Piece::Pawn || !(undefended || pinned_value > pinner_value) {
        return None;
    }

    let is_absolute = pin.back_piece == Piece::King;
    Some(TacticalTag {
        kind: TacticalTagKind::Pin,
        attacker: Some(pin.slider.from.to_string()),
        victims: vec![pin.front.to_string()],
        target_square: Some(pin.back.to_string()),
        material_at_stake: if undefended {
            pinned_value
        } else {
            pinned_value - pinner_value
        },
        confidence: if is_absolute { 1.0 } else { 0.8 },
        note: Some(if is_absolute {
            format!("absolute pin: {} pins {} to king", pin.slider.piece, pin.front)
        } else {
            format!(
                "relative pin: {} pins {} to {}",
                pin.slider.piece, pin.front, pin.back
            )
        }),
    })
}

#[cfg(test)]
mod tests {
    use cozy_chess::{Board, Color};

    use super::*;
    use crate::board_analysis::detector::MoveSnapshot;

    #[test]
    fn detects_absolute_pin_on_undefended_knight() {
        let board: Board = "4k3/8/2n5/8/B7/8/8/4K3 w - - 0 1".parse().unwrap();
        let snapshot = MoveSnapshot::static_position(&board, Color::White);
        let tags = PinDetector.detect(&snapshot.context());

        assert_eq!(tags.len(), 1);
        let pin = &tags[0];
        assert_eq!(pin.attacker.as_deref(), Some("a4"));
        assert_eq!(pin.victims, vec!["c6".to_string()]);
        assert_eq!(pin.target_square.as_deref(), Some("e8"));
        assert_eq!(pin.material_at_stake, 320);
        assert_eq!(pin.confidence, 1.0);
    }

    #[test]
    fn defended_equal_piece_pin_is_not_reported() {
        // Bishop pins the knight, but b7 pawn defends it and knight < bishop
        let board: Board = "4k3/1p6/2n5/8/B7/8/8/4K3 w - - 0 1".parse().unwrap();
        let snapshot = MoveSnapshot::static_position(&board, Color::White);
        assert!(PinDetector.detect(&snapshot.context()).is_empty());
    }

    #[test]
    fn relative_pin_against_queen() {
        // Rook a1 pins the defended knight on a4 to the queen on a8
        let board: Board = "q3k3/8/8/1p6/n7/8/8/R3K3 w - - 0 1".parse().unwrap();
        let snapshot = MoveSnapshot::static_position(&board, Color::White);
        let tags = PinDetector.detect(&snapshot.context());
        assert!(tags.is_empty(), "knight is worth less than the rook and defended");
    }

    #[test]
    fn existing_pins_are_not_new_after_a_move() {
        let before: Board = "4k3/8/2n5/8/B7/8/8/4K3 w - - 0 1".parse().unwrap();
        let mv = chess::uci::parse_legal_uci_move(&before, "e1d2").unwrap();
        let snapshot = MoveSnapshot::after_move(&before, mv).unwrap();
        assert!(PinDetector.detect(&snapshot.context()).is_empty());
    }

    #[test]
    fn move_that_creates_the_pin_is_reported() {
        let before: Board = "4k3/8/2n5/8/8/8/8/3BK3 w - - 0 1".parse().unwrap();
        let mv = chess::uci::parse_legal_uci_move(&before, "d1a4").unwrap();
        let snapshot = MoveSnapshot::after_move(&before, mv).unwrap();
        let tags = PinDetector.detect(&snapshot.context());
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].kind, TacticalTagKind::Pin);
    }
}
