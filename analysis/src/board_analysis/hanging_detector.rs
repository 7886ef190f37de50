use cozy_chess::Piece;

use super::detector::{TacticalContext, TacticalDetector};
use super::helpers::{attackers_of, cheapest_attacker, piece_value};
use super::tactical_types::{TacticalTag, TacticalTagKind};

/// Detects hanging pieces: enemy pieces the mover attacks that are either
/// undefended or attacked by something cheaper.
pub struct HangingPieceDetector;

impl TacticalDetector for HangingPieceDetector {
    fn detect(&self, ctx: &TacticalContext) -> Vec<TacticalTag> {
        let mover = ctx.mover;
        let enemy = !mover;

        let mut tags = Vec::new();

        // Pawns are too noisy; kings cannot hang.
        for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
            let targets = ctx.after.pieces(piece) & ctx.after.colors(enemy);
            for sq in targets {
                let attackers = attackers_of(ctx.after, sq, mover);
                if attackers.is_empty() {
                    continue;
                }
                let defenders = attackers_of(ctx.after, sq, enemy);
                let value = piece_value(piece);

                let (stake, confidence, label) = if defenders.is_empty() {
                    (value, 0.95, "undefended")
                } else {
                    let cheapest = cheapest_attacker(ctx.after, attackers).unwrap_or(value);
                    match value.checked_sub(cheapest) {
                        Some(gain) if gain > 0 => (gain, 0.7, "attacked by a cheaper piece"),
                        _ => continue,
                    }
                };

                tags.push(TacticalTag {
                    kind: TacticalTagKind::HangingPiece,
                    attacker: None,
                    victims: vec![sq.to_string()],
                    target_square: Some(sq.to_string()),
                    material_at_stake: stake,
                    confidence,
                    note: Some(format!(
                        "hanging {} on {}: {} attackers, {} defenders ({})",
                        piece,
                        sq,
                        attackers.len(),
                        defenders.len(),
                        label
                    )),
                });
            }
        }

        tags
    }
}
