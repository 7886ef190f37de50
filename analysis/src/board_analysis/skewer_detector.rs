use super::attack_map::LineRelation;
use super::detector::{TacticalContext, TacticalDetector};
use super::helpers::{attackers_of, piece_value};
use super::tactical_types::{TacticalTag, TacticalTagKind};

/// Detects skewers: a slider attacks a valuable enemy piece (or the king) that
/// must move away, exposing a lesser piece on the same ray.
pub struct SkewerDetector;

impl TacticalDetector for SkewerDetector {
    fn detect(&self, ctx: &TacticalContext) -> Vec<TacticalTag> {
        ctx.after_attacks
            .lines_for(ctx.mover)
            .filter(|line| line.is_skewer())
            .filter(|line| ctx.mv.is_none() || !ctx.before_attacks.has_line(ctx.mover, line))
            .filter_map(|line| skewer_to_tag(ctx, line))
            .collect()
    }
}

fn skewer_to_tag(ctx: &TacticalContext, line: &LineRelation) -> Option<TacticalTag> {
    let back_value = piece_value(line.back_piece);
    let slider_value = piece_value(line.slider.piece);
    // the front piece stops guarding the ray once it steps off it
    let back_undefended = attackers_of(ctx.after, line.back, !ctx.mover)
        .into_iter()
        .all(|sq| sq == line.front);

    let stake = if back_undefended {
        back_value
    } else {
        back_value.saturating_sub(slider_value)
    };
    if stake == 0 {
        return None;
    }

    let is_king_skewer = line.front_piece == cozy_chess::Piece::King;
    Some(TacticalTag {
        kind: TacticalTagKind::Skewer,
        attacker: Some(line.slider.from.to_string()),
        victims: vec![line.front.to_string(), line.back.to_string()],
        target_square: Some(line.back.to_string()),
        material_at_stake: stake,
        confidence: if is_king_skewer { 0.9 } else { 0.75 },
        note: Some(format!(
            "skewer: {} attacks {} through to {}",
            line.slider.piece, line.front, line.back
        )),
    })
}
