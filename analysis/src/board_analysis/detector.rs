use cozy_chess::{Board, Color, Move};

use super::attack_map::AttackMap;
use super::tactical_types::TacticalTag;

/// Pre-computed context passed to every tactical detector.
///
/// Detectors look for patterns that `mover` has on the *after* board. When a
/// move is known, relations that already existed on the *before* board are not
/// reported again.
pub struct TacticalContext<'a> {
    pub before: &'a Board,
    pub after: &'a Board,
    /// The move that produced `after`, if any.
    pub mv: Option<Move>,
    /// Side whose patterns are being looked for.
    pub mover: Color,
    pub before_attacks: &'a AttackMap,
    pub after_attacks: &'a AttackMap,
}

/// A modular tactical pattern detector.
pub trait TacticalDetector {
    fn detect(&self, ctx: &TacticalContext) -> Vec<TacticalTag>;
}

/// Owned boards and attack maps for one move, so contexts can borrow from it.
pub struct MoveSnapshot {
    before: Board,
    after: Board,
    mv: Option<Move>,
    mover: Color,
    before_attacks: AttackMap,
    after_attacks: AttackMap,
}

impl MoveSnapshot {
    /// Snapshot of `mv` played on `before`. `None` if the move is illegal.
    pub fn after_move(before: &Board, mv: Move) -> Option<Self> {
        let mut after = before.clone();
        after.try_play(mv).ok()?;
        Some(Self {
            before_attacks: AttackMap::compute(before),
            after_attacks: AttackMap::compute(&after),
            mover: before.side_to_move(),
            before: before.clone(),
            after,
            mv: Some(mv),
        })
    }

    /// A single position inspected for patterns `mover` already has.
    pub fn static_position(board: &Board, mover: Color) -> Self {
        let attacks = AttackMap::compute(board);
        Self {
            before: board.clone(),
            after: board.clone(),
            mv: None,
            mover,
            before_attacks: attacks.clone(),
            after_attacks: attacks,
        }
    }

    pub fn after(&self) -> &Board {
        &self.after
    }

    pub fn context(&self) -> TacticalContext<'_> {
        TacticalContext {
            before: &self.before,
            after: &self.after,
            mv: self.mv,
            mover: self.mover,
            before_attacks: &self.before_attacks,
            after_attacks: &self.after_attacks,
        }
    }
}
