//! Move labels derived from the mover's win-probability drop.

use serde::{Deserialize, Serialize};

use crate::normalize::{is_being_mated, to_mover_perspective};
use crate::win_probability::win_probability_for_mover;

/// Quality label for a played move, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MoveClassification {
    Best,
    Excellent,
    Good,
    Inaccuracy,
    /// A decisive tactic was available and not played.
    MissedOpportunity,
    Mistake,
    Blunder,
}

impl MoveClassification {
    /// Labels that get a blunder categorization.
    pub fn is_error(self) -> bool {
        matches!(self, Self::Inaccuracy | Self::Mistake | Self::Blunder)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Inaccuracy => "inaccuracy",
            Self::MissedOpportunity => "missed_opportunity",
            Self::Mistake => "mistake",
            Self::Blunder => "blunder",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "best" => Self::Best,
            "excellent" => Self::Excellent,
            "good" => Self::Good,
            "inaccuracy" => Self::Inaccuracy,
            "missed_opportunity" => Self::MissedOpportunity,
            "mistake" => Self::Mistake,
            "blunder" => Self::Blunder,
            _ => return None,
        })
    }
}

impl std::fmt::Display for MoveClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds for [`classify`]. Drops are in win-probability points (0–100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationConfig {
    pub best_max_drop: f64,
    pub excellent_max_drop: f64,
    pub good_max_drop: f64,
    pub inaccuracy_max_drop: f64,
    pub mistake_max_drop: f64,
    /// Positions with `|eval|` at or above this are already decided.
    pub contestable_threshold: i32,
    /// In a decided position, losses at or below this are not errors.
    pub materiality_floor: i32,
    /// Per-move centipawn loss is capped here before storage and averaging.
    pub max_centipawn_loss: i32,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            best_max_drop: 0.0,
            excellent_max_drop: 2.0,
            good_max_drop: 5.0,
            inaccuracy_max_drop: 10.0,
            mistake_max_drop: 20.0,
            contestable_threshold: 400,
            materiality_floor: 100,
            max_centipawn_loss: 1000,
        }
    }
}

/// Inputs for classifying one move. Evaluations are encoded White-frame values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveContext {
    pub eval_before: i32,
    pub eval_after: i32,
    pub mover_is_white: bool,
    pub played_best: bool,
    /// Capped centipawn loss for the mover.
    pub centipawn_loss: i32,
}

impl MoveContext {
    pub fn win_probability_before(&self) -> f64 {
        win_probability_for_mover(self.eval_before, self.mover_is_white)
    }

    pub fn win_probability_after(&self) -> f64 {
        win_probability_for_mover(self.eval_after, self.mover_is_white)
    }

    pub fn win_probability_drop(&self) -> f64 {
        self.win_probability_before() - self.win_probability_after()
    }

    /// The move walks into a forced mate that was not there before.
    pub fn allows_mate(&self) -> bool {
        let before = to_mover_perspective(self.eval_before, self.mover_is_white);
        let after = to_mover_perspective(self.eval_after, self.mover_is_white);
        is_being_mated(after) && !is_being_mated(before)
    }
}

pub fn classify(ctx: &MoveContext, config: &ClassificationConfig) -> MoveClassification {
    if ctx.allows_mate() {
        return MoveClassification::Blunder;
    }

    let label = band(ctx.win_probability_drop(), ctx.played_best, config);

    let decided = ctx.eval_before.abs() >= config.contestable_threshold;
    if decided && ctx.centipawn_loss <= config.materiality_floor {
        return label.min(MoveClassification::Good);
    }
    label
}

fn band(drop: f64, played_best: bool, config: &ClassificationConfig) -> MoveClassification {
    if played_best || drop <= config.best_max_drop {
        MoveClassification::Best
    } else if drop <= config.excellent_max_drop {
        MoveClassification::Excellent
    } else if drop <= config.good_max_drop {
        MoveClassification::Good
    } else if drop <= config.inaccuracy_max_drop {
        MoveClassification::Inaccuracy
    } else if drop <= config.mistake_max_drop {
        MoveClassification::Mistake
    } else {
        MoveClassification::Blunder
    }
}
