//! Engine score types and the integer encoding used for storage.

use serde::{Deserialize, Serialize};

/// Magnitude used to encode "mate now". Mate scores are stored as
/// `±(MATE_SCORE - plies_to_mate)`.
pub const MATE_SCORE: i32 = 10_000;

/// Encoded values with `|v| >= MATE_BAND` are mate scores. Ordinary
/// centipawn values are clamped below it.
pub const MATE_BAND: i32 = 9_000;

/// Engine evaluation score.
///
/// Centipawns: positive = side-to-move is better.
/// Mate: positive N = side-to-move mates in N moves,
/// negative N = side-to-move gets mated in N moves,
/// zero = side-to-move is checkmated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisScore {
    Centipawns(i32),
    Mate(i32),
}

impl AnalysisScore {
    pub fn display(&self) -> String {
        match self {
            Self::Centipawns(cp) => format!("{:+.2}", *cp as f64 / 100.0),
            Self::Mate(m) => {
                if *m > 0 {
                    format!("+M{}", m)
                } else {
                    format!("-M{}", m.abs())
                }
            }
        }
    }

    /// Encode as a single integer. Mate scores land in the reserved band,
    /// closer mates are further from zero.
    pub fn to_cp(&self) -> i32 {
        match *self {
            Self::Centipawns(cp) => cp.clamp(-(MATE_BAND - 1), MATE_BAND - 1),
            Self::Mate(m) => {
                let plies = mate_moves_to_plies(m);
                if m > 0 {
                    MATE_SCORE - plies
                } else {
                    -(MATE_SCORE - plies)
                }
            }
        }
    }

    /// Decode an integer produced by [`AnalysisScore::to_cp`].
    pub fn from_cp(value: i32) -> Self {
        if value.abs() < MATE_BAND {
            return Self::Centipawns(value);
        }
        let plies = (MATE_SCORE - value.abs()).max(0);
        if value > 0 {
            Self::Mate((plies + 1) / 2)
        } else {
            Self::Mate(-(plies / 2))
        }
    }

    /// Negate the score (flip perspective).
    pub fn negate(&self) -> Self {
        match self {
            Self::Centipawns(cp) => Self::Centipawns(-cp),
            Self::Mate(m) => Self::Mate(-m),
        }
    }

    pub fn is_mate(&self) -> bool {
        matches!(self, Self::Mate(_))
    }
}

/// UCI reports mate in moves. Side to move mating in N takes 2N-1 plies,
/// being mated in N takes 2N plies.
fn mate_moves_to_plies(moves: i32) -> i32 {
    if moves > 0 {
        2 * moves - 1
    } else {
        2 * moves.abs()
    }
}

/// Returns true if the given 1-indexed ply belongs to White.
/// Convention: odd plies (1, 3, 5, …) are White moves; even plies (2, 4, 6, …) are Black.
pub fn is_white_ply(ply: u32) -> bool {
    ply % 2 == 1
}

impl std::fmt::Display for AnalysisScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
