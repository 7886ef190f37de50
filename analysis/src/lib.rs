pub mod accuracy;
pub mod board_analysis;
pub mod categorize;
pub mod classification;
pub mod normalize;
pub mod review_types;
pub mod win_probability;

pub use accuracy::{game_accuracy, move_accuracy};
pub use board_analysis::{assess_move, TacticalFinding, TacticalTag, TacticalTagKind};
pub use categorize::{
    categorize, BlunderCategorization, CategorizationInput, GamePhase, PositionType, Severity,
    TacticalTheme,
};
pub use chess::{is_white_ply, AnalysisScore};
pub use classification::{classify, ClassificationConfig, MoveClassification, MoveContext};
pub use review_types::*;
pub use win_probability::cp_to_win_probability;
