pub mod assess;
pub mod attack_map;
pub mod detector;
pub mod discovered_attack_detector;
pub mod fork_detector;
pub mod hanging_detector;
pub mod helpers;
pub mod king_safety;
pub mod pin_detector;
pub mod skewer_detector;
pub mod tactical_types;

pub use assess::{assess_move, TacticalFinding, TACTICAL_STAKE_THRESHOLD};
pub use attack_map::{AttackMap, Attacker, LineRelation};
pub use detector::{MoveSnapshot, TacticalContext, TacticalDetector};
pub use king_safety::{exposure_increase, king_exposure, KingExposure};
pub use tactical_types::{TacticalTag, TacticalTagKind};
