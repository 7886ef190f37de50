use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TacticalTagKind {
    Fork,
    Pin,
    Skewer,
    DiscoveredAttack,
    HangingPiece,
}

impl TacticalTagKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fork => "fork",
            Self::Pin => "pin",
            Self::Skewer => "skewer",
            Self::DiscoveredAttack => "discovered_attack",
            Self::HangingPiece => "hanging_piece",
        }
    }
}

/// One detected pattern. Squares are in algebraic notation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacticalTag {
    pub kind: TacticalTagKind,
    pub attacker: Option<String>,
    pub victims: Vec<String>,
    pub target_square: Option<String>,
    /// Centipawns the pattern wins if the opponent cannot parry it.
    pub material_at_stake: u16,
    pub confidence: f32,
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_serializes_with_kind_name() {
        let tag = TacticalTag {
            kind: TacticalTagKind::Skewer,
            attacker: Some("c4".into()),
            victims: vec!["f7".into(), "g8".into()],
            target_square: Some("g8".into()),
            material_at_stake: 500,
            confidence: 0.75,
            note: None,
        };
        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json["kind"], "Skewer");
        assert_eq!(json["material_at_stake"], 500);
    }
}
