//! Labels an erroneous move with phase, theme, position type, severity and a
//! difficulty level for puzzle selection.

use cozy_chess::{BitBoard, Board, Color, File, Move, Piece};
use serde::{Deserialize, Serialize};

use crate::board_analysis::helpers::{attackers_of, non_pawn_material};
use crate::board_analysis::{exposure_increase, TacticalFinding, TacticalTagKind};

/// Combined non-pawn material (both sides) at or below which the game is
/// treated as an endgame regardless of move number.
pub const ENDGAME_MATERIAL: u16 = 2600;

/// King exposure increase that counts as a king-safety error.
const KING_SAFETY_DELTA: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TacticalTheme {
    HangingPiece,
    MissedFork,
    MissedPin,
    MissedSkewer,
    MissedDiscovery,
    KingSafety,
    WeakPawnStructure,
    BadPiecePlacement,
    WrongCapture,
    Positional,
}

impl TacticalTheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HangingPiece => "hanging_piece",
            Self::MissedFork => "missed_fork",
            Self::MissedPin => "missed_pin",
            Self::MissedSkewer => "missed_skewer",
            Self::MissedDiscovery => "missed_discovery",
            Self::KingSafety => "king_safety",
            Self::WeakPawnStructure => "weak_pawn_structure",
            Self::BadPiecePlacement => "bad_piece_placement",
            Self::WrongCapture => "wrong_capture",
            Self::Positional => "positional",
        }
    }

    /// Themes decided by concrete tactics rather than judgement.
    pub fn is_tactical(self) -> bool {
        matches!(
            self,
            Self::HangingPiece
                | Self::MissedFork
                | Self::MissedPin
                | Self::MissedSkewer
                | Self::MissedDiscovery
                | Self::WrongCapture
        )
    }

    fn from_tag_kind(kind: TacticalTagKind) -> Self {
        match kind {
            TacticalTagKind::HangingPiece => Self::HangingPiece,
            TacticalTagKind::Fork => Self::MissedFork,
            TacticalTagKind::Pin => Self::MissedPin,
            TacticalTagKind::Skewer => Self::MissedSkewer,
            TacticalTagKind::DiscoveredAttack => Self::MissedDiscovery,
        }
    }
}

impl std::fmt::Display for TacticalTheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionType {
    Tactical,
    Positional,
    EndgameTechnique,
    KingAttack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
    Critical,
}

impl Severity {
    pub fn from_centipawn_loss(loss: i32) -> Self {
        match loss {
            l if l < 100 => Self::Minor,
            l if l < 300 => Self::Moderate,
            l if l < 600 => Self::Major,
            _ => Self::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlunderCategorization {
    pub phase: GamePhase,
    pub tactical_theme: TacticalTheme,
    pub position_type: PositionType,
    pub severity: Severity,
    /// 1 (easy to spot) to 5 (hard).
    pub difficulty_level: u8,
}

/// Everything the categorizer looks at for one move.
#[derive(Debug, Clone, Copy)]
pub struct CategorizationInput<'a> {
    pub before: &'a Board,
    pub played: Move,
    pub best: Option<Move>,
    /// 1-based ply of the played move.
    pub ply: u32,
    pub centipawn_loss: i32,
    /// The move lets the opponent force mate.
    pub allows_mate: bool,
    pub finding: TacticalFinding,
}

pub fn game_phase(board: &Board, ply: u32) -> GamePhase {
    let material = non_pawn_material(board, Color::White) + non_pawn_material(board, Color::Black);
    if material <= ENDGAME_MATERIAL {
        return GamePhase::Endgame;
    }
    match ply {
        0..=20 => GamePhase::Opening,
        21..=60 => GamePhase::Middlegame,
        _ => GamePhase::Endgame,
    }
}

/// Categorize one move. Returns `None` for an illegal `played` move.
pub fn categorize(input: &CategorizationInput) -> Option<BlunderCategorization> {
    let mover = input.before.side_to_move();
    let mut after = input.before.clone();
    after.try_play(input.played).ok()?;

    let phase = game_phase(input.before, input.ply);
    let theme = tactical_theme(input, &after, mover);

    let position_type = if phase == GamePhase::Endgame {
        PositionType::EndgameTechnique
    } else if theme == TacticalTheme::KingSafety || input.allows_mate {
        PositionType::KingAttack
    } else if theme.is_tactical() || input.centipawn_loss >= 200 {
        PositionType::Tactical
    } else {
        PositionType::Positional
    };

    Some(BlunderCategorization {
        phase,
        tactical_theme: theme,
        position_type,
        severity: Severity::from_centipawn_loss(input.centipawn_loss),
        difficulty_level: difficulty(input.centipawn_loss, phase, theme),
    })
}

fn tactical_theme(input: &CategorizationInput, after: &Board, mover: Color) -> TacticalTheme {
    if let Some(kind) = input.finding.kind() {
        return TacticalTheme::from_tag_kind(kind);
    }
    if exposure_increase(input.before, after, mover) >= KING_SAFETY_DELTA {
        return TacticalTheme::KingSafety;
    }
    if pawn_weaknesses(after, mover) > pawn_weaknesses(input.before, mover) {
        return TacticalTheme::WeakPawnStructure;
    }
    if is_bad_placement(input.before, after, input.played, mover) {
        return TacticalTheme::BadPiecePlacement;
    }
    let is_capture = input.before.colors(!mover).has(input.played.to);
    if is_capture && input.best.is_some_and(|best| best != input.played) {
        return TacticalTheme::WrongCapture;
    }
    TacticalTheme::Positional
}

/// Doubled plus isolated pawns of `color`.
pub fn pawn_weaknesses(board: &Board, color: Color) -> u8 {
    let pawns = board.pieces(Piece::Pawn) & board.colors(color);
    let mut weaknesses = 0u8;
    for file in File::ALL {
        let on_file = (pawns & file.bitboard()).len() as u8;
        if on_file == 0 {
            continue;
        }
        weaknesses += on_file - 1;
        if (pawns & adjacent_files(file)).is_empty() {
            weaknesses += on_file;
        }
    }
    weaknesses
}

fn adjacent_files(file: File) -> BitBoard {
    let index = file as usize;
    let mut bb = BitBoard::EMPTY;
    if index > 0 {
        bb |= File::index(index - 1).bitboard();
    }
    if index < 7 {
        bb |= File::index(index + 1).bitboard();
    }
    bb
}

/// A knight moved to the rim, or a piece moved where an enemy pawn hits it.
fn is_bad_placement(before: &Board, after: &Board, mv: Move, mover: Color) -> bool {
    let Some(piece) = before.piece_on(mv.from) else {
        return false;
    };
    if matches!(piece, Piece::Pawn | Piece::King) {
        return false;
    }
    if piece == Piece::Knight && matches!(mv.to.file(), File::A | File::H) {
        return true;
    }
    let enemy_pawns = after.pieces(Piece::Pawn) & after.colors(!mover);
    !(attackers_of(after, mv.to, !mover) & enemy_pawns).is_empty()
}

fn difficulty(loss: i32, phase: GamePhase, theme: TacticalTheme) -> u8 {
    let mut level: i32 = 1;
    level += i32::from(loss >= 100) + i32::from(loss >= 250) + i32::from(loss >= 500);
    if phase == GamePhase::Endgame {
        level += 1;
    }
    if matches!(theme, TacticalTheme::HangingPiece | TacticalTheme::WrongCapture) {
        level -= 1;
    }
    level.clamp(1, 5) as u8
}
