use cozy_chess::{Board, Color, Piece, Square};
use smallvec::SmallVec;

use super::helpers::{find_piece_behind, piece_attacks, piece_value};

const MAX_ATTACKERS_PER_SQUARE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attacker {
    pub from: Square,
    pub piece: Piece,
}

/// A slider of one color looking through an enemy piece at another enemy piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRelation {
    pub slider: Attacker,
    pub front: Square,
    pub front_piece: Piece,
    pub back: Square,
    pub back_piece: Piece,
}

impl LineRelation {
    /// The front piece cannot move without exposing a more valuable one.
    pub fn is_pin(&self) -> bool {
        self.back_piece == Piece::King || piece_value(self.back_piece) > piece_value(self.front_piece)
    }

    /// The front piece is worth more and must step aside, dropping the back one.
    pub fn is_skewer(&self) -> bool {
        self.front_piece == Piece::King
            || (self.back_piece != Piece::King
                && piece_value(self.front_piece) > piece_value(self.back_piece))
    }

    fn same_line(&self, other: &LineRelation) -> bool {
        self.slider.from == other.slider.from && self.front == other.front && self.back == other.back
    }
}

/// Attackers per square for both colors on a flat 64-entry grid, plus every
/// slider x-ray relation on the board.
#[derive(Debug, Clone)]
pub struct AttackMap {
    attacked_by_white: [SmallVec<[Attacker; MAX_ATTACKERS_PER_SQUARE]>; 64],
    attacked_by_black: [SmallVec<[Attacker; MAX_ATTACKERS_PER_SQUARE]>; 64],
    lines: Vec<(Color, LineRelation)>,
}

impl AttackMap {
    pub fn compute(board: &Board) -> Self {
        let mut attack_map = Self {
            attacked_by_white: std::array::from_fn(|_| SmallVec::new()),
            attacked_by_black: std::array::from_fn(|_| SmallVec::new()),
            lines: Vec::new(),
        };

        for color in [Color::White, Color::Black] {
            for piece in Piece::ALL {
                for from in board.pieces(piece) & board.colors(color) {
                    for target in piece_attacks(board, from, piece, color) {
                        let attacker = Attacker { from, piece };
                        match color {
                            Color::White => attack_map.attacked_by_white[target as usize].push(attacker),
                            Color::Black => attack_map.attacked_by_black[target as usize].push(attacker),
                        }
                    }
                }
            }
            attack_map
                .lines
                .extend(line_relations(board, color).into_iter().map(|l| (color, l)));
        }

        attack_map
    }

    pub fn attackers_of(&self, sq: Square, color: Color) -> &[Attacker] {
        match color {
            Color::White => self.attacked_by_white[sq as usize].as_slice(),
            Color::Black => self.attacked_by_black[sq as usize].as_slice(),
        }
    }

    pub fn is_attacked(&self, sq: Square, by: Color) -> bool {
        !self.attackers_of(sq, by).is_empty()
    }

    /// X-ray relations whose slider belongs to `color`.
    pub fn lines_for(&self, color: Color) -> impl Iterator<Item = &LineRelation> {
        self.lines
            .iter()
            .filter(move |(c, _)| *c == color)
            .map(|(_, l)| l)
    }

    pub fn pins_by(&self, color: Color) -> impl Iterator<Item = &LineRelation> {
        self.lines_for(color).filter(|l| l.is_pin())
    }

    /// True when the same slider/front/back relation already exists here.
    pub fn has_line(&self, color: Color, relation: &LineRelation) -> bool {
        self.lines_for(color).any(|l| l.same_line(relation))
    }
}

fn line_relations(board: &Board, color: Color) -> Vec<LineRelation> {
    let enemy = !color;
    let mut lines = Vec::new();

    for slider_piece in [Piece::Bishop, Piece::Rook, Piece::Queen] {
        for slider_sq in board.pieces(slider_piece) & board.colors(color) {
            let attacks = piece_attacks(board, slider_sq, slider_piece, color);
            for front in attacks & board.colors(enemy) {
                let Some(front_piece) = board.piece_on(front) else {
                    continue;
                };
                let Some(back) = find_piece_behind(board, slider_sq, front, enemy) else {
                    continue;
                };
                let Some(back_piece) = board.piece_on(back) else {
                    continue;
                };
                lines.push(LineRelation {
                    slider: Attacker {
                        from: slider_sq,
                        piece: slider_piece,
                    },
                    front,
                    front_piece,
                    back,
                    back_piece,
                });
            }
        }
    }

    lines
}
