use cozy_chess::{BitBoard, Board, Color, Piece, Rank};
use serde::{Deserialize, Serialize};

use super::helpers::{attacked_squares, attackers_of, king_zone_files};

/// How exposed one side's king is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KingExposure {
    /// Own pawns on the king's file or its neighbours, one or two ranks up (0-3).
    pub pawn_shield: u8,
    /// King-adjacent files without own pawns.
    pub open_files: u8,
    /// King zone squares the enemy attacks.
    pub attacked_zone_squares: u8,
    /// Weighted enemy presence around the king: Q=4, R=3, B=2, N=2, P=1.
    pub attack_weight: u16,
    /// 0.0 (safe) to 1.0 (exposed).
    pub exposure_score: f32,
}

impl KingExposure {
    const MISSING_KING: Self = Self {
        pawn_shield: 0,
        open_files: 3,
        attacked_zone_squares: 0,
        attack_weight: 0,
        exposure_score: 1.0,
    };
}

pub fn king_exposure(board: &Board, color: Color) -> KingExposure {
    let enemy = !color;
    let Some(king_sq) = (board.pieces(Piece::King) & board.colors(color)).into_iter().next() else {
        return KingExposure::MISSING_KING;
    };

    let zone = cozy_chess::get_king_moves(king_sq) | king_sq.bitboard();
    let own_pawns = board.pieces(Piece::Pawn) & board.colors(color);
    let shield_ranks =
        Rank::Second.relative_to(color).bitboard() | Rank::Third.relative_to(color).bitboard();

    let mut pawn_shield = 0u8;
    let mut open_files = 0u8;
    let mut file_count = 0u8;
    for file in king_zone_files(king_sq) {
        file_count += 1;
        let on_file = own_pawns & file.bitboard();
        if on_file.is_empty() {
            open_files += 1;
        } else if !(on_file & shield_ranks).is_empty() {
            pawn_shield += 1;
        }
    }

    let attacked_zone_squares = (attacked_squares(board, enemy) & zone).len() as u8;

    let mut zone_attackers = BitBoard::EMPTY;
    for sq in zone {
        zone_attackers |= attackers_of(board, sq, enemy);
    }
    let attack_weight: u16 = zone_attackers
        .into_iter()
        .filter_map(|sq| board.piece_on(sq))
        .map(|piece| match piece {
            Piece::Queen => 4,
            Piece::Rook => 3,
            Piece::Bishop | Piece::Knight => 2,
            Piece::Pawn | Piece::King => 1,
        })
        .sum();

    let files = f32::from(file_count.max(1));
    let shield_deficit = (files - f32::from(pawn_shield)) / files;
    let open_file_factor = f32::from(open_files) / files;
    let attack_factor = (f32::from(attack_weight) / 20.0).min(1.0);
    let zone_control = f32::from(attacked_zone_squares) / zone.len() as f32;

    let exposure_score = (0.25 * shield_deficit
        + 0.20 * open_file_factor
        + 0.30 * attack_factor
        + 0.25 * zone_control)
        .clamp(0.0, 1.0);

    KingExposure {
        pawn_shield,
        open_files,
        attacked_zone_squares,
        attack_weight,
        exposure_score,
    }
}

/// How much more exposed `color`'s king is in `after` than in `before`.
pub fn exposure_increase(before: &Board, after: &Board, color: Color) -> f32 {
    king_exposure(after, color).exposure_score - king_exposure(before, color).exposure_score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_is_safe() {
        let board = Board::default();
        for color in [Color::White, Color::Black] {
            let exposure = king_exposure(&board, color);
            assert_eq!(exposure.pawn_shield, 3);
            assert_eq!(exposure.open_files, 0);
            assert!(exposure.exposure_score < 0.5);
        }
    }

    #[test]
    fn bare_king_is_exposed() {
        let board: Board = "rnbqkbnr/pppppppp/8/8/8/8/8/4K3 w kq - 0 1".parse().unwrap();
        let exposure = king_exposure(&board, Color::White);
        assert_eq!(exposure.pawn_shield, 0);
        assert_eq!(exposure.open_files, 3);
        assert!(exposure.exposure_score > 0.3, "got {}", exposure.exposure_score);
    }

    #[test]
    fn pushing_shield_pawns_increases_exposure() {
        let before: Board = "6k1/8/8/8/8/8/5PPP/6K1 w - - 0 1".parse().unwrap();
        let after: Board = "6k1/8/8/8/6P1/8/5P1P/6K1 b - - 0 1".parse().unwrap();
        assert!(exposure_increase(&before, &after, Color::White) > 0.0);
    }
}
