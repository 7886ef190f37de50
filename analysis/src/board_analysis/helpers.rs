use cozy_chess::{BitBoard, Board, Color, File, Piece, Rank, Square};

/// Smallest value that counts as a minor piece or better.
pub const MINOR_PIECE_VALUE: u16 = 320;

/// Returns the union of all attack squares for a given color.
pub fn attacked_squares(board: &Board, color: Color) -> BitBoard {
    let mut attacks = BitBoard::EMPTY;
    for piece in Piece::ALL {
        for sq in board.pieces(piece) & board.colors(color) {
            attacks |= piece_attacks(board, sq, piece, color);
        }
    }
    attacks
}

/// Returns all pieces of `color` that attack the given square.
pub fn attackers_of(board: &Board, sq: Square, color: Color) -> BitBoard {
    let occupied = board.occupied();
    let ours = board.colors(color);
    let diagonal = board.pieces(Piece::Bishop) | board.pieces(Piece::Queen);
    let orthogonal = board.pieces(Piece::Rook) | board.pieces(Piece::Queen);

    // a pawn of `color` attacks `sq` when a pawn of the other color on `sq` would attack it
    (cozy_chess::get_pawn_attacks(sq, !color) & board.pieces(Piece::Pawn)
        | cozy_chess::get_knight_moves(sq) & board.pieces(Piece::Knight)
        | cozy_chess::get_bishop_moves(sq, occupied) & diagonal
        | cozy_chess::get_rook_moves(sq, occupied) & orthogonal
        | cozy_chess::get_king_moves(sq) & board.pieces(Piece::King))
        & ours
}

/// Standard piece values in centipawns.
pub fn piece_value(piece: Piece) -> u16 {
    match piece {
        Piece::Pawn => 100,
        Piece::Knight => 320,
        Piece::Bishop => 330,
        Piece::Rook => 500,
        Piece::Queen => 900,
        Piece::King => 20000,
    }
}

/// Non-pawn, non-king material of one side.
pub fn non_pawn_material(board: &Board, color: Color) -> u16 {
    [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen]
        .into_iter()
        .map(|p| (board.pieces(p) & board.colors(color)).len() as u16 * piece_value(p))
        .sum()
}

/// Returns the attack bitboard for a specific piece on a square.
pub fn piece_attacks(board: &Board, sq: Square, piece: Piece, color: Color) -> BitBoard {
    let occupied = board.occupied();
    match piece {
        Piece::Pawn => cozy_chess::get_pawn_attacks(sq, color),
        Piece::Knight => cozy_chess::get_knight_moves(sq),
        Piece::Bishop => cozy_chess::get_bishop_moves(sq, occupied),
        Piece::Rook => cozy_chess::get_rook_moves(sq, occupied),
        Piece::Queen => {
            cozy_chess::get_bishop_moves(sq, occupied) | cozy_chess::get_rook_moves(sq, occupied)
        }
        Piece::King => cozy_chess::get_king_moves(sq),
    }
}

/// Value of the cheapest piece in `attackers`, if any.
pub fn cheapest_attacker(board: &Board, attackers: BitBoard) -> Option<u16> {
    attackers
        .into_iter()
        .filter_map(|sq| board.piece_on(sq))
        .map(piece_value)
        .min()
}

/// Returns the files adjacent to the king (including the king's own file), clamped to the board.
pub fn king_zone_files(king_sq: Square) -> impl Iterator<Item = File> {
    let king_file = king_sq.file() as i8;
    let min_file = (king_file - 1).max(0) as u8;
    let max_file = (king_file + 1).min(7) as u8;
    (min_file..=max_file).filter_map(|f| File::try_index(f as usize))
}

/// Walk from `slider_sq` through `front_sq` and return the first occupied
/// square behind `front_sq` if it holds a piece of `target_color`.
pub fn find_piece_behind(
    board: &Board,
    slider_sq: Square,
    front_sq: Square,
    target_color: Color,
) -> Option<Square> {
    let dr = (front_sq.rank() as i8 - slider_sq.rank() as i8).signum();
    let df = (front_sq.file() as i8 - slider_sq.file() as i8).signum();
    if dr == 0 && df == 0 {
        return None;
    }

    let mut r = front_sq.rank() as i8 + dr;
    let mut f = front_sq.file() as i8 + df;
    while (0..8).contains(&r) && (0..8).contains(&f) {
        let sq = Square::new(File::try_index(f as usize)?, Rank::try_index(r as usize)?);
        if board.occupied().has(sq) {
            return board.colors(target_color).has(sq).then_some(sq);
        }
        r += dr;
        f += df;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_values() {
        assert_eq!(piece_value(Piece::Pawn), 100);
        assert_eq!(piece_value(Piece::Knight), MINOR_PIECE_VALUE);
        assert_eq!(piece_value(Piece::Queen), 900);
    }

    #[test]
    fn test_attackers_of_e3() {
        let board = Board::default();
        // d2 and f2 pawns cover e3
        let attackers = attackers_of(&board, Square::E3, Color::White);
        assert!(attackers.has(Square::D2));
        assert!(attackers.has(Square::F2));
        assert!(attackers_of(&board, Square::E3, Color::Black).is_empty());
    }

    #[test]
    fn test_piece_attacks_knight() {
        let board = Board::default();
        let attacks = piece_attacks(&board, Square::G1, Piece::Knight, Color::White);
        assert!(attacks.has(Square::F3));
        assert!(attacks.has(Square::H3));
    }

    #[test]
    fn starting_material() {
        let board = Board::default();
        assert_eq!(non_pawn_material(&board, Color::White), 3200);
        assert_eq!(non_pawn_material(&board, Color::Black), 3200);
    }

    #[test]
    fn ray_walk_stops_at_first_piece() {
        // rook a1, black knight a4, black king a8
        let board: Board = "k7/8/8/8/n7/8/8/R3K3 w - - 0 1".parse().unwrap();
        assert_eq!(
            find_piece_behind(&board, Square::A1, Square::A4, Color::Black),
            Some(Square::A8)
        );
        // own piece behind: nothing
        assert_eq!(
            find_piece_behind(&board, Square::A1, Square::A4, Color::White),
            None
        );
    }
}
