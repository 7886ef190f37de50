//! UCI (Universal Chess Interface) move utilities

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

/// Convert UCI castling notation to cozy_chess notation
///
/// UCI uses standard notation (king moves 2 squares): e1g1, e1c1, e8g8, e8c8
/// cozy_chess uses king-to-rook notation: e1h1, e1a1, e8h8, e8a8
pub fn convert_uci_castling_to_cozy(mv: Move, legal_moves: &[Move]) -> Move {
    let is_back_rank = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let from_e_file = mv.from.file() == File::E;
    let to_castle_file = matches!(mv.to.file(), File::G | File::C);

    if !(is_back_rank && from_e_file && to_castle_file) || mv.promotion.is_some() {
        return mv;
    }

    let rook_file = if mv.to.file() == File::G {
        File::H
    } else {
        File::A
    };
    let converted = Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    };

    if legal_moves.contains(&converted) {
        converted
    } else {
        mv
    }
}

/// Convert a cozy_chess castling move (king takes own rook) back to the
/// two-square king move UCI engines expect.
pub fn convert_cozy_castling_to_uci(board: &Board, mv: Move) -> Move {
    if !is_castling(board, mv) {
        return mv;
    }
    let king_file = if (mv.to.file() as u8) > (mv.from.file() as u8) {
        File::G
    } else {
        File::C
    };
    Move {
        from: mv.from,
        to: Square::new(king_file, mv.from.rank()),
        promotion: None,
    }
}

/// A move is castling when the king lands on a friendly rook.
pub fn is_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.piece_on(mv.to) == Some(Piece::Rook)
        && board.color_on(mv.from) == board.color_on(mv.to)
}

/// Parse a UCI move string ("e2e4", "e7e8q") without validating legality.
pub fn parse_uci_move(s: &str) -> Result<Move, UciMoveError> {
    let s = s.trim();
    if !(4..=5).contains(&s.len()) || !s.is_ascii() {
        return Err(UciMoveError::InvalidFormat(s.to_string()));
    }
    let from = parse_square(&s[0..2]).ok_or_else(|| UciMoveError::InvalidSquare(s.to_string()))?;
    let to = parse_square(&s[2..4]).ok_or_else(|| UciMoveError::InvalidSquare(s.to_string()))?;
    let promotion = match s.as_bytes().get(4) {
        None => None,
        Some(b'q') => Some(Piece::Queen),
        Some(b'r') => Some(Piece::Rook),
        Some(b'b') => Some(Piece::Bishop),
        Some(b'n') => Some(Piece::Knight),
        Some(_) => return Err(UciMoveError::InvalidPromotion(s.to_string())),
    };
    Ok(Move {
        from,
        to,
        promotion,
    })
}

/// Parse a UCI move and map it onto the board's legal move list, handling castling.
pub fn parse_legal_uci_move(board: &Board, s: &str) -> Result<Move, UciMoveError> {
    let raw = parse_uci_move(s)?;
    let mut legal = Vec::new();
    board.generate_moves(|moves| {
        legal.extend(moves);
        false
    });
    let mv = convert_uci_castling_to_cozy(raw, &legal);
    if legal.contains(&mv) {
        Ok(mv)
    } else {
        Err(UciMoveError::Illegal(s.to_string()))
    }
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q")
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(piece_char_lower(promo));
    }
    s
}

/// Format a legal move for the engine, translating castling to e1g1 style.
pub fn format_engine_move(board: &Board, mv: Move) -> String {
    format_uci_move(convert_cozy_castling_to_uci(board, mv))
}

pub fn format_square(sq: Square) -> String {
    let file = (b'a' + sq.file() as u8) as char;
    let rank = (b'1' + sq.rank() as u8) as char;
    format!("{}{}", file, rank)
}

pub fn parse_square(s: &str) -> Option<Square> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let file = bytes[0].checked_sub(b'a').filter(|f| *f < 8)?;
    let rank = bytes[1].checked_sub(b'1').filter(|r| *r < 8)?;
    Some(Square::new(
        File::index(file as usize),
        Rank::index(rank as usize),
    ))
}

fn piece_char_lower(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UciMoveError {
    #[error("Invalid UCI move format: {0}")]
    InvalidFormat(String),
    #[error("Invalid square in move: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion piece in move: {0}")]
    InvalidPromotion(String),
    #[error("Illegal move in position: {0}")]
    Illegal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uci_move() {
        let mv = Move {
            from: Square::new(File::E, Rank::Second),
            to: Square::new(File::E, Rank::Fourth),
            promotion: None,
        };
        assert_eq!(format_uci_move(mv), "e2e4");
    }

    #[test]
    fn test_format_uci_move_with_promotion() {
        let mv = Move {
            from: Square::new(File::E, Rank::Seventh),
            to: Square::new(File::E, Rank::Eighth),
            promotion: Some(Piece::Queen),
        };
        assert_eq!(format_uci_move(mv), "e7e8q");
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(matches!(parse_uci_move("e2"), Err(UciMoveError::InvalidFormat(_))));
        assert!(matches!(parse_uci_move("z2e4"), Err(UciMoveError::InvalidSquare(_))));
        assert!(matches!(parse_uci_move("e7e8x"), Err(UciMoveError::InvalidPromotion(_))));
    }

    #[test]
    fn castling_converts_both_ways() {
        let board: Board = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        let mv = parse_legal_uci_move(&board, "e1g1").unwrap();
        assert_eq!(format_uci_move(mv), "e1h1");
        assert!(is_castling(&board, mv));
        assert_eq!(format_engine_move(&board, mv), "e1g1");

        let long = parse_legal_uci_move(&board, "e1c1").unwrap();
        assert_eq!(format_engine_move(&board, long), "e1c1");
    }

    #[test]
    fn illegal_move_is_rejected() {
        let board = Board::default();
        assert!(matches!(
            parse_legal_uci_move(&board, "e2e5"),
            Err(UciMoveError::Illegal(_))
        ));
    }
}
