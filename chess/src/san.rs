//! Standard Algebraic Notation formatting and resolution.

use cozy_chess::{Board, GameStatus, Move, Piece};

use crate::uci::{format_square, is_castling};

/// Format a legal move as SAN, including disambiguation and check/mate suffix.
pub fn format_san(board: &Board, mv: Move) -> Result<String, SanError> {
    let legal = legal_moves(board);
    if !legal.contains(&mv) {
        return Err(SanError::NoLegalMove(crate::uci::format_uci_move(mv)));
    }
    let piece = board
        .piece_on(mv.from)
        .ok_or_else(|| SanError::NoLegalMove(crate::uci::format_uci_move(mv)))?;

    let mut san = if is_castling(board, mv) {
        if (mv.to.file() as u8) > (mv.from.file() as u8) {
            "O-O".to_string()
        } else {
            "O-O-O".to_string()
        }
    } else {
        let capture = is_capture(board, mv, piece);
        let mut san = String::new();
        if piece == Piece::Pawn {
            if capture {
                san.push(file_char(mv.from));
            }
        } else {
            san.push(piece_letter(piece));
            san.push_str(&disambiguation(board, &legal, mv, piece));
        }
        if capture {
            san.push('x');
        }
        san.push_str(&format_square(mv.to));
        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(piece_letter(promo));
        }
        san
    };

    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        if after.status() == GameStatus::Won {
            san.push('#');
        } else {
            san.push('+');
        }
    }
    Ok(san)
}

/// Find the legal move whose SAN matches `san`. Annotations (`+`, `#`, `!`, `?`)
/// are ignored and `0-0` is accepted for castling.
pub fn resolve_san(board: &Board, san: &str) -> Result<Move, SanError> {
    let wanted = normalize(san);
    if wanted.is_empty() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let mut found = None;
    for mv in legal_moves(board) {
        let candidate = format_san(board, mv)?;
        if normalize(&candidate) == wanted {
            if found.is_some() {
                return Err(SanError::AmbiguousMove(san.to_string()));
            }
            found = Some(mv);
        }
    }
    found.ok_or_else(|| SanError::NoLegalMove(san.to_string()))
}

/// Play a sequence of SAN moves from `board`, returning the resulting board.
pub fn play_san_moves<'a>(
    board: &Board,
    moves: impl IntoIterator<Item = &'a str>,
) -> Result<Board, SanError> {
    let mut board = board.clone();
    for san in moves {
        let mv = resolve_san(&board, san)?;
        board.play_unchecked(mv);
    }
    Ok(board)
}

fn normalize(san: &str) -> String {
    san.trim()
        .replace('0', "O")
        .chars()
        .filter(|c| !matches!(c, '+' | '#' | '!' | '?'))
        .collect()
}

fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

fn is_capture(board: &Board, mv: Move, piece: Piece) -> bool {
    if board.piece_on(mv.to).is_some() {
        return true;
    }
    // en passant: pawn changes file onto an empty square
    piece == Piece::Pawn && mv.from.file() != mv.to.file()
}

fn disambiguation(board: &Board, legal: &[Move], mv: Move, piece: Piece) -> String {
    let rivals: Vec<Move> = legal
        .iter()
        .copied()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && board.piece_on(other.from) == Some(piece)
                && other.promotion == mv.promotion
        })
        .collect();

    if rivals.is_empty() {
        return String::new();
    }
    let shares_file = rivals.iter().any(|r| r.from.file() == mv.from.file());
    let shares_rank = rivals.iter().any(|r| r.from.rank() == mv.from.rank());

    if !shares_file {
        file_char(mv.from).to_string()
    } else if !shares_rank {
        rank_char(mv.from).to_string()
    } else {
        format_square(mv.from)
    }
}

fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

fn file_char(sq: cozy_chess::Square) -> char {
    (b'a' + sq.file() as u8) as char
}

fn rank_char(sq: cozy_chess::Square) -> char {
    (b'1' + sq.rank() as u8) as char
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}
