use cozy_chess::{Board, Color};

/// Standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let fen = fen.trim();
    let parts: Vec<&str> = fen.split_whitespace().collect();
    if parts.len() < 4 {
        return Err(FenError::InvalidFormat(fen.to_string()));
    }
    if parts[0].split('/').count() != 8 {
        return Err(FenError::InvalidBoardLayout(parts[0].to_string()));
    }

    // cozy-chess requires the clock fields; fill in defaults for 4-field EPD-style input
    let owned;
    let full = if parts.len() == 4 {
        owned = format!("{} 0 1", parts.join(" "));
        owned.as_str()
    } else {
        fen
    };

    full.parse()
        .map_err(|_| FenError::InvalidFormat(fen.to_string()))
}

/// Format a Board as a FEN string
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

/// Read the side to move from the second FEN field without building a board.
pub fn side_to_move(fen: &str) -> Result<Color, FenError> {
    match fen.split_whitespace().nth(1) {
        Some("w") => Ok(Color::White),
        Some("b") => Ok(Color::Black),
        _ => Err(FenError::InvalidFormat(fen.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN format: {0}")]
    InvalidFormat(String),
    #[error("Invalid board layout: {0}")]
    InvalidBoardLayout(String),
}
