use cozy_chess::{Board, Color, GameStatus, Move};

use crate::fen::{self, FenError};
use crate::san::{self, SanError};
use crate::uci::{self, UciMoveError};

/// An immutable chess position: the FEN it was built from plus the parsed board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    fen: String,
    board: Board,
}

impl Position {
    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let board = fen::parse_fen(fen)?;
        Ok(Self {
            fen: fen::format_fen(&board),
            board,
        })
    }

    pub fn startpos() -> Self {
        Self::from_board(Board::default())
    }

    pub fn from_board(board: Board) -> Self {
        Self {
            fen: fen::format_fen(&board),
            board,
        }
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    pub fn white_to_move(&self) -> bool {
        self.side_to_move() == Color::White
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.board.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    pub fn legal_move_count(&self) -> usize {
        let mut count = 0;
        self.board.generate_moves(|mvs| {
            count += mvs.len();
            false
        });
        count
    }

    pub fn status(&self) -> GameStatus {
        self.board.status()
    }

    /// Checkmate or stalemate: no legal moves remain.
    pub fn is_terminal(&self) -> bool {
        self.status() != GameStatus::Ongoing
    }

    pub fn is_checkmate(&self) -> bool {
        self.status() == GameStatus::Won
    }

    pub fn in_check(&self) -> bool {
        !self.board.checkers().is_empty()
    }

    /// Resolve a UCI move string (standard castling notation) against this position.
    pub fn parse_uci(&self, uci_move: &str) -> Result<Move, PositionError> {
        Ok(uci::parse_legal_uci_move(&self.board, uci_move)?)
    }

    pub fn parse_san(&self, san_move: &str) -> Result<Move, PositionError> {
        Ok(san::resolve_san(&self.board, san_move)?)
    }

    /// Play a legal move and return the resulting position.
    pub fn play(&self, mv: Move) -> Result<Self, PositionError> {
        let mut board = self.board.clone();
        board
            .try_play(mv)
            .map_err(|_| PositionError::IllegalMove(uci::format_uci_move(mv)))?;
        Ok(Self::from_board(board))
    }

    pub fn play_uci(&self, uci_move: &str) -> Result<(Move, Self), PositionError> {
        let mv = self.parse_uci(uci_move)?;
        let next = self.play(mv)?;
        Ok((mv, next))
    }

    pub fn to_san(&self, mv: Move) -> Result<String, PositionError> {
        Ok(san::format_san(&self.board, mv)?)
    }

    /// UCI text for a legal move, with castling in e1g1 form.
    pub fn to_uci(&self, mv: Move) -> String {
        uci::format_engine_move(&self.board, mv)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error(transparent)]
    Fen(#[from] FenError),
    #[error(transparent)]
    Uci(#[from] UciMoveError),
    #[error(transparent)]
    San(#[from] SanError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_has_twenty_moves() {
        let pos = Position::startpos();
        assert!(pos.white_to_move());
        assert_eq!(pos.legal_move_count(), 20);
        assert_eq!(pos.legal_moves().len(), 20);
        assert!(!pos.is_terminal());
    }

    #[test]
    fn play_uci_advances_side_to_move() {
        let (mv, next) = Position::startpos().play_uci("e2e4").unwrap();
        assert_eq!(Position::startpos().to_uci(mv), "e2e4");
        assert!(!next.white_to_move());
        assert!(next
            .fen()
            .starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq"));
    }

    #[test]
    fn illegal_uci_is_an_error() {
        let result = Position::startpos().play_uci("e2e5");
        assert!(matches!(result, Err(PositionError::Uci(_))));
    }

    #[test]
    fn detects_checkmate_and_stalemate() {
        // fool's mate
        let mated =
            Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
                .unwrap();
        assert!(mated.is_checkmate());
        assert!(mated.is_terminal());
        assert!(mated.in_check());

        let stalemate = Position::from_fen("k7/2Q5/1K6/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(stalemate.is_terminal());
        assert!(!stalemate.is_checkmate());
    }

    #[test]
    fn invalid_fen_is_rejected() {
        assert!(matches!(
            Position::from_fen("not a fen"),
            Err(PositionError::Fen(_))
        ));
    }
}
