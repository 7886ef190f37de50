pub mod analysis;
pub mod fen;
pub mod position;
pub mod san;
pub mod uci;

pub use analysis::{is_white_ply, AnalysisScore, MATE_BAND, MATE_SCORE};
pub use fen::{FenError, START_FEN};
pub use position::{Position, PositionError};
pub use san::{format_san, resolve_san, SanError};
pub use uci::{
    convert_uci_castling_to_cozy, format_engine_move, format_uci_move, parse_uci_move,
    UciMoveError,
};

pub use cozy_chess::{Color, GameStatus, Move, Piece, Square};
