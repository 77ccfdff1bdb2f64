pub mod bitboard;
pub mod board;
pub mod magics;
pub mod movegen;
pub mod perft;
pub mod prng;
pub mod tt;
pub mod types;
pub mod uci;
pub mod zobrist;

pub use bitboard::Bitboard;
pub use board::{Board, FenError, START_FEN};
pub use magics::{king_attacks, knight_attacks, FixedMagics, PextMagics, SliderAttacks};
pub use movegen::{MoveGenerator, MAX_HISTORY};
pub use perft::{perft, perft_parallel};
pub use prng::Cgw64;
pub use tt::{Entry, Flag, TranspositionTable};
pub use types::*;
pub use uci::{move_to_uci, parse_uci_move};
pub use zobrist::Zobrist;
