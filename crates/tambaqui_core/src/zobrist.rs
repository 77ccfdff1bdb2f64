//! Zobrist hashing for positions.
//!
//! 781 random words: 12 x 64 piece-square contributions, one
//! black-to-move word, four castling-right words and eight en-passant
//! file words. The position key XORs the words of every active feature,
//! which allows O(1) incremental updates while making and unmaking
//! moves.

use crate::bitboard::Bitboard;
use crate::prng::Cgw64;
use crate::types::{piece_index, Castle, CastlingRights, Color, Move, PieceType};

const PIECE_WORDS: usize = 12 * 64;
const BLACK_TO_MOVE: usize = 768;
const CASTLING: usize = 769;
const EN_PASSANT: usize = 773;
pub const KEY_COUNT: usize = 781;

pub struct Zobrist {
    keys: [u64; KEY_COUNT],
}

impl Zobrist {
    pub fn new(seed: u64) -> Self {
        let mut rng = Cgw64::new(seed);
        let mut keys = [0u64; KEY_COUNT];
        for key in keys.iter_mut() {
            *key = rng.next();
        }
        Zobrist { keys }
    }

    /// Word for a piece (board index 0..12) on a square.
    #[inline(always)]
    pub fn piece(&self, piece: u8, sq: u8) -> u64 {
        self.keys[piece as usize * 64 + sq as usize]
    }

    /// Full position key.
    pub fn key(
        &self,
        pieces: &[Bitboard; 12],
        side: Color,
        castling: CastlingRights,
        en_passant: Option<u8>,
    ) -> u64 {
        self.base(side, castling, en_passant) ^ self.piece_component(pieces)
    }

    /// Side, castling and en-passant contributions. These are cheap and
    /// always recomputed from fresh state.
    pub fn base(&self, side: Color, castling: CastlingRights, en_passant: Option<u8>) -> u64 {
        let mut h = 0u64;
        if side == Color::Black {
            h ^= self.keys[BLACK_TO_MOVE];
        }
        let bits = castling.bits();
        for right in 0..4 {
            if bits & (1 << right) != 0 {
                h ^= self.keys[CASTLING + right];
            }
        }
        if let Some(ep) = en_passant {
            h ^= self.keys[EN_PASSANT + (ep & 7) as usize];
        }
        h
    }

    /// Piece-square contribution computed by looping every bitboard.
    pub fn piece_component(&self, pieces: &[Bitboard; 12]) -> u64 {
        let mut h = 0u64;
        for (piece, bb) in pieces.iter().enumerate() {
            let mut bb = *bb;
            while let Some(sq) = bb.pop_lsb() {
                h ^= self.keys[piece * 64 + sq as usize];
            }
        }
        h
    }

    /// XOR delta a move applies to the piece-square contribution:
    /// mover out at `from`, mover (or promoted piece) in at `to`, any
    /// capture out at `to` or at the en-passant victim square, and the
    /// rook displacement when castling.
    pub fn piece_delta(&self, mv: &Move, side: Color) -> u64 {
        let mut delta = self.piece(mv.piece, mv.from);
        match mv.promotion {
            Some(promo) => delta ^= self.piece(piece_index(side, promo), mv.to),
            None => delta ^= self.piece(mv.piece, mv.to),
        }
        if let Some(capture) = mv.capture {
            let victim_sq = if mv.en_passant {
                if side.is_white() {
                    mv.to + 8
                } else {
                    mv.to - 8
                }
            } else {
                mv.to
            };
            delta ^= self.piece(capture, victim_sq);
        }
        let rook = piece_index(side, PieceType::Rook);
        match (mv.castle, side) {
            (Castle::KingSide, Color::White) => {
                delta ^= self.piece(rook, 63) ^ self.piece(rook, 61);
            }
            (Castle::KingSide, Color::Black) => {
                delta ^= self.piece(rook, 7) ^ self.piece(rook, 5);
            }
            (Castle::QueenSide, Color::White) => {
                delta ^= self.piece(rook, 56) ^ self.piece(rook, 59);
            }
            (Castle::QueenSide, Color::Black) => {
                delta ^= self.piece(rook, 0) ^ self.piece(rook, 3);
            }
            (Castle::None, _) => {}
        }
        delta
    }
}

impl Default for Zobrist {
    fn default() -> Self {
        Zobrist::new(Cgw64::DEFAULT_SEED)
    }
}

#[cfg(test)]
#[path = "zobrist_tests.rs"]
mod zobrist_tests;
