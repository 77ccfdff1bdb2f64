//! UCI long algebraic move notation.

use crate::board::Board;
use crate::movegen::MoveGenerator;
use crate::types::*;

/// Long algebraic form of a move ("e2e4", "e7e8q").
pub fn move_to_uci(mv: &Move) -> String {
    let mut text = square_to_coord(mv.from);
    text.push_str(&square_to_coord(mv.to));
    if let Some(promo) = mv.promotion {
        text.push(match promo {
            PieceType::Knight => 'n',
            PieceType::Bishop => 'b',
            PieceType::Rook => 'r',
            _ => 'q',
        });
    }
    text
}

/// Resolve a UCI move string against the legal moves of a position, so
/// the returned record carries the right capture/castle/en-passant
/// fields. A promotion suffix must match exactly.
pub fn parse_uci_move(gen: &MoveGenerator, board: &Board, text: &str) -> Option<Move> {
    let text = text.trim();
    if !text.is_ascii() || text.len() < 4 {
        return None;
    }
    let from = coord_to_square(&text[0..2])?;
    let to = coord_to_square(&text[2..4])?;
    let promotion = match text.as_bytes().get(4) {
        Some(b'n') | Some(b'N') => Some(PieceType::Knight),
        Some(b'b') | Some(b'B') => Some(PieceType::Bishop),
        Some(b'r') | Some(b'R') => Some(PieceType::Rook),
        Some(b'q') | Some(b'Q') => Some(PieceType::Queen),
        Some(_) => return None,
        None => None,
    };

    gen.legal_moves(board)
        .into_iter()
        .find(|mv| mv.from == from && mv.to == to && mv.promotion == promotion)
}
