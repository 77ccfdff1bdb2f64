//! Position evaluation interface.

use tambaqui_core::{Board, MATERIAL};

/// Pluggable position evaluation. Implementations return centipawns
/// from the side-to-move's perspective.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, board: &Board) -> i32;
}

/// Plain material count.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaterialEval;

impl Evaluator for MaterialEval {
    fn evaluate(&self, board: &Board) -> i32 {
        let mut score = 0i32;
        for (piece, bb) in board.pieces.iter().enumerate() {
            let value = MATERIAL[piece] * bb.popcount() as i32;
            if piece < 6 {
                score -= value;
            } else {
                score += value;
            }
        }
        if board.side.is_white() {
            score
        } else {
            -score
        }
    }
}
