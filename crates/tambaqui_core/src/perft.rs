//! Perft: exhaustive legal-move counting for generator validation.
//!
//! Subtree counts are cached in the transposition table keyed by
//! position and exact depth. The parallel driver splits the root move
//! list across a rayon pool; every branch carries its own board copy
//! and an incremental Zobrist accumulator, so child recursion never
//! recomputes the piece-square component from scratch.

use log::warn;
use rayon::prelude::*;

use crate::board::Board;
use crate::movegen::MoveGenerator;
use crate::tt::{Entry, TranspositionTable};
use crate::zobrist::Zobrist;

pub fn perft(
    gen: &MoveGenerator,
    zobrist: &Zobrist,
    tt: &TranspositionTable,
    board: &Board,
    depth: u32,
) -> u64 {
    perft_inner(gen, zobrist, tt, *board, depth, None)
}

fn perft_inner(
    gen: &MoveGenerator,
    zobrist: &Zobrist,
    tt: &TranspositionTable,
    board: Board,
    depth: u32,
    piece_key: Option<u64>,
) -> u64 {
    if depth == 0 {
        return 1;
    }

    let piece_key = piece_key.unwrap_or_else(|| zobrist.piece_component(&board.pieces));
    let key = zobrist.base(board.side, board.castling, board.en_passant) ^ piece_key;
    if let Some(entry) = tt.read(key) {
        if entry.depth == depth as i32 {
            return entry.count;
        }
    }

    let mut nodes = 0;
    for mv in gen.pseudo_legal_moves(&board) {
        let mut child = board;
        child.make_move(&mv);
        if gen.in_check(&child.pieces, board.side) {
            continue;
        }
        let child_key = piece_key ^ zobrist.piece_delta(&mv, board.side);
        nodes += perft_inner(gen, zobrist, tt, child, depth - 1, Some(child_key));
    }

    tt.store(key, Entry::perft(depth, nodes, key));
    nodes
}

/// Perft with the root move list split across `threads` workers.
pub fn perft_parallel(
    gen: &MoveGenerator,
    zobrist: &Zobrist,
    tt: &TranspositionTable,
    board: &Board,
    depth: u32,
    threads: usize,
) -> u64 {
    if depth == 0 {
        return gen.legal_moves(board).len() as u64;
    }

    let moves = gen.pseudo_legal_moves(board);
    let count = || {
        moves
            .par_iter()
            .map(|mv| {
                let mut child = *board;
                child.make_move(mv);
                if gen.in_check(&child.pieces, board.side) {
                    return 0;
                }
                perft_inner(gen, zobrist, tt, child, depth - 1, None)
            })
            .sum::<u64>()
    };

    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
    {
        Ok(pool) => pool.install(count),
        Err(err) => {
            warn!("falling back to the global rayon pool: {err}");
            count()
        }
    }
}
