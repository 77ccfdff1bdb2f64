//! Negamax alpha-beta search with quiescence.
//!
//! The searcher walks stack copies of the board, probes the shared
//! transposition table, and supports four selectable pruning
//! extensions: null move, late-move reduction, futility and razoring.
//! Scores are centipawns from the side-to-move's perspective; mates are
//! `MATE - plies_from_root`.

use std::sync::atomic::{AtomicBool, Ordering};

use tambaqui_core::{
    piece_index, Board, Color, Entry, Flag, Move, MoveGenerator, PieceType, TranspositionTable,
    Zobrist, QUEEN_VALUE,
};

use crate::eval::Evaluator;
use crate::tablebase::{wdl_score, Tablebase};

/// Mate sentinel, kept clear of the tablebase band and of `i32::MAX`.
pub const MATE: i32 = 2_147_400_001;

const NULL_MOVE_DEPTH: i32 = 2;
const NULL_REDUCTION: i32 = 2;
const MAX_LATE_REDUCTION: i32 = 4;

/// Selectable pruning extensions; everything defaults to off.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PruningOptions {
    pub null_move: bool,
    pub late_move: bool,
    pub futility: bool,
    pub razoring: bool,
}

/// Principal variation: moves from the root with per-ply scores.
#[derive(Clone, Debug, Default)]
pub struct PvLine {
    pub moves: Vec<Move>,
    pub evals: Vec<i32>,
    /// Set when the head came from an exact table hit.
    seeded: bool,
}

impl PvLine {
    pub fn first(&self) -> Option<Move> {
        self.moves.first().copied()
    }

    fn clear(&mut self) {
        self.moves.clear();
        self.evals.clear();
        self.seeded = false;
    }

    fn seed(&mut self, mv: Move, eval: i32) {
        self.moves = vec![mv];
        self.evals = vec![eval];
        self.seeded = true;
    }

    /// Head move plus the child's line.
    fn splice(&mut self, mv: Move, eval: i32, tail: &PvLine) {
        self.moves.clear();
        self.moves.push(mv);
        self.moves.extend_from_slice(&tail.moves);
        self.evals.clear();
        self.evals.push(eval);
        self.evals.extend_from_slice(&tail.evals);
        self.seeded = false;
    }
}

/// Number of bits needed to represent `v` (0 for 0).
#[inline(always)]
fn bit_length(v: i32) -> i32 {
    32 - v.leading_zeros() as i32
}

pub struct Search<'a> {
    gen: &'a MoveGenerator,
    zobrist: &'a Zobrist,
    tt: &'a TranspositionTable,
    evaluator: &'a dyn Evaluator,
    tablebase: Option<&'a dyn Tablebase>,
    stop: &'a AtomicBool,
    options: PruningOptions,
    pub nodes: u64,
    pub tt_hits: u64,
    pub tb_hits: u64,
}

impl<'a> Search<'a> {
    pub fn new(
        gen: &'a MoveGenerator,
        zobrist: &'a Zobrist,
        tt: &'a TranspositionTable,
        evaluator: &'a dyn Evaluator,
        tablebase: Option<&'a dyn Tablebase>,
        stop: &'a AtomicBool,
        options: PruningOptions,
    ) -> Self {
        Search {
            gen,
            zobrist,
            tt,
            evaluator,
            tablebase,
            stop,
            options,
            nodes: 0,
            tt_hits: 0,
            tb_hits: 0,
        }
    }

    fn has_only_pawns(board: &Board, side: Color) -> bool {
        let base = side.idx() * 6;
        board.pieces[base + 1].is_empty()
            && board.pieces[base + 2].is_empty()
            && board.pieces[base + 3].is_empty()
            && board.pieces[base + 4].is_empty()
    }

    fn probe_tablebase(&mut self, board: &Board) -> Option<i32> {
        let tb = self.tablebase?;
        if !board.castling.is_empty() || board.count_pieces() > tb.max_pieces() {
            return None;
        }
        let wdl = tb.probe_wdl(board)?;
        self.tb_hits += 1;
        Some(wdl_score(wdl))
    }

    /// Alpha-beta over `(alpha, beta)` at `depth` plies below
    /// `max_depth`. `search_moves` carries either the previous
    /// iteration's line (with `follow_pv`) or a fixed root move set;
    /// `allow_null` is cleared inside a null-move subtree.
    #[allow(clippy::too_many_arguments)]
    pub fn alpha_beta(
        &mut self,
        board: &Board,
        rule50: u32,
        max_depth: i32,
        depth: i32,
        mut alpha: i32,
        beta: i32,
        pv: &mut PvLine,
        search_moves: &[Move],
        follow_pv: bool,
        allow_null: bool,
    ) -> i32 {
        let mut line = PvLine::default();
        let can_prune = max_depth != depth;
        self.nodes += 1;

        if let Some(score) = self.probe_tablebase(board) {
            return score;
        }

        let in_check = self.gen.in_check(&board.pieces, board.side);
        let mut legal = self.gen.legal_moves(board);
        if legal.is_empty() {
            if in_check {
                return -(MATE - (max_depth - depth));
            }
            return 0;
        }
        if board.is_insufficient_material() || rule50 >= 100 {
            return 0;
        }

        if depth <= 0 {
            let mut score = self.quiesce(board, rule50, alpha, beta);
            // Quiescence reports unanchored mates; pull them into the
            // driver's distance scale.
            if score == MATE {
                score -= max_depth;
            } else if score == -MATE {
                score += max_depth;
            }
            return score;
        }

        let alpha_orig = alpha;
        let key = self
            .zobrist
            .key(&board.pieces, board.side, board.castling, board.en_passant);
        let mut hash_move: Option<Move> = None;
        if let Some(entry) = self.tt.read(key) {
            if entry.depth >= depth {
                self.tt_hits += 1;
                if entry.mv.is_some() {
                    hash_move = entry.mv;
                }
                if can_prune {
                    match entry.flag {
                        Flag::Exact => return entry.eval,
                        Flag::Lower if entry.eval >= beta => return entry.eval,
                        Flag::Upper if entry.eval <= alpha => return entry.eval,
                        _ => {}
                    }
                } else if entry.flag == Flag::Exact {
                    if let Some(mv) = entry.mv {
                        pv.seed(mv, entry.eval);
                    }
                }
            }
        }

        // Null move: hand the opponent a free shot at a reduced depth;
        // a fail-high proves this position good enough to cut.
        if can_prune
            && !follow_pv
            && allow_null
            && self.options.null_move
            && depth >= NULL_MOVE_DEPTH
            && !Self::has_only_pawns(board, board.side)
            && !in_check
        {
            let mut reduction = NULL_REDUCTION;
            if depth - reduction < NULL_MOVE_DEPTH {
                reduction = 0;
            }
            let mut null_board = *board;
            null_board.side = board.side.other();
            let mut null_line = PvLine::default();
            let score = -self.alpha_beta(
                &null_board,
                rule50,
                max_depth,
                depth - 1 - reduction,
                -beta,
                -(beta - 1),
                &mut null_line,
                &[],
                false,
                false,
            );
            if score >= beta {
                return beta;
            }
        }

        let mut eval = 0;
        if can_prune && !follow_pv {
            eval = self.evaluator.evaluate(board);
        }

        // Razoring: hopeless static eval drops straight to quiescence.
        if can_prune && !follow_pv && self.options.razoring {
            let margin = 514 + 294 * (depth as i64) * (depth as i64);
            if (eval as i64) < alpha as i64 - margin {
                return self.quiesce(board, rule50, alpha, beta);
            }
        }

        // Futility: a static eval comfortably over beta fails soft.
        if can_prune && !follow_pv && !pv.seeded && self.options.futility {
            let margin = 200 * bit_length(depth) as i64;
            if eval as i64 - margin >= beta as i64 && eval >= beta {
                return ((2 * beta as i64 + eval as i64) / 3) as i32;
            }
        }

        let mut moves: Vec<Move> = Vec::with_capacity(legal.len());
        if let Some(hm) = hash_move {
            if let Some(at) = legal.iter().position(|mv| *mv == hm) {
                legal.remove(at);
                moves.push(hm);
            }
        }
        if !search_moves.is_empty() {
            if follow_pv {
                // Keep following the previous iteration's line at this
                // ply, then fall back to regular ordering.
                let ply = (max_depth - depth) as usize;
                let pv_move = search_moves.get(ply).copied();
                let mut ordered = self.gen.order_moves(board, legal, false);
                if let Some(pm) = pv_move {
                    // Only follow the line while it stays legal here.
                    if let Some(at) = ordered.iter().position(|mv| *mv == pm) {
                        ordered.remove(at);
                        moves.push(pm);
                    }
                }
                moves.append(&mut ordered);
            } else {
                // Restricted root set.
                let mut ordered = self.gen.order_moves(board, search_moves.to_vec(), false);
                moves.append(&mut ordered);
            }
        } else {
            let mut ordered = self.gen.order_moves(board, legal, false);
            moves.append(&mut ordered);
        }

        let mut first_move = true;
        for (index, mv) in moves.into_iter().enumerate() {
            line.clear();
            let mut child = *board;
            child.make_move(&mv);
            let child_rule50 =
                if mv.is_capture() || mv.piece == piece_index(board.side, PieceType::Pawn) {
                    0
                } else {
                    rule50 + 1
                };

            let mut reduction = 0;
            if self.options.late_move && index >= 10 {
                reduction = (bit_length(index as i32) >> 2).min(MAX_LATE_REDUCTION);
            }

            let child_moves: &[Move] = if first_move { search_moves } else { &[] };
            let score = -self.alpha_beta(
                &child,
                child_rule50,
                max_depth,
                depth - 1 - reduction,
                -beta,
                -alpha,
                &mut line,
                child_moves,
                first_move,
                allow_null,
            );
            first_move = false;

            if score >= beta {
                if !mv.is_capture() {
                    self.gen.add_history(board.side, &mv, depth);
                }
                self.tt
                    .store(key, Entry::new(depth, self.nodes, key, beta, Flag::Lower, Some(mv)));
                return beta;
            }
            if score > alpha {
                alpha = score;
                pv.splice(mv, score, &line);
            }
            if self.stop.load(Ordering::Relaxed) {
                // Cancelled: report what we have, store nothing.
                return alpha;
            }
        }

        let flag = if alpha <= alpha_orig {
            alpha = alpha_orig;
            Flag::Upper
        } else {
            Flag::Exact
        };
        self.tt
            .store(key, Entry::new(depth, self.nodes, key, alpha, flag, pv.first()));
        alpha
    }

    /// Horizon extension over tactical moves: captures, promotions and
    /// quiet checks.
    pub fn quiesce(&mut self, board: &Board, rule50: u32, mut alpha: i32, beta: i32) -> i32 {
        self.nodes += 1;

        let legal = self.gen.legal_moves(board);
        if legal.is_empty() {
            if self.gen.in_check(&board.pieces, board.side) {
                return -MATE;
            }
            return 0;
        }
        if board.is_insufficient_material() || rule50 >= 100 {
            return 0;
        }

        let stand_pat = self.evaluator.evaluate(board);
        if stand_pat >= beta {
            return beta;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        for mv in self.gen.order_moves(board, legal, true) {
            // Delta pruning: even winning a queen (or promoting) from
            // here cannot lift the stand-pat score to alpha.
            let mut delta = QUEEN_VALUE;
            if mv.is_promotion() {
                delta += QUEEN_VALUE - 200;
            }
            if (stand_pat as i64) < alpha as i64 - delta as i64 {
                return alpha;
            }

            let mut child = *board;
            child.make_move(&mv);
            let score = -self.quiesce(&child, rule50 + 1, -beta, -alpha);

            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
            if self.stop.load(Ordering::Relaxed) {
                return alpha;
            }
        }

        alpha
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod search_tests;
