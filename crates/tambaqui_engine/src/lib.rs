//! Engine facade: owns the search singletons, drives iterative
//! deepening on a worker thread and handles the UCI options.

pub mod eval;
pub mod limits;
pub mod search;
pub mod tablebase;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, warn};

use tambaqui_core::{
    move_to_uci, parse_uci_move, perft_parallel, Board, Move, MoveGenerator, PextMagics,
    TranspositionTable, Zobrist,
};

pub use eval::{Evaluator, MaterialEval};
pub use limits::{SearchLimits, MAX_DEPTH};
pub use search::{PruningOptions, PvLine, Search, MATE};
pub use tablebase::{wdl_score, Tablebase, Wdl, TB_WIN_SCORE};

use limits::Watchdog;

pub const HASH_MIN_MB: usize = 1;
pub const HASH_MAX_MB: usize = 1024;
pub const THREADS_MIN: usize = 1;
pub const THREADS_MAX: usize = 64;
pub const DEFAULT_THREADS: usize = 3;

/// Outcome of one `go` run.
#[derive(Clone, Debug, Default)]
pub struct SearchReport {
    pub depth: i32,
    /// Score in centipawns from White's point of view.
    pub score_cp: i32,
    pub nodes: u64,
    pub tb_hits: u64,
    pub pv: Vec<Move>,
    pub best_move: Option<Move>,
}

pub struct Engine {
    zobrist: Arc<Zobrist>,
    movegen: Arc<MoveGenerator>,
    tt: Arc<TranspositionTable>,
    evaluator: Arc<dyn Evaluator>,
    tablebase: Option<Arc<dyn Tablebase>>,
    pub board: Board,
    options: PruningOptions,
    threads: usize,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            zobrist: Arc::new(Zobrist::default()),
            movegen: Arc::new(MoveGenerator::new(Box::new(PextMagics::new()))),
            tt: Arc::new(TranspositionTable::with_megabytes(
                TranspositionTable::DEFAULT_MEGABYTES,
            )),
            evaluator: Arc::new(MaterialEval),
            tablebase: None,
            board: Board::startpos(),
            options: PruningOptions::default(),
            threads: DEFAULT_THREADS,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn id_name() -> String {
        format!("tambaqui {}", env!("CARGO_PKG_VERSION"))
    }

    pub fn movegen(&self) -> &MoveGenerator {
        &self.movegen
    }

    /// Replace the evaluation function.
    pub fn set_evaluator(&mut self, evaluator: Arc<dyn Evaluator>) {
        self.evaluator = evaluator;
    }

    /// Attach (or detach) a tablebase oracle.
    pub fn set_tablebase(&mut self, tablebase: Option<Arc<dyn Tablebase>>) {
        self.tablebase = tablebase;
    }

    /// Load a position; malformed FEN falls back to the start position.
    pub fn set_position(&mut self, fen: &str) {
        match Board::from_fen(fen) {
            Ok(board) => self.board = board,
            Err(err) => {
                warn!("rejecting FEN '{fen}': {err}");
                self.board = Board::startpos();
            }
        }
    }

    /// Play a UCI move on the live board. Illegal or unparsable moves
    /// are ignored.
    pub fn play_move(&mut self, text: &str) -> bool {
        match parse_uci_move(&self.movegen, &self.board, text) {
            Some(mv) => {
                self.board.make_move(&mv);
                true
            }
            None => {
                debug!("ignoring illegal move '{text}'");
                false
            }
        }
    }

    pub fn new_game(&mut self) {
        self.halt();
        self.board = Board::startpos();
        self.tt.clear();
        self.movegen.reset_history();
    }

    pub fn set_hash_mb(&mut self, megabytes: usize) {
        self.halt();
        let megabytes = megabytes.clamp(HASH_MIN_MB, HASH_MAX_MB);
        debug!("resizing hash to {megabytes} MiB");
        self.tt = Arc::new(TranspositionTable::with_megabytes(megabytes));
    }

    pub fn clear_hash(&self) {
        self.tt.clear();
    }

    pub fn set_threads(&mut self, threads: usize) {
        self.threads = threads.clamp(THREADS_MIN, THREADS_MAX);
    }

    pub fn set_null_move(&mut self, on: bool) {
        self.options.null_move = on;
    }

    pub fn set_late_move(&mut self, on: bool) {
        self.options.late_move = on;
    }

    pub fn set_futility(&mut self, on: bool) {
        self.options.futility = on;
    }

    pub fn set_razoring(&mut self, on: bool) {
        self.options.razoring = on;
    }

    pub fn set_all_pruning(&mut self, on: bool) {
        self.options = PruningOptions {
            null_move: on,
            late_move: on,
            futility: on,
            razoring: on,
        };
    }

    pub fn pruning_options(&self) -> PruningOptions {
        self.options
    }

    pub fn display(&self) -> String {
        self.board.display()
    }

    /// Raise the stop flag; a running search unwinds at the next node.
    pub fn stop_search(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Block until the current search worker has printed its bestmove.
    pub fn wait_for_search(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    fn halt(&mut self) {
        self.stop_search();
        self.wait_for_search();
    }

    fn job(&self, limits: SearchLimits) -> SearchJob {
        SearchJob {
            zobrist: Arc::clone(&self.zobrist),
            movegen: Arc::clone(&self.movegen),
            tt: Arc::clone(&self.tt),
            evaluator: Arc::clone(&self.evaluator),
            tablebase: self.tablebase.clone(),
            board: self.board,
            options: self.options,
            stop: Arc::clone(&self.stop),
            limits,
        }
    }

    /// Start a search worker; `emit` receives the `info` lines and the
    /// final `bestmove` line.
    pub fn go(&mut self, limits: SearchLimits, mut emit: impl FnMut(String) + Send + 'static) {
        self.halt();
        self.stop.store(false, Ordering::Relaxed);
        let job = self.job(limits);
        self.worker = Some(std::thread::spawn(move || {
            job.run(&mut emit);
        }));
    }

    /// Run a search on the calling thread and return the report.
    pub fn search_sync(&mut self, limits: SearchLimits) -> SearchReport {
        self.search_sync_with(limits, |_| {})
    }

    /// Synchronous search that still surfaces the output lines.
    pub fn search_sync_with(
        &mut self,
        limits: SearchLimits,
        mut emit: impl FnMut(String),
    ) -> SearchReport {
        self.halt();
        self.stop.store(false, Ordering::Relaxed);
        self.job(limits).run(&mut emit)
    }

    /// Parallel perft from the live board. The table is cleared
    /// afterwards so perft entries never answer search probes.
    pub fn perft(&self, depth: u32) -> (u64, Duration) {
        let start = Instant::now();
        let nodes = perft_parallel(
            &self.movegen,
            &self.zobrist,
            &self.tt,
            &self.board,
            depth,
            self.threads,
        );
        self.tt.clear();
        (nodes, start.elapsed())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.halt();
    }
}

/// Everything a search worker needs, detached from the engine.
struct SearchJob {
    zobrist: Arc<Zobrist>,
    movegen: Arc<MoveGenerator>,
    tt: Arc<TranspositionTable>,
    evaluator: Arc<dyn Evaluator>,
    tablebase: Option<Arc<dyn Tablebase>>,
    board: Board,
    options: PruningOptions,
    stop: Arc<AtomicBool>,
    limits: SearchLimits,
}

impl SearchJob {
    fn run(&self, emit: &mut dyn FnMut(String)) -> SearchReport {
        let start = Instant::now();
        let board = self.board;
        let sign = if board.side.is_white() { 1 } else { -1 };
        let legal = self.movegen.legal_moves(&board);

        let mut report = SearchReport::default();

        // Proven endgames come straight from the root oracle.
        if let Some(tb) = &self.tablebase {
            if board.castling.is_empty() && board.count_pieces() <= tb.max_pieces() {
                if let Some((mv, wdl)) = tb.probe_root(&board) {
                    let score_cp = wdl_score(wdl) * sign;
                    emit(format!(
                        "info depth 1 score cp {score_cp} nps 0 nodes 0 tbhits 1 time 0 pv {}",
                        move_to_uci(&mv)
                    ));
                    emit(format!("bestmove {}", move_to_uci(&mv)));
                    report.depth = 1;
                    report.score_cp = score_cp;
                    report.tb_hits = 1;
                    report.pv = vec![mv];
                    report.best_move = Some(mv);
                    return report;
                }
            }
        }

        // Root move restriction, resolved against the legal list.
        let search_moves: Vec<Move> = self
            .limits
            .search_moves
            .iter()
            .filter_map(|text| parse_uci_move(&self.movegen, &board, text))
            .collect();
        let mut fixed = !search_moves.is_empty();
        let mut guidance = search_moves;

        let budget = self.limits.budget(board.side);
        let _watchdog = budget
            .map(|b| Watchdog::arm(Arc::clone(&self.stop), b));

        let mut best_pv = PvLine::default();
        let mut last_ms: u128 = 0;

        for depth in 1..=self.limits.target_depth() {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            let mut pv = PvLine::default();
            let mut search = Search::new(
                &self.movegen,
                &self.zobrist,
                &self.tt,
                self.evaluator.as_ref(),
                self.tablebase.as_deref(),
                &self.stop,
                self.options,
            );
            let score = search.alpha_beta(
                &board,
                board.halfmove_clock,
                depth,
                depth,
                -MATE,
                MATE,
                &mut pv,
                &guidance,
                !fixed,
                true,
            );
            fixed = false;
            report.nodes += search.nodes;

            if self.stop.load(Ordering::Relaxed) {
                // The interrupted iteration is unfinished; the previous
                // depth's line stays authoritative.
                break;
            }

            let elapsed_ms = start.elapsed().as_millis();
            let delta_ms = (elapsed_ms - last_ms).max(1);
            last_ms = elapsed_ms;
            let nps = search.nodes.saturating_mul(1000) / delta_ms as u64;
            let score_cp = score * sign;
            let pv_text = pv
                .moves
                .iter()
                .map(move_to_uci)
                .collect::<Vec<_>>()
                .join(" ");
            emit(format!(
                "info depth {depth} score cp {score_cp} nps {nps} nodes {} tbhits {} time {delta_ms} pv {pv_text}",
                search.nodes, search.tb_hits
            ));

            report.depth = depth;
            report.score_cp = score_cp;
            report.tb_hits += search.tb_hits;
            report.pv = pv.moves.clone();
            guidance = pv.moves.clone();
            best_pv = pv;

            if score.abs() >= TB_WIN_SCORE {
                break;
            }
            if let Some(nodes) = self.limits.nodes {
                if report.nodes >= nodes {
                    break;
                }
            }
            if let Some(budget) = budget {
                if start.elapsed() >= budget {
                    break;
                }
            }
        }

        report.best_move = self.pick_best_move(&board, legal, best_pv.first());
        match report.best_move {
            Some(mv) => emit(format!("bestmove {}", move_to_uci(&mv))),
            None => emit("bestmove (none)".to_string()),
        }
        report
    }

    /// The PV head if it is still legal, otherwise the best-ordered
    /// legal move; None only when the side to move has no moves.
    fn pick_best_move(&self, board: &Board, legal: Vec<Move>, pv_head: Option<Move>) -> Option<Move> {
        if legal.is_empty() {
            return None;
        }
        if let Some(mv) = pv_head {
            if legal.contains(&mv) {
                return Some(mv);
            }
        }
        self.movegen
            .order_moves(board, legal, false)
            .into_iter()
            .next()
    }
}
