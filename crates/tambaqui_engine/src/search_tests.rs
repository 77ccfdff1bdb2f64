use std::sync::atomic::AtomicBool;

use super::*;
use crate::eval::MaterialEval;
use crate::limits::SearchLimits;
use crate::Engine;
use tambaqui_core::{
    move_to_uci, Board, MoveGenerator, PextMagics, TranspositionTable, Zobrist,
};

const MATE_IN_ONE: &str = "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1";

#[test]
fn test_depth_one_picks_a_legal_opening_move() {
    let mut engine = Engine::new();
    let report = engine.search_sync(SearchLimits::depth(1));
    let best = report.best_move.expect("startpos has moves");
    let legal = engine.movegen().legal_moves(&engine.board);
    assert!(legal.contains(&best));
    assert!(report.nodes >= 21, "expected at least 21 nodes, got {}", report.nodes);
}

#[test]
fn test_finds_mate_in_one() {
    let mut engine = Engine::new();
    engine.set_position(MATE_IN_ONE);
    let report = engine.search_sync(SearchLimits::depth(2));
    let best = report.best_move.expect("mate-in-one position has moves");
    assert_eq!(move_to_uci(&best), "a1a8");
    assert_eq!(report.score_cp, MATE - 1);
    assert_eq!(report.pv.first(), Some(&best));
}

#[test]
fn test_mate_found_with_all_pruning_enabled() {
    let mut engine = Engine::new();
    engine.set_all_pruning(true);
    engine.set_position(MATE_IN_ONE);
    let report = engine.search_sync(SearchLimits::depth(3));
    assert_eq!(move_to_uci(&report.best_move.unwrap()), "a1a8");
    assert_eq!(report.score_cp, MATE - 1);
}

#[test]
fn test_stalemate_reports_draw_and_no_move() {
    let mut engine = Engine::new();
    engine.set_position("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
    let mut lines = Vec::new();
    let report = engine.search_sync_with(SearchLimits::depth(1), |line| lines.push(line));
    assert_eq!(report.best_move, None);
    assert_eq!(report.score_cp, 0);
    assert_eq!(lines.last().map(String::as_str), Some("bestmove (none)"));
}

#[test]
fn test_fifty_move_rule_scores_draw() {
    let mut engine = Engine::new();
    engine.set_position("8/8/8/3qk3/8/4K3/8/8 w - - 100 80");
    let report = engine.search_sync(SearchLimits::depth(2));
    assert_eq!(report.score_cp, 0);
}

#[test]
fn test_search_is_deterministic() {
    let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -";
    let run = || {
        let mut engine = Engine::new();
        engine.set_position(fen);
        let report = engine.search_sync(SearchLimits::depth(3));
        (report.nodes, report.score_cp, report.pv)
    };
    assert_eq!(run(), run());
}

#[test]
fn test_hash_resize_and_clear_keep_the_answer() {
    let mut engine = Engine::new();
    engine.set_hash_mb(16);
    engine.clear_hash();
    engine.set_position(MATE_IN_ONE);
    let report = engine.search_sync(SearchLimits::depth(2));
    assert_eq!(move_to_uci(&report.best_move.unwrap()), "a1a8");
    assert_eq!(report.score_cp, MATE - 1);
}

#[test]
fn test_searchmoves_restricts_the_root() {
    let mut engine = Engine::new();
    let limits = SearchLimits {
        depth: Some(1),
        search_moves: vec!["a2a3".to_string(), "h2h3".to_string()],
        ..SearchLimits::default()
    };
    let report = engine.search_sync(limits);
    let best = move_to_uci(&report.best_move.unwrap());
    assert!(best == "a2a3" || best == "h2h3", "unexpected bestmove {best}");
}

#[test]
fn test_stop_command_interrupts_search() {
    let mut engine = Engine::new();
    let (tx, rx) = std::sync::mpsc::channel();
    engine.go(SearchLimits::depth(64), move |line| {
        let _ = tx.send(line);
    });
    std::thread::sleep(std::time::Duration::from_millis(100));
    engine.stop_search();
    engine.wait_for_search();
    let lines: Vec<String> = rx.try_iter().collect();
    let last = lines.last().expect("search must report a bestmove");
    assert!(last.starts_with("bestmove "));
    assert_ne!(last.as_str(), "bestmove (none)");
}

#[test]
fn test_movetime_budget_stops_search() {
    let mut engine = Engine::new();
    let (tx, rx) = std::sync::mpsc::channel();
    let start = std::time::Instant::now();
    engine.go(SearchLimits::movetime(150), move |line| {
        let _ = tx.send(line);
    });
    engine.wait_for_search();
    assert!(
        start.elapsed() < std::time::Duration::from_secs(30),
        "watchdog did not stop the search"
    );
    let lines: Vec<String> = rx.try_iter().collect();
    assert!(lines.iter().any(|line| line.starts_with("info depth ")));
    assert!(lines.last().unwrap().starts_with("bestmove "));
}

#[test]
fn test_search_respects_window_bounds() {
    // Fail-hard: whatever the window, the returned score stays inside.
    let gen = MoveGenerator::new(Box::new(PextMagics::new()));
    let zobrist = Zobrist::default();
    let board =
        Board::from_fen("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4")
            .unwrap();
    let stop = AtomicBool::new(false);

    for (alpha, beta) in [(-MATE, MATE), (-100, 100), (0, 1), (-1000, -900), (300, 900)] {
        let tt = TranspositionTable::with_megabytes(4);
        let mut search = Search::new(
            &gen,
            &zobrist,
            &tt,
            &MaterialEval,
            None,
            &stop,
            PruningOptions::default(),
        );
        let mut pv = PvLine::default();
        let score = search.alpha_beta(&board, 0, 3, 3, alpha, beta, &mut pv, &[], false, true);
        assert!(
            (alpha..=beta).contains(&score),
            "score {score} escaped the ({alpha}, {beta}) window"
        );
    }
}

#[test]
fn test_quiescence_stand_pat_cutoff() {
    let gen = MoveGenerator::new(Box::new(PextMagics::new()));
    let zobrist = Zobrist::default();
    let tt = TranspositionTable::with_megabytes(1);
    let stop = AtomicBool::new(false);
    let mut search = Search::new(
        &gen,
        &zobrist,
        &tt,
        &MaterialEval,
        None,
        &stop,
        PruningOptions::default(),
    );
    // White is a queen up; any beta at or below the material balance
    // fails high immediately.
    let board = Board::from_fen("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
    assert_eq!(search.quiesce(&board, 0, -1000, 500), 500);
}

#[test]
fn test_tablebase_root_probe_short_circuits() {
    use crate::tablebase::{Tablebase, Wdl, TB_WIN_SCORE};
    use std::sync::Arc;
    use tambaqui_core::parse_uci_move;

    struct AlwaysWin;
    impl Tablebase for AlwaysWin {
        fn max_pieces(&self) -> u32 {
            5
        }
        fn probe_wdl(&self, _board: &Board) -> Option<Wdl> {
            Some(Wdl::Win)
        }
        fn probe_root(&self, board: &Board) -> Option<(tambaqui_core::Move, Wdl)> {
            // Claim the first legal move wins.
            let gen = MoveGenerator::new(Box::new(PextMagics::new()));
            parse_uci_move(&gen, board, "d1d5").map(|mv| (mv, Wdl::Win))
        }
    }

    let mut engine = Engine::new();
    engine.set_tablebase(Some(Arc::new(AlwaysWin)));
    engine.set_position("4k3/8/8/8/8/8/8/3QK3 w - - 0 1");
    let report = engine.search_sync(SearchLimits::depth(4));
    assert_eq!(report.tb_hits, 1);
    assert_eq!(move_to_uci(&report.best_move.unwrap()), "d1d5");
    assert_eq!(report.score_cp, TB_WIN_SCORE);
}
