use std::time::Instant;

use rayon::prelude::*;

use tambaqui_core::{
    perft, perft_parallel, Board, FixedMagics, MoveGenerator, PextMagics, TranspositionTable,
    Zobrist, START_FEN,
};

const FULL_PERFT_ENV: &str = "FULL_PERFT";
const NODE_LIMIT: u64 = 10_000_000;

struct Case {
    fen: &'static str,
    depths: &'static [(u32, u64)],
}

const CASES: &[Case] = &[
    Case {
        fen: START_FEN,
        depths: &[
            (1, 20),
            (2, 400),
            (3, 8_902),
            (4, 197_281),
            (5, 4_865_609),
            (6, 119_060_324),
        ],
    },
    Case {
        // "Kiwipete": castling, pins, en passant and promotions at once.
        fen: "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -",
        depths: &[(1, 48), (2, 2_039), (3, 97_862), (4, 4_085_603), (5, 193_690_690)],
    },
    Case {
        fen: "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - -",
        depths: &[
            (1, 14),
            (2, 191),
            (3, 2_812),
            (4, 43_238),
            (5, 674_624),
            (6, 11_030_083),
        ],
    },
];

#[test]
fn perft_standard_suite() {
    let full = std::env::var(FULL_PERFT_ENV).is_ok();
    let gen = MoveGenerator::new(Box::new(PextMagics::new()));
    let zobrist = Zobrist::default();

    CASES.par_iter().for_each(|case| {
        let tt = TranspositionTable::with_megabytes(16);
        let board = Board::from_fen(case.fen).unwrap();
        let case_start = Instant::now();
        let mut total = 0u64;

        for &(depth, expected) in case.depths {
            if !full && expected > NODE_LIMIT {
                eprintln!(
                    "Skipping depth {} for '{}' ({} nodes) — set {}=1 to run all.",
                    depth, case.fen, expected, FULL_PERFT_ENV
                );
                continue;
            }
            let got = perft(&gen, &zobrist, &tt, &board, depth);
            assert_eq!(
                got, expected,
                "perft mismatch for FEN '{}' at depth {}",
                case.fen, depth
            );
            total += got;
        }

        let elapsed = case_start.elapsed();
        println!(
            "'{}' done: {} nodes in {:.3?} ({:.1} Mn/s)",
            case.fen,
            total,
            elapsed,
            (total as f64 / 1_000_000.0) / elapsed.as_secs_f64()
        );
    });
}

#[test]
fn perft_parallel_matches_serial() {
    let gen = MoveGenerator::new(Box::new(PextMagics::new()));
    let zobrist = Zobrist::default();
    let board =
        Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -")
            .unwrap();

    let serial_tt = TranspositionTable::with_megabytes(8);
    let serial = perft(&gen, &zobrist, &serial_tt, &board, 4);

    for threads in [1, 2, 4] {
        let tt = TranspositionTable::with_megabytes(8);
        let parallel = perft_parallel(&gen, &zobrist, &tt, &board, 4, threads);
        assert_eq!(parallel, serial, "parallel perft diverged with {threads} threads");
    }
}

#[test]
fn perft_agrees_across_magic_backends() {
    let zobrist = Zobrist::default();
    let board = Board::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - -").unwrap();

    let pext_gen = MoveGenerator::new(Box::new(PextMagics::new()));
    let fixed_gen = MoveGenerator::new(Box::new(FixedMagics::new()));
    let pext_tt = TranspositionTable::with_megabytes(4);
    let fixed_tt = TranspositionTable::with_megabytes(4);

    for depth in 1..=4 {
        assert_eq!(
            perft(&pext_gen, &zobrist, &pext_tt, &board, depth),
            perft(&fixed_gen, &zobrist, &fixed_tt, &board, depth)
        );
    }
}
