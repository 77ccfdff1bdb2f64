//! Endgame tablebase oracle interface.
//!
//! The engine only consumes win/draw/loss answers and a root move
//! suggestion; the actual probing backend is provided by the
//! integration. Without one, the probe sites stay silent and the
//! search proceeds normally.

use tambaqui_core::{Board, Move};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wdl {
    Loss,
    BlessedLoss,
    Draw,
    CursedWin,
    Win,
}

/// Score used for proven tablebase results; just below the mate band.
pub const TB_WIN_SCORE: i32 = 2_147_400_000;

/// Map a WDL verdict onto the engine's score scale. Blessed losses and
/// cursed wins are draws under the 50-move rule.
pub fn wdl_score(wdl: Wdl) -> i32 {
    match wdl {
        Wdl::Loss => -TB_WIN_SCORE,
        Wdl::Win => TB_WIN_SCORE,
        _ => 0,
    }
}

/// Black-box probe interface. Probes may fail for any reason (missing
/// files, unsupported material); failure means "no answer", never an
/// error.
pub trait Tablebase: Send + Sync {
    /// Largest piece count covered by the loaded tables.
    fn max_pieces(&self) -> u32;
    /// WDL verdict from the side-to-move's perspective.
    fn probe_wdl(&self, board: &Board) -> Option<Wdl>;
    /// Best root move with its verdict.
    fn probe_root(&self, board: &Board) -> Option<(Move, Wdl)>;
}
