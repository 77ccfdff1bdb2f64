//! Search limits and the movetime watchdog.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tambaqui_core::Color;

pub const MAX_DEPTH: i32 = 200;

/// Limits extracted from a `go` command.
#[derive(Clone, Debug, Default)]
pub struct SearchLimits {
    pub depth: Option<i32>,
    /// Fixed budget for this move, in milliseconds.
    pub movetime: Option<u64>,
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub nodes: Option<u64>,
    pub infinite: bool,
    /// Root moves to restrict the search to, in UCI notation.
    pub search_moves: Vec<String>,
}

impl SearchLimits {
    pub fn depth(depth: i32) -> Self {
        SearchLimits {
            depth: Some(depth),
            ..SearchLimits::default()
        }
    }

    pub fn movetime(ms: u64) -> Self {
        SearchLimits {
            movetime: Some(ms),
            ..SearchLimits::default()
        }
    }

    pub fn target_depth(&self) -> i32 {
        if self.infinite {
            return MAX_DEPTH;
        }
        self.depth.unwrap_or(MAX_DEPTH).clamp(0, MAX_DEPTH)
    }

    /// Time budget for this move: an explicit movetime, or a slice of
    /// the remaining clock (time/20 + increment/2).
    pub fn budget(&self, side: Color) -> Option<Duration> {
        if let Some(ms) = self.movetime {
            return Some(Duration::from_millis(ms));
        }
        if self.nodes.is_some() || self.infinite {
            return None;
        }
        let (time, inc) = if side.is_white() {
            (self.wtime, self.winc)
        } else {
            (self.btime, self.binc)
        };
        time.map(|t| Duration::from_millis(t / 20 + inc.unwrap_or(0) / 2))
    }
}

/// Raises the stop flag once the budget elapses, unless disarmed first.
pub(crate) struct Watchdog {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    pub(crate) fn arm(stop: Arc<AtomicBool>, budget: Duration) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let cancelled = Arc::clone(&cancel);
        let handle = std::thread::spawn(move || {
            let start = Instant::now();
            loop {
                if cancelled.load(Ordering::Relaxed) {
                    return;
                }
                let elapsed = start.elapsed();
                if elapsed >= budget {
                    break;
                }
                std::thread::sleep((budget - elapsed).min(Duration::from_millis(10)));
            }
            stop.store(true, Ordering::Relaxed);
        });
        Watchdog {
            cancel,
            handle: Some(handle),
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
