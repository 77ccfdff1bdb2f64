//! UCI command loop.
//!
//! One session owns the engine and the output stream. `go` hands the
//! work to the engine's search worker, which prints through the shared
//! stream, so the loop stays free to accept `stop` and `quit`.

use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};

use log::{info, warn};

use tambaqui_core::START_FEN;
use tambaqui_engine::{Engine, SearchLimits};

pub struct UciSession {
    engine: Engine,
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

enum GoCommand {
    Search(SearchLimits),
    Perft(u32),
}

impl UciSession {
    pub fn new(engine: Engine) -> Self {
        Self::with_output(engine, Box::new(std::io::stdout()))
    }

    pub fn with_output(engine: Engine, out: Box<dyn Write + Send>) -> Self {
        UciSession {
            engine,
            out: Arc::new(Mutex::new(out)),
        }
    }

    /// Process commands until `quit` or end of input.
    pub fn run(&mut self, input: impl BufRead) {
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            if !self.handle(&line) {
                break;
            }
        }
        self.engine.stop_search();
        self.engine.wait_for_search();
    }

    /// Handle one command line; returns false on `quit`.
    pub fn handle(&mut self, line: &str) -> bool {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = tokens.split_first() else {
            return true;
        };

        match command {
            "uci" => {
                self.emit(&format!("id name {}", Engine::id_name()));
                self.emit("id author the tambaqui developers");
                self.emit("option name Hash type spin default 64 min 1 max 1024");
                self.emit("option name Clear Hash type button");
                self.emit("option name Threads type spin default 3 min 1 max 64");
                self.emit("option name NullMove type check default false");
                self.emit("option name LateMove type check default false");
                self.emit("option name Futility type check default false");
                self.emit("option name Razoring type check default false");
                self.emit("option name AllPruning type check default false");
                self.emit("option name OpeningBook type string default opening_book.txt");
                self.emit("option name SyzygyPath type string default syzygy_table");
                self.emit("uciok");
            }
            "isready" => self.emit("readyok"),
            "ucinewgame" => self.engine.new_game(),
            "setoption" => self.handle_setoption(args),
            "position" => self.handle_position(args),
            "go" => self.handle_go(args),
            "stop" => self.engine.stop_search(),
            "quit" => {
                self.engine.stop_search();
                self.engine.wait_for_search();
                return false;
            }
            "d" | "display" | "print" => {
                let text = self.engine.display();
                self.emit(text.trim_end());
            }
            "move" => {
                if let Some(text) = args.first() {
                    self.engine.play_move(text);
                }
            }
            _ => info!("ignoring unknown command '{command}'"),
        }
        true
    }

    /// Block until a running search has printed its bestmove.
    pub fn wait(&mut self) {
        self.engine.wait_for_search();
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn emit(&self, text: &str) {
        let mut out = self.out.lock().unwrap();
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }

    fn handle_setoption(&mut self, args: &[&str]) {
        // setoption name <Name ...> [value <V ...>]
        let mut name = Vec::new();
        let mut value = Vec::new();
        let mut in_value = false;
        for &token in args {
            match token {
                "name" if name.is_empty() && !in_value => {}
                "value" if !in_value => in_value = true,
                _ if in_value => value.push(token),
                _ => name.push(token),
            }
        }
        let name = name.join(" ").to_lowercase();
        let value = value.join(" ");

        match name.as_str() {
            "hash" => match value.parse::<i64>() {
                Ok(megabytes) => self.engine.set_hash_mb(megabytes.max(1) as usize),
                Err(_) => warn!("ignoring non-numeric Hash value '{value}'"),
            },
            "clear hash" => self.engine.clear_hash(),
            "threads" => match value.parse::<i64>() {
                Ok(threads) => self.engine.set_threads(threads.max(1) as usize),
                Err(_) => warn!("ignoring non-numeric Threads value '{value}'"),
            },
            "nullmove" => self.engine.set_null_move(value == "true"),
            "latemove" => self.engine.set_late_move(value == "true"),
            "futility" => self.engine.set_futility(value == "true"),
            "razoring" => self.engine.set_razoring(value == "true"),
            "allpruning" => self.engine.set_all_pruning(value == "true"),
            "openingbook" => {
                // Book loading is the front-end integrator's concern.
                info!("opening book path set to '{value}' (no loader attached)");
            }
            "syzygypath" => {
                info!("tablebase path set to '{value}' (no probing backend attached)");
            }
            _ => info!("ignoring unknown option '{name}'"),
        }
    }

    fn handle_position(&mut self, args: &[&str]) {
        let mut rest = args;
        match rest.first() {
            Some(&"startpos") => {
                self.engine.set_position(START_FEN);
                rest = &rest[1..];
            }
            Some(&"fen") => {
                let fen_end = rest
                    .iter()
                    .position(|&t| t == "moves")
                    .unwrap_or(rest.len());
                let fen = rest[1..fen_end].join(" ");
                self.engine.set_position(&fen);
                rest = &rest[fen_end..];
            }
            _ => {}
        }
        if rest.first() == Some(&"moves") {
            for text in &rest[1..] {
                self.engine.play_move(text);
            }
        }
    }

    fn handle_go(&mut self, args: &[&str]) {
        match Self::parse_go(args) {
            GoCommand::Perft(depth) => {
                let (nodes, elapsed) = self.engine.perft(depth);
                let ms = elapsed.as_millis().max(1);
                let nps = nodes.saturating_mul(1000) / ms as u64;
                self.emit(&format!(
                    "{nodes} nodes found at depth = {depth} with time of {ms} ms and {nps} NPS"
                ));
            }
            GoCommand::Search(limits) => {
                let out = Arc::clone(&self.out);
                self.engine.go(limits, move |line| {
                    let mut out = out.lock().unwrap();
                    let _ = writeln!(out, "{line}");
                    let _ = out.flush();
                });
            }
        }
    }

    fn parse_go(args: &[&str]) -> GoCommand {
        fn number<'a, 'b>(iter: &mut std::slice::Iter<'a, &'b str>) -> Option<u64> {
            iter.next().and_then(|t| t.parse::<u64>().ok())
        }

        let mut limits = SearchLimits::default();
        let mut iter = args.iter();
        while let Some(&token) = iter.next() {
            match token {
                "depth" => limits.depth = number(&mut iter).map(|d| d as i32),
                "movetime" => limits.movetime = number(&mut iter),
                "wtime" => limits.wtime = number(&mut iter),
                "btime" => limits.btime = number(&mut iter),
                "winc" => limits.winc = number(&mut iter),
                "binc" => limits.binc = number(&mut iter),
                "nodes" => limits.nodes = number(&mut iter),
                "infinite" => limits.infinite = true,
                "perft" => {
                    let depth = number(&mut iter).unwrap_or(1) as u32;
                    return GoCommand::Perft(depth);
                }
                "searchmoves" => {}
                other => limits.search_moves.push(other.to_string()),
            }
        }
        GoCommand::Search(limits)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
