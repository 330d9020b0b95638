//! Adversarial search.
//!
//! [`Searcher`] runs iterative-deepening, fail-soft alpha-beta negamax over
//! the move generator, with a lock-free transposition table, killer-move
//! ordering and optional capture quiescence at the leaves.
//!
//! Budget semantics: a depth, time or node budget interrupts the search at
//! a node boundary, and the best move completed so far is returned; the
//! root installs the first ordered legal move as a fallback before the
//! deepening loop, so even a zero budget yields a legal move. When the
//! side to move has no legal move at all, [`SearchResult::best_move`] is
//! `None` and the score reports the mate or stalemate; that is the game
//! controller's "game over" signal, not an error.

mod alphabeta;
mod ordering;
mod qsearch;

pub mod limits;
pub mod tt;

pub use limits::{SearchLimits, TimeManager};
pub use tt::TranspositionTable;

use std::sync::Arc;
use std::time::Instant;

use crate::board::Board;
use crate::eval;
use crate::movegen;
use crate::types::{Depth, Hash, Move, NodeCount, Ply, Score, MAX_DEPTH};
use crate::variant::Rules;

use ordering::{KillerTable, MovePicker};

/// Counters collected during a search.
#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    pub nodes: NodeCount,
    /// Last fully started iteration depth.
    pub depth: i32,
    /// Deepest ply reached, including quiescence.
    pub seldepth: i32,
    pub time_ms: u64,
}

impl SearchStats {
    pub fn nps(&self) -> u64 {
        if self.time_ms > 0 {
            self.nodes * 1000 / self.time_ms
        } else {
            0
        }
    }
}

/// Outcome of a search call.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// `None` means no legal move exists at the root (game over).
    pub best_move: Option<Move>,
    pub score: Score,
    /// Principal variation, recovered from the transposition table.
    pub pv: Vec<Move>,
    pub stats: SearchStats,
}

/// The search engine. Owns its transposition table and killer tables;
/// the position to search is set before each call.
pub struct Searcher {
    rules: Arc<Rules>,
    tt: TranspositionTable,
    killers: KillerTable,
    board: Board,
    /// Hashes of positions preceding the root, oldest first. Used for
    /// draw-by-repetition detection inside the search.
    game_history: Vec<Hash>,
    /// Hashes from the root to the current node of the active line.
    path: Vec<Hash>,
    stats: SearchStats,
    time: TimeManager,
    node_limit: Option<u64>,
    start: Option<Instant>,
    stop: bool,
    use_quiescence: bool,
}

impl Searcher {
    pub fn new(rules: Arc<Rules>) -> Self {
        let tt = TranspositionTable::new(rules.search.tt_size_mb);
        let use_quiescence = rules.search.quiescence;
        Searcher {
            rules,
            tt,
            killers: KillerTable::new(),
            board: Board::startpos(),
            game_history: Vec::new(),
            path: Vec::new(),
            stats: SearchStats::default(),
            time: TimeManager::default(),
            node_limit: None,
            start: None,
            stop: false,
            use_quiescence,
        }
    }

    /// Set the root position with no preceding history.
    pub fn set_position(&mut self, board: Board) {
        self.set_position_with_history(board, Vec::new());
    }

    /// Set the root position together with the hashes of the positions that
    /// led to it, enabling repetition detection across the game boundary.
    pub fn set_position_with_history(&mut self, board: Board, history: Vec<Hash>) {
        self.board = board;
        self.game_history = history;
    }

    /// Drop all cached results, as for a new game.
    pub fn reset(&mut self) {
        self.tt.clear();
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Search the current position within `limits`.
    pub fn search(&mut self, limits: SearchLimits) -> SearchResult {
        self.stats = SearchStats::default();
        self.killers = KillerTable::new();
        self.stop = false;
        self.start = Some(Instant::now());
        self.time = TimeManager::from_limits(&limits);
        self.node_limit = limits.nodes;
        self.tt.new_search();

        let root_moves = movegen::legal_moves(&self.board, &self.rules);
        if root_moves.is_empty() {
            let score = if movegen::is_in_check(&self.board, &self.rules) {
                Score::mated_in(0)
            } else {
                Score::DRAW
            };
            return SearchResult {
                best_move: None,
                score,
                pv: Vec::new(),
                stats: self.stats.clone(),
            };
        }

        // Order the root list once; its head is the fallback answer if the
        // budget expires before any move is fully scored.
        let mut ordered = Vec::with_capacity(root_moves.len());
        let mut picker = MovePicker::new(&self.board, root_moves, 0, [None; 2]);
        while let Some(m) = picker.next() {
            ordered.push(m);
        }

        let mut best_move = ordered[0];
        let mut best_score = Score::NONE;

        let max_depth = match limits.depth {
            Some(d) => d.raw().clamp(1, MAX_DEPTH),
            None if limits.movetime.is_some() || limits.nodes.is_some() || limits.infinite => {
                MAX_DEPTH
            }
            None => self.rules.search.depth,
        };

        for depth in 1..=max_depth {
            if depth > 1 && self.budget_exhausted() {
                break;
            }
            self.stats.depth = depth;

            if let Some((score, m)) = self.search_root(&ordered, Depth::new(depth)) {
                best_move = m;
                best_score = score;
                // Search the previous best first on the next iteration.
                if let Some(pos) = ordered.iter().position(|&x| x == m) {
                    ordered[..=pos].rotate_right(1);
                }
            }

            if let Some(start) = self.start {
                self.stats.time_ms = start.elapsed().as_millis() as u64;
            }
        }

        if let Some(start) = self.start {
            self.stats.time_ms = start.elapsed().as_millis() as u64;
        }

        let pv = self.extract_pv(best_move);
        SearchResult {
            best_move: Some(best_move),
            score: best_score,
            pv,
            stats: self.stats.clone(),
        }
    }

    /// One root iteration. Returns `None` when the budget expired before
    /// the first move completed, so the caller keeps the previous answer.
    fn search_root(&mut self, moves: &[Move], depth: Depth) -> Option<(Score, Move)> {
        let mut alpha = Score::NEG_INF;
        let beta = Score::INF;
        let mut best: Option<(Score, Move)> = None;

        self.path.clear();
        self.path.push(self.board.hash());

        for &m in moves {
            let child = self.board.apply(m);
            let score = -self.negamax(&child, depth - 1, Ply::new(1), -beta, -alpha);
            if self.stop {
                break;
            }
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, m));
            }
            if score > alpha {
                alpha = score;
            }
        }

        best
    }

    /// Walk the transposition table from the root to recover the principal
    /// variation. Every step is validated against the move generator, so
    /// the line is always legal; a repeated position ends the walk.
    fn extract_pv(&self, first: Move) -> Vec<Move> {
        let mut pv = vec![first];
        let mut board = self.board.apply(first);
        let mut seen = vec![self.board.hash(), board.hash()];

        while pv.len() < self.stats.depth as usize {
            let action = match self.tt.probe(board.hash()) {
                Some(entry) if entry.action() != 0 => entry.action(),
                _ => break,
            };
            let moves = movegen::legal_moves(&board, &self.rules);
            let Some(&m) = moves.iter().find(|m| m.action() == action) else {
                break;
            };
            board = board.apply(m);
            if seen.contains(&board.hash()) {
                break;
            }
            seen.push(board.hash());
            pv.push(m);
        }
        pv
    }

    /// Unconditional budget check for iteration boundaries, where a clock
    /// read per call is cheap.
    fn budget_exhausted(&mut self) -> bool {
        if self.stop {
            return true;
        }
        if let Some(start) = self.start {
            if self.time.should_stop(start.elapsed().as_millis() as u64) {
                self.stop = true;
                return true;
            }
        }
        if let Some(limit) = self.node_limit {
            if self.stats.nodes >= limit {
                self.stop = true;
                return true;
            }
        }
        false
    }

    /// Budget check, cheap enough for every node: the clock is only read
    /// every 1024 nodes. Once tripped, the flag is sticky for the rest of
    /// the call.
    fn should_stop(&mut self) -> bool {
        if self.stop {
            return true;
        }
        if let Some(limit) = self.node_limit {
            if self.stats.nodes >= limit {
                self.stop = true;
                return true;
            }
        }
        if self.stats.nodes & 1023 == 0 {
            if let Some(start) = self.start {
                if self.time.should_stop(start.elapsed().as_millis() as u64) {
                    self.stop = true;
                    return true;
                }
            }
        }
        false
    }

    #[inline]
    fn visit_node(&mut self, ply: Ply) {
        self.stats.nodes += 1;
        if ply.raw() > self.stats.seldepth {
            self.stats.seldepth = ply.raw();
        }
    }

    /// Draw detection inside the search. A position repeating anywhere on
    /// the current search path is scored as a draw immediately (either side
    /// can force the loop); against the pre-root game history the
    /// configured occurrence threshold applies.
    fn is_repetition_draw(&self, hash: Hash) -> bool {
        if self.rules.repetition == 0 {
            return false;
        }
        if self.path.contains(&hash) {
            return true;
        }
        let prior = self.game_history.iter().filter(|&&h| h == hash).count() as u32;
        prior + 1 >= self.rules.repetition
    }

    #[inline]
    fn evaluate(&self, board: &Board) -> Score {
        eval::evaluate(board, &self.rules, &self.rules.eval)
    }
}
