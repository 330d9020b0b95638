//! Negamax alpha-beta.
//!
//! Fail-soft: a node returns its best score even when it falls outside the
//! [alpha, beta] window, and the window classification (exact / lower /
//! upper bound) is what gets recorded in the transposition table. Pruning
//! only skips subtrees a sibling already proves irrelevant, so the chosen
//! move matches a full minimax search up to tie-breaks.

use crate::board::Board;
use crate::movegen;
use crate::types::{Depth, Ply, Score};

use super::ordering::MovePicker;
use super::tt::Bound;
use super::Searcher;

impl Searcher {
    /// Search `board` to `depth`, `ply` half-moves below the root, inside
    /// the window `(alpha, beta)`. The score is from the perspective of the
    /// side to move in `board`.
    pub(super) fn negamax(
        &mut self,
        board: &Board,
        depth: Depth,
        ply: Ply,
        mut alpha: Score,
        beta: Score,
    ) -> Score {
        self.visit_node(ply);

        // Rule draws cut the tree before anything else.
        if self.rules.fifty_move_rule && board.halfmove_clock() >= 100 {
            return Score::DRAW;
        }
        let hash = board.hash();
        if self.is_repetition_draw(hash) {
            return Score::DRAW;
        }

        let orig_alpha = alpha;
        let mut tt_action = 0u16;

        if let Some(entry) = self.tt.probe(hash) {
            tt_action = entry.action();
            if entry.depth() >= depth {
                let score = entry.score().from_tt(ply.raw());
                match entry.bound() {
                    Bound::Exact => return score,
                    Bound::Lower => {
                        if score >= beta {
                            return score;
                        }
                        if score > alpha {
                            alpha = score;
                        }
                    }
                    Bound::Upper => {
                        if score <= alpha {
                            return score;
                        }
                    }
                    Bound::None => {}
                }
            }
        }

        // The return value after a stop is discarded by every caller.
        if self.should_stop() {
            return Score::DRAW;
        }

        let moves = movegen::legal_moves(board, &self.rules);

        // Terminal: no legal move is mate or stalemate, scored here so the
        // mate distance counts plies from the root.
        if moves.is_empty() {
            return if movegen::is_in_check(board, &self.rules) {
                Score::mated_in(ply.raw())
            } else {
                Score::DRAW
            };
        }

        if depth.is_leaf() {
            return if self.use_quiescence {
                self.quiescence(board, ply, alpha, beta)
            } else {
                self.evaluate(board)
            };
        }

        let killers = self.killers.get(ply);
        let mut picker = MovePicker::new(board, moves, tt_action, killers);

        let mut best = Score::NEG_INF;
        let mut best_action = 0u16;

        self.path.push(hash);
        while let Some(m) = picker.next() {
            let child = board.apply(m);
            let score = -self.negamax(&child, depth - 1, ply.next(), -beta, -alpha);
            if self.stop {
                break;
            }
            if score > best {
                best = score;
                best_action = m.action();
                if score > alpha {
                    alpha = score;
                    if score >= beta {
                        // Remember quiet cutoff moves for sibling ordering.
                        if m.is_quiet() {
                            self.killers.store(ply, m);
                        }
                        break;
                    }
                }
            }
        }
        self.path.pop();

        if !self.stop {
            let bound = if best >= beta {
                Bound::Lower
            } else if best > orig_alpha {
                Bound::Exact
            } else {
                Bound::Upper
            };
            self.tt.store(hash, best_action, best.to_tt(ply.raw()), depth, bound);
        }

        best
    }
}
