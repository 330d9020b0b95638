//! Quiescence search.
//!
//! At depth zero the static evaluation is unreliable in the middle of a
//! capture sequence (the horizon effect), so the search keeps resolving
//! captures until the position is quiet. The side to move may always
//! "stand pat" on the static score, since declining a capture is legal.

use crate::board::Board;
use crate::movegen;
use crate::types::{Ply, Score};

use super::ordering::MovePicker;
use super::Searcher;

impl Searcher {
    pub(super) fn quiescence(
        &mut self,
        board: &Board,
        ply: Ply,
        mut alpha: Score,
        beta: Score,
    ) -> Score {
        self.visit_node(ply);

        let stand_pat = self.evaluate(board);
        if self.should_stop() || stand_pat >= beta {
            return stand_pat;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        let moves = movegen::legal_moves(board, &self.rules);
        let mut picker = MovePicker::captures(board, moves);

        let mut best = stand_pat;
        while let Some(m) = picker.next() {
            let child = board.apply(m);
            let score = -self.quiescence(&child, ply.next(), -beta, -alpha);
            if self.stop {
                break;
            }
            if score > best {
                best = score;
                if score > alpha {
                    alpha = score;
                    if score >= beta {
                        break;
                    }
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::search::SearchLimits;
    use crate::variant::Rules;

    #[test]
    fn test_quiescence_sees_hanging_piece() {
        // White to move with depth 1: without quiescence, capturing the
        // defended pawn on d5 with the queen looks like a free pawn; the
        // capture search must see the recapture.
        let board =
            Board::from_fen("rnbqkbnr/ppp1pppp/8/3p4/8/3Q4/PPPPPPPP/RNB1KBNR w KQkq - 0 1")
                .unwrap();
        let mut s = Searcher::new(Arc::new(Rules::standard()));
        s.set_position(board);
        let result = s.search(SearchLimits::fixed_depth(1));
        assert_ne!(result.best_move.unwrap().to_string(), "d3d5");
    }
}
