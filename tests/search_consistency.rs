//! Alpha-beta versus plain minimax.
//!
//! Pruning must change efficiency, never the chosen move (up to ties): at a
//! fixed depth the engine's root move has to achieve the same minimax value
//! as an unpruned reference search using the identical leaf evaluation.
//! Quiescence is disabled through the variant config so both searches see
//! the same leaves.

use std::sync::Arc;

use varchess::eval::evaluate;
use varchess::movegen::{is_in_check, legal_moves};
use varchess::search::SearchLimits;
use varchess::{Board, Rules, Score, Searcher, VariantConfig};

/// Unpruned negamax over the public API, mirroring the engine's terminal
/// rules: mate scored by distance from the root, stalemate as a draw.
fn minimax(board: &Board, rules: &Rules, depth: i32, ply: i32) -> Score {
    let moves = legal_moves(board, rules);
    if moves.is_empty() {
        return if is_in_check(board, rules) { Score::mated_in(ply) } else { Score::DRAW };
    }
    if depth == 0 {
        return evaluate(board, rules, &rules.eval);
    }
    let mut best = Score::NEG_INF;
    for m in moves {
        let score = -minimax(&board.apply(m), rules, depth - 1, ply + 1);
        if score > best {
            best = score;
        }
    }
    best
}

fn depth_exact_rules() -> Arc<Rules> {
    let mut config = VariantConfig::default();
    config.search.quiescence = false;
    Arc::new(config.compile().unwrap())
}

fn assert_search_matches_minimax(fen: &str, depth: i32) {
    let rules = depth_exact_rules();
    let board = Board::from_fen(fen).unwrap();

    let mut searcher = Searcher::new(Arc::clone(&rules));
    searcher.set_position(board.clone());
    let result = searcher.search(SearchLimits::fixed_depth(depth));
    let engine_move = result.best_move.expect("position is not terminal");

    // Reference value of the position and of the engine's choice.
    let best_value = minimax(&board, &rules, depth, 0);
    let engine_value = -minimax(&board.apply(engine_move), &rules, depth - 1, 1);

    assert_eq!(
        engine_value, best_value,
        "in {} at depth {}: engine played {} worth {:?}, minimax best is {:?}",
        fen, depth, engine_move, engine_value, best_value
    );
    assert_eq!(result.score, best_value, "reported score disagrees with minimax");
}

#[test]
fn alphabeta_matches_minimax_open_middlegame() {
    assert_search_matches_minimax(
        "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 3 3",
        3,
    );
}

#[test]
fn alphabeta_matches_minimax_hanging_piece() {
    // Black's knight on e5 is loose; the tactics are shallow enough for an
    // exact depth-3 comparison.
    assert_search_matches_minimax(
        "rnbqkb1r/pppp1ppp/8/4n3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 0 3",
        3,
    );
}

#[test]
fn alphabeta_matches_minimax_rook_endgame() {
    assert_search_matches_minimax("8/5pk1/7p/8/8/6KP/5P2/3R4 w - - 0 40", 3);
}

#[test]
fn alphabeta_matches_minimax_finds_forced_mate() {
    // Back-rank mate in one: both searches must agree on the mate score.
    assert_search_matches_minimax("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1", 3);
}
