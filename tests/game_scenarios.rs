//! Cross-module scenario tests: random playouts checking the generator and
//! applier invariants together, drawback games, and persistence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use varchess::movegen::{is_square_attacked, legal_moves};
use varchess::search::SearchLimits;
use varchess::{Board, Game, GameSave, PieceKind, Rules, VariantConfig};

/// Drive a random legal game and verify, at every step:
/// - `apply` leaves the source position untouched (undo by retention),
/// - the incremental hash matches a from-scratch recomputation,
/// - no generated move leaves the mover's king attacked.
#[test]
fn random_playout_preserves_invariants() {
    let rules = Rules::standard();
    let mut rng = StdRng::seed_from_u64(20_240_817);

    for _ in 0..5 {
        let mut board = Board::startpos();
        for _ in 0..80 {
            let moves = legal_moves(&board, &rules);
            if moves.is_empty() {
                break;
            }
            let us = board.side_to_move();
            for &m in &moves {
                let next = board.apply(m);
                assert!(
                    !is_square_attacked(&next, next.king_square(us), !us, &rules),
                    "{} leaves the king attacked in {}",
                    m,
                    board.to_fen()
                );
            }

            let before = board.clone();
            let m = moves[rng.gen_range(0..moves.len())];
            let next = board.apply(m);

            assert_eq!(board, before, "apply mutated its input");
            assert_eq!(next.hash(), next.compute_hash(), "incremental hash drifted");
            assert_eq!(Board::from_fen(&next.to_fen()).unwrap(), next, "FEN round trip");

            board = next;
        }
    }
}

#[test]
fn drawback_game_never_offers_banned_moves() {
    let mut config = VariantConfig::default();
    config.drawbacks.white = Some("no_queen".to_string());
    config.drawbacks.black = Some("no_castling".to_string());
    let mut game = Game::new(config).unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..40 {
        if game.game_over().is_some() {
            break;
        }
        let moves = game.legal_moves();
        match game.board().side_to_move() {
            varchess::Color::White => {
                assert!(moves.iter().all(|m| m.kind != PieceKind::Queen));
            }
            varchess::Color::Black => {
                assert!(moves.iter().all(|m| !m.is_castle()));
            }
        }
        let m = moves[rng.gen_range(0..moves.len())];
        game.make_move(m).unwrap();
    }
}

#[test]
fn ai_vs_ai_plays_a_legal_game_to_some_conclusion() {
    let mut config = VariantConfig::default();
    config.search.depth = 2;
    config.search.tt_size_mb = 1;
    let mut game = Game::new(config).unwrap();

    for _ in 0..30 {
        if game.game_over().is_some() {
            break;
        }
        let result = game.think(Some(SearchLimits::fixed_depth(2)));
        let m = result.best_move.expect("game not over, so a move exists");
        game.make_move(m).expect("engine move must be legal");
    }
    // Thirty plies of self-play either ended the game or left a position
    // that is still consistent.
    assert_eq!(game.board().hash(), game.board().compute_hash());
}

#[test]
fn save_load_round_trip_with_custom_variant() {
    // A variant with an overridden knight and a drawback; the save must
    // carry the config so the replay happens under the same rules.
    let mut config = VariantConfig::default();
    config.name = "camel-test".to_string();
    config.pieces.insert(
        "knight".to_string(),
        varchess::variant::MoveSpec {
            leaps: vec![[3, 1], [3, -1], [-3, 1], [-3, -1], [1, 3], [1, -3], [-1, 3], [-1, -3]],
            rays: vec![],
        },
    );
    config.drawbacks.black = Some("no_promotion".to_string());

    let mut game = Game::new(config).unwrap();
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..12 {
        if game.game_over().is_some() {
            break;
        }
        let moves = game.legal_moves();
        let m = moves[rng.gen_range(0..moves.len())];
        game.make_move(m).unwrap();
    }

    let save = game.save();
    let json = serde_json::to_string(&save).unwrap();
    let restored: GameSave = serde_json::from_str(&json).unwrap();
    let loaded = Game::load(&restored).unwrap();

    assert_eq!(loaded.board().to_fen(), game.board().to_fen());
    assert_eq!(loaded.legal_moves(), game.legal_moves());
    assert_eq!(loaded.config().name, "camel-test");
}

#[test]
fn board_fen_serialization_is_lossless_for_all_fields() {
    let fen = "r3k2r/1pp2ppp/8/4pP2/8/8/PPPP2PP/R3K2R w Kq e6 5 13";
    let board = Board::from_fen(fen).unwrap();
    let json = serde_json::to_string(&board).unwrap();
    let back: Board = serde_json::from_str(&json).unwrap();
    assert_eq!(back, board);
    assert_eq!(back.to_fen(), fen);
}
