//! varchess, a configurable chess-variant engine.
//!
//! The crate is organized leaf-first:
//!
//! - [`types`]: squares, bitboards, moves, scores
//! - [`variant`]: rule configuration compiled into movement tables
//! - [`board`]: position state with pure copy-make application
//! - [`movegen`]: legal move generation and attack queries
//! - [`eval`]: weight-table-driven position evaluation
//! - [`search`]: iterative-deepening alpha-beta with a transposition table
//! - [`game`]: the controller the presentation layer talks to
//! - [`cli`]: a thin text front end over the controller
//!
//! Rendering, input handling and networking are out of scope; anything that
//! wants to present a game consumes [`game::Game`] snapshots and move
//! lists, exactly as the bundled CLI does.

pub mod board;
pub mod cli;
pub mod eval;
pub mod game;
pub mod movegen;
pub mod search;
pub mod types;
pub mod variant;

pub use board::{Board, FenError};
pub use game::{Game, GameOverReason, GameSave, MoveError};
pub use search::{SearchLimits, SearchResult, Searcher};
pub use types::{Color, Move, Piece, PieceKind, Score, Square};
pub use variant::{ConfigError, Drawback, Rules, VariantConfig};
