//! Game controller.
//!
//! [`Game`] orchestrates turns on top of the board, generator and search:
//! it exposes the legal move list, applies validated moves, detects every
//! terminal condition after each move (checkmate, stalemate, repetition,
//! fifty-move rule, insufficient material), supports undo, and delegates
//! move selection to the search engine on request. The presentation layer
//! talks only to this type.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::board::{Board, IllegalMove};
use crate::movegen;
use crate::search::{SearchLimits, SearchResult, Searcher};
use crate::types::{Color, Hash, Move, PieceKind};
use crate::variant::{ConfigError, Rules, VariantConfig};

/// Why a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverReason {
    Checkmate { winner: Color },
    Stalemate,
    FiftyMoveRule,
    Repetition,
    InsufficientMaterial,
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOverReason::Checkmate { winner } => write!(f, "checkmate, {} wins", winner),
            GameOverReason::Stalemate => write!(f, "stalemate"),
            GameOverReason::FiftyMoveRule => write!(f, "draw by the fifty-move rule"),
            GameOverReason::Repetition => write!(f, "draw by repetition"),
            GameOverReason::InsufficientMaterial => write!(f, "draw by insufficient material"),
        }
    }
}

/// Error surfaced by [`Game::make_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    /// The move is not legal in the current position.
    Illegal(IllegalMove),
    /// The game already ended.
    GameOver(GameOverReason),
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveError::Illegal(e) => write!(f, "{}", e),
            MoveError::GameOver(reason) => write!(f, "game is over: {}", reason),
        }
    }
}

impl std::error::Error for MoveError {}

impl From<IllegalMove> for MoveError {
    fn from(e: IllegalMove) -> Self {
        MoveError::Illegal(e)
    }
}

/// A saved game: the variant configuration plus the move list. Replaying
/// the moves from the configured start position reconstructs the exact
/// state, including clocks and repetition counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSave {
    pub config: VariantConfig,
    pub moves: Vec<String>,
}

/// Error surfaced by [`Game::load`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    Config(ConfigError),
    Move(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Config(e) => write!(f, "{}", e),
            LoadError::Move(text) => write!(f, "saved move `{}` does not replay", text),
        }
    }
}

impl std::error::Error for LoadError {}

/// One game in progress.
pub struct Game {
    config: VariantConfig,
    rules: Arc<Rules>,
    board: Board,
    /// Each played move with the position it was played from.
    history: Vec<(Move, Board)>,
    /// Occurrence count per position hash, current position included.
    repetition_counts: FxHashMap<Hash, u32>,
    searcher: Searcher,
}

impl Game {
    /// Start a game under the given variant configuration.
    pub fn new(config: VariantConfig) -> Result<Game, ConfigError> {
        let rules = Arc::new(config.compile()?);
        let board = Board::from_fen(&rules.start_fen)
            .expect("start FEN was validated during configuration compile");
        let mut repetition_counts = FxHashMap::default();
        repetition_counts.insert(board.hash(), 1);
        Ok(Game {
            config,
            searcher: Searcher::new(Arc::clone(&rules)),
            rules,
            board,
            history: Vec::new(),
            repetition_counts,
        })
    }

    /// Start a standard chess game.
    pub fn standard() -> Game {
        Game::new(VariantConfig::default()).expect("the default configuration is valid")
    }

    /// Read-only view of the current position.
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn config(&self) -> &VariantConfig {
        &self.config
    }

    /// All legal moves for the side to move. Empty iff the game is over by
    /// mate or stalemate.
    pub fn legal_moves(&self) -> Vec<Move> {
        movegen::legal_moves(&self.board, &self.rules)
    }

    pub fn is_in_check(&self) -> bool {
        movegen::is_in_check(&self.board, &self.rules)
    }

    /// Terminal-state query, checked after every move.
    pub fn game_over(&self) -> Option<GameOverReason> {
        if self.legal_moves().is_empty() {
            return Some(if self.is_in_check() {
                GameOverReason::Checkmate { winner: !self.board.side_to_move() }
            } else {
                GameOverReason::Stalemate
            });
        }
        if self.rules.fifty_move_rule && self.board.halfmove_clock() >= 100 {
            return Some(GameOverReason::FiftyMoveRule);
        }
        if self.rules.repetition > 0 {
            let count = self.repetition_counts.get(&self.board.hash()).copied().unwrap_or(0);
            if count >= self.rules.repetition {
                return Some(GameOverReason::Repetition);
            }
        }
        if self.insufficient_material() {
            return Some(GameOverReason::InsufficientMaterial);
        }
        None
    }

    /// Apply a move. Rejects moves outside the generator's output and any
    /// move after the game has ended; never silently corrects either.
    pub fn make_move(&mut self, m: Move) -> Result<(), MoveError> {
        if let Some(reason) = self.game_over() {
            return Err(MoveError::GameOver(reason));
        }
        let next = self.board.try_apply(m, &self.rules)?;
        self.history.push((m, self.board.clone()));
        *self.repetition_counts.entry(next.hash()).or_insert(0) += 1;
        self.board = next;
        Ok(())
    }

    /// Take back the last move. Returns false when at the start.
    pub fn undo(&mut self) -> bool {
        let Some((_, previous)) = self.history.pop() else {
            return false;
        };
        if let Some(count) = self.repetition_counts.get_mut(&self.board.hash()) {
            *count -= 1;
            if *count == 0 {
                self.repetition_counts.remove(&self.board.hash());
            }
        }
        self.board = previous;
        true
    }

    /// Resolve long-algebraic input ("e2e4", "e7e8q", castling as the king
    /// move "e1g1") against the legal move list.
    pub fn find_move(&self, text: &str) -> Option<Move> {
        let text = text.trim();
        if !text.is_ascii() || text.len() < 4 || text.len() > 5 {
            return None;
        }
        let from = text[0..2].parse().ok()?;
        let to = text[2..4].parse().ok()?;
        let promotion = match text.as_bytes().get(4) {
            Some(&ch) => Some(PieceKind::from_char((ch as char).to_ascii_uppercase())?),
            None => None,
        };
        self.legal_moves()
            .into_iter()
            .find(|m| m.from == from && m.to == to && m.promotion == promotion)
    }

    /// Ask the search engine for a move under `limits` (the variant's
    /// default budget when `None`). The result's `best_move` is `None` only
    /// when the game is over.
    pub fn think(&mut self, limits: Option<SearchLimits>) -> SearchResult {
        let limits = limits.unwrap_or_else(|| SearchLimits::from_config(&self.rules.search));
        let history: Vec<Hash> = self.history.iter().map(|(_, board)| board.hash()).collect();
        self.searcher.set_position_with_history(self.board.clone(), history);
        self.searcher.search(limits)
    }

    /// Snapshot the game for persistence.
    pub fn save(&self) -> GameSave {
        GameSave {
            config: self.config.clone(),
            moves: self.history.iter().map(|(m, _)| m.to_string()).collect(),
        }
    }

    /// Reconstruct a game from a save by replaying its moves.
    pub fn load(save: &GameSave) -> Result<Game, LoadError> {
        let mut game = Game::new(save.config.clone()).map_err(LoadError::Config)?;
        for text in &save.moves {
            let m = game.find_move(text).ok_or_else(|| LoadError::Move(text.clone()))?;
            game.make_move(m).map_err(|_| LoadError::Move(text.clone()))?;
        }
        Ok(game)
    }

    /// Draw by insufficient material: king vs king, or king and one minor
    /// piece vs king, or same-colored single bishops. Only claimed when the
    /// variant keeps standard movement; under overrides material strength
    /// is not decidable from counts.
    fn insufficient_material(&self) -> bool {
        if !self.rules.has_standard_movement() {
            return false;
        }
        let board = &self.board;
        for kind in [PieceKind::Pawn, PieceKind::Rook, PieceKind::Queen] {
            if !board.pieces(kind).is_empty() {
                return false;
            }
        }
        let knights = board.pieces(PieceKind::Knight);
        let bishops = board.pieces(PieceKind::Bishop);
        let minors = knights.count() + bishops.count();
        if minors <= 1 {
            return true;
        }
        if knights.is_empty()
            && board.pieces_of(Color::White, PieceKind::Bishop).count() == 1
            && board.pieces_of(Color::Black, PieceKind::Bishop).count() == 1
        {
            let colors: Vec<u8> = bishops.map(|sq| (sq.file() + sq.rank()) & 1).collect();
            return colors[0] == colors[1];
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(game: &mut Game, moves: &[&str]) {
        for text in moves {
            let m = game.find_move(text).unwrap_or_else(|| panic!("no move {}", text));
            game.make_move(m).unwrap_or_else(|e| panic!("move {} rejected: {}", text, e));
        }
    }

    #[test]
    fn test_fools_mate_is_detected() {
        let mut game = Game::standard();
        play(&mut game, &["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert_eq!(
            game.game_over(),
            Some(GameOverReason::Checkmate { winner: Color::Black })
        );
        // No further moves are accepted.
        let any = Move::quiet("a2".parse().unwrap(), "a3".parse().unwrap(), PieceKind::Pawn);
        assert!(matches!(game.make_move(any), Err(MoveError::GameOver(_))));
    }

    #[test]
    fn test_illegal_move_is_rejected_not_corrected() {
        let mut game = Game::standard();
        let bogus = Move::quiet("e2".parse().unwrap(), "e5".parse().unwrap(), PieceKind::Pawn);
        assert!(matches!(game.make_move(bogus), Err(MoveError::Illegal(_))));
        assert_eq!(game.board().to_fen(), Board::startpos().to_fen());
    }

    #[test]
    fn test_stalemate_from_configured_start() {
        let config = VariantConfig {
            start_fen: Some("7k/5Q2/5K2/8/8/8/8/8 b - - 0 1".to_string()),
            ..Default::default()
        };
        let game = Game::new(config).unwrap();
        assert_eq!(game.game_over(), Some(GameOverReason::Stalemate));
    }

    #[test]
    fn test_fifty_move_rule_triggers_at_hundred_plies() {
        let config = VariantConfig {
            start_fen: Some("4k3/8/8/8/8/8/8/R3K3 w - - 99 80".to_string()),
            ..Default::default()
        };
        let mut game = Game::new(config).unwrap();
        assert_eq!(game.game_over(), None);
        play(&mut game, &["a1a2"]);
        assert_eq!(game.game_over(), Some(GameOverReason::FiftyMoveRule));
    }

    #[test]
    fn test_fifty_move_rule_can_be_disabled() {
        let config = VariantConfig {
            start_fen: Some("4k3/8/8/8/8/8/8/R3K3 w - - 99 80".to_string()),
            fifty_move_rule: false,
            ..Default::default()
        };
        let mut game = Game::new(config).unwrap();
        play(&mut game, &["a1a2"]);
        assert_eq!(game.game_over(), None);
    }

    #[test]
    fn test_threefold_repetition() {
        let mut game = Game::standard();
        // Knights shuffle out and back twice: the start position occurs a
        // third time after the second return.
        play(
            &mut game,
            &["g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8"],
        );
        assert_eq!(game.game_over(), Some(GameOverReason::Repetition));
    }

    #[test]
    fn test_insufficient_material_bare_kings() {
        let config = VariantConfig {
            start_fen: Some("4k3/8/8/8/8/8/8/4K3 w - - 0 1".to_string()),
            ..Default::default()
        };
        let game = Game::new(config).unwrap();
        assert_eq!(game.game_over(), Some(GameOverReason::InsufficientMaterial));
    }

    #[test]
    fn test_sufficient_material_with_rook() {
        let config = VariantConfig {
            start_fen: Some("4k3/8/8/8/8/8/8/R3K3 w - - 0 1".to_string()),
            ..Default::default()
        };
        let game = Game::new(config).unwrap();
        assert_eq!(game.game_over(), None);
    }

    #[test]
    fn test_undo_restores_everything() {
        let mut game = Game::standard();
        let initial_fen = game.board().to_fen();
        play(&mut game, &["e2e4", "c7c5"]);
        assert!(game.undo());
        assert!(game.undo());
        assert_eq!(game.board().to_fen(), initial_fen);
        assert!(!game.undo());
        assert_eq!(game.legal_moves().len(), 20);
    }

    #[test]
    fn test_think_produces_a_playable_move() {
        let mut game = Game::standard();
        let result = game.think(Some(SearchLimits::fixed_depth(2)));
        let m = result.best_move.expect("startpos has moves");
        game.make_move(m).expect("searched move is legal");
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut game = Game::standard();
        play(&mut game, &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4"]);
        let save = game.save();
        let json = serde_json::to_string(&save).unwrap();
        let restored: GameSave = serde_json::from_str(&json).unwrap();
        let loaded = Game::load(&restored).unwrap();
        assert_eq!(loaded.board().to_fen(), game.board().to_fen());
        assert_eq!(loaded.legal_moves(), game.legal_moves());
    }

    #[test]
    fn test_find_move_parses_promotions() {
        let config = VariantConfig {
            start_fen: Some("4k3/P7/8/8/8/8/8/4K3 w - - 0 1".to_string()),
            ..Default::default()
        };
        let game = Game::new(config).unwrap();
        let m = game.find_move("a7a8q").expect("promotion parses");
        assert_eq!(m.promotion, Some(PieceKind::Queen));
        assert!(game.find_move("a7a8x").is_none());
        assert!(game.find_move("zz9").is_none());
    }
}
