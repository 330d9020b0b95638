//! Variant configuration.
//!
//! The engine hard-codes no rule set. A [`VariantConfig`] is deserialized
//! from JSON (or built in code), validated, and compiled into [`Rules`]:
//! precomputed per-kind movement tables plus the feature flags the move
//! generator, evaluator and game controller consult. Compilation is the
//! only place configuration can fail; everything downstream treats `Rules`
//! as trusted.
//!
//! # Configured options
//! - board dimensions (only 8x8 compiles onto the bitboard representation)
//! - per-kind movement overrides (`leaps` / `rays` delta lists), the
//!   "custom pieces" mechanism
//! - castling and en passant toggles
//! - per-player drawbacks (named move filters)
//! - repetition threshold and fifty-move rule
//! - initial position FEN
//! - search defaults and evaluation weight table

mod drawback;

pub use drawback::Drawback;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::{Board, FenError};
use crate::eval::EvalWeights;
use crate::movegen::attacks;
use crate::types::{Bitboard, Color, PieceKind, Square, MAX_DEPTH};

/// File/rank deltas of the standard leapers and sliders.
pub const KNIGHT_DELTAS: [(i8, i8); 8] =
    [(-2, -1), (-2, 1), (-1, -2), (-1, 2), (1, -2), (1, 2), (2, -1), (2, 1)];
pub const KING_DELTAS: [(i8, i8); 8] =
    [(-1, -1), (-1, 0), (-1, 1), (0, -1), (0, 1), (1, -1), (1, 0), (1, 1)];
pub const BISHOP_DIRS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
pub const ROOK_DIRS: [(i8, i8); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];
pub const QUEEN_DIRS: [(i8, i8); 8] =
    [(-1, -1), (-1, 0), (-1, 1), (0, -1), (0, 1), (1, -1), (1, 0), (1, 1)];

/// FEN of the standard initial position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Movement description for one piece kind: single-step jumps plus sliding
/// directions. Deltas are `[dfile, drank]`. An override replaces the kind's
/// standard movement entirely.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSpec {
    #[serde(default)]
    pub leaps: Vec<[i8; 2]>,
    #[serde(default)]
    pub rays: Vec<[i8; 2]>,
}

/// Board dimensions. Recognized for forward compatibility; only 8x8 is
/// accepted by [`VariantConfig::compile`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSize {
    pub files: u8,
    pub ranks: u8,
}

impl Default for BoardSize {
    fn default() -> Self {
        BoardSize { files: 8, ranks: 8 }
    }
}

/// Per-player drawback names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawbackNames {
    #[serde(default)]
    pub white: Option<String>,
    #[serde(default)]
    pub black: Option<String>,
}

/// Default search settings for the AI player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default depth when `go` gives no explicit limit.
    #[serde(default = "default_depth")]
    pub depth: i32,
    /// Optional default time budget per move, milliseconds.
    #[serde(default)]
    pub movetime_ms: Option<u64>,
    /// Transposition table size in megabytes.
    #[serde(default = "default_tt_mb")]
    pub tt_size_mb: usize,
    /// Run quiescence search at leaves. Disable for depth-exact play.
    #[serde(default = "default_true")]
    pub quiescence: bool,
}

fn default_depth() -> i32 {
    5
}

fn default_tt_mb() -> usize {
    16
}

fn default_true() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            depth: default_depth(),
            movetime_ms: None,
            tt_size_mb: default_tt_mb(),
            quiescence: true,
        }
    }
}

/// A variant rule set as supplied by the user. See the module docs for the
/// recognized options. The default value is standard chess.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub board: BoardSize,
    #[serde(default = "default_true")]
    pub castling: bool,
    #[serde(default = "default_true")]
    pub en_passant: bool,
    /// Draw when a position occurs this many times. 0 disables.
    #[serde(default = "default_repetition")]
    pub repetition: u32,
    #[serde(default = "default_true")]
    pub fifty_move_rule: bool,
    #[serde(default)]
    pub drawbacks: DrawbackNames,
    /// Movement overrides keyed by kind name ("knight" .. "king").
    #[serde(default)]
    pub pieces: BTreeMap<String, MoveSpec>,
    /// Initial position; standard start when absent.
    #[serde(default)]
    pub start_fen: Option<String>,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub eval: EvalWeights,
}

fn default_repetition() -> u32 {
    3
}

impl Default for VariantConfig {
    fn default() -> Self {
        VariantConfig {
            name: String::new(),
            board: BoardSize::default(),
            castling: true,
            en_passant: true,
            repetition: default_repetition(),
            fifty_move_rule: true,
            drawbacks: DrawbackNames::default(),
            pieces: BTreeMap::new(),
            start_fen: None,
            search: SearchConfig::default(),
            eval: EvalWeights::default(),
        }
    }
}

impl VariantConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<VariantConfig, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration and precompute the movement tables.
    pub fn compile(&self) -> Result<Rules, ConfigError> {
        if self.board.files != 8 || self.board.ranks != 8 {
            return Err(ConfigError::UnsupportedBoardSize {
                files: self.board.files,
                ranks: self.board.ranks,
            });
        }
        if self.repetition == 1 {
            return Err(ConfigError::BadRepetitionThreshold(self.repetition));
        }

        // Standard movement, then apply overrides.
        let mut leaps: [Vec<(i8, i8)>; PieceKind::COUNT] = Default::default();
        let mut rays: [Vec<(i8, i8)>; PieceKind::COUNT] = Default::default();
        leaps[PieceKind::Knight.index()] = KNIGHT_DELTAS.to_vec();
        leaps[PieceKind::King.index()] = KING_DELTAS.to_vec();
        rays[PieceKind::Bishop.index()] = BISHOP_DIRS.to_vec();
        rays[PieceKind::Rook.index()] = ROOK_DIRS.to_vec();
        rays[PieceKind::Queen.index()] = QUEEN_DIRS.to_vec();

        let mut standard_movement = true;
        for (name, spec) in &self.pieces {
            let kind = PieceKind::ALL
                .iter()
                .copied()
                .find(|k| k.name() == name.as_str())
                .ok_or_else(|| ConfigError::UnknownPiece(name.clone()))?;
            if kind == PieceKind::Pawn {
                // Pushes, promotion and en passant are anchored to the pawn
                // kind and cannot be redefined by a delta list.
                return Err(ConfigError::PawnMovement);
            }
            if spec.leaps.is_empty() && spec.rays.is_empty() {
                return Err(ConfigError::EmptyMoveSpec(name.clone()));
            }
            for &delta in spec.leaps.iter().chain(spec.rays.iter()) {
                let [df, dr] = delta;
                if (df == 0 && dr == 0) || df.abs() > 7 || dr.abs() > 7 {
                    return Err(ConfigError::BadDelta { kind: name.clone(), delta });
                }
            }
            leaps[kind.index()] = spec.leaps.iter().map(|&[f, r]| (f, r)).collect();
            rays[kind.index()] = spec.rays.iter().map(|&[f, r]| (f, r)).collect();
            standard_movement = false;
        }

        let mut drawbacks = [None, None];
        for (color, name) in [
            (Color::White, &self.drawbacks.white),
            (Color::Black, &self.drawbacks.black),
        ] {
            if let Some(name) = name {
                let d = Drawback::parse(name)
                    .ok_or_else(|| ConfigError::UnknownDrawback(name.clone()))?;
                drawbacks[color.index()] = Some(d);
            }
        }

        let start_fen = self.start_fen.clone().unwrap_or_else(|| START_FEN.to_string());
        Board::from_fen(&start_fen).map_err(ConfigError::StartPosition)?;

        let mut leap_tables = [[Bitboard::EMPTY; Square::COUNT]; PieceKind::COUNT];
        let mut rev_leap_tables = [[Bitboard::EMPTY; Square::COUNT]; PieceKind::COUNT];
        for kind in PieceKind::ALL {
            leap_tables[kind.index()] = attacks::leap_table(&leaps[kind.index()]);
            let reversed: Vec<(i8, i8)> =
                leaps[kind.index()].iter().map(|&(f, r)| (-f, -r)).collect();
            rev_leap_tables[kind.index()] = attacks::leap_table(&reversed);
        }

        let mut search = self.search.clone();
        search.depth = search.depth.clamp(1, MAX_DEPTH);
        search.tt_size_mb = search.tt_size_mb.max(1);

        Ok(Rules {
            castling: self.castling,
            en_passant: self.en_passant,
            repetition: self.repetition,
            fifty_move_rule: self.fifty_move_rule,
            drawbacks,
            search,
            eval: self.eval.clone(),
            start_fen,
            leap: leap_tables,
            rev_leap: rev_leap_tables,
            rays,
            standard_movement,
        })
    }
}

/// A compiled, validated rule set. Threaded explicitly through move
/// generation, evaluation and search; there is no global rules state.
#[derive(Clone, Debug)]
pub struct Rules {
    pub castling: bool,
    pub en_passant: bool,
    pub repetition: u32,
    pub fifty_move_rule: bool,
    pub search: SearchConfig,
    pub eval: EvalWeights,
    pub start_fen: String,
    drawbacks: [Option<Drawback>; Color::COUNT],
    leap: [[Bitboard; Square::COUNT]; PieceKind::COUNT],
    rev_leap: [[Bitboard; Square::COUNT]; PieceKind::COUNT],
    rays: [Vec<(i8, i8)>; PieceKind::COUNT],
    standard_movement: bool,
}

impl Rules {
    /// Compiled standard chess.
    pub fn standard() -> Rules {
        VariantConfig::default()
            .compile()
            .expect("the default configuration is valid")
    }

    /// Squares a piece of `kind` jumps to from `sq` (empty for pure sliders
    /// and pawns).
    #[inline]
    pub fn leap_attacks(&self, kind: PieceKind, sq: Square) -> Bitboard {
        self.leap[kind.index()][sq.index()]
    }

    /// Squares from which a piece of `kind` jumps *onto* `sq`. Built from
    /// the negated delta list, so asymmetric movement overrides stay exact.
    #[inline]
    pub fn leap_attackers(&self, kind: PieceKind, sq: Square) -> Bitboard {
        self.rev_leap[kind.index()][sq.index()]
    }

    /// Sliding directions of `kind`.
    #[inline]
    pub fn ray_dirs(&self, kind: PieceKind) -> &[(i8, i8)] {
        &self.rays[kind.index()]
    }

    #[inline]
    pub fn drawback(&self, color: Color) -> Option<Drawback> {
        self.drawbacks[color.index()]
    }

    /// True when no movement override is active. Insufficient-material
    /// detection only applies to standard movement.
    #[inline]
    pub fn has_standard_movement(&self) -> bool {
        self.standard_movement
    }
}

/// Malformed variant rule set. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    UnsupportedBoardSize { files: u8, ranks: u8 },
    UnknownPiece(String),
    PawnMovement,
    EmptyMoveSpec(String),
    BadDelta { kind: String, delta: [i8; 2] },
    UnknownDrawback(String),
    BadRepetitionThreshold(u32),
    StartPosition(FenError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "configuration parse error: {}", msg),
            ConfigError::UnsupportedBoardSize { files, ranks } => {
                write!(f, "unsupported board size {}x{} (only 8x8 is supported)", files, ranks)
            }
            ConfigError::UnknownPiece(name) => write!(f, "unknown piece kind `{}`", name),
            ConfigError::PawnMovement => {
                write!(f, "pawn movement cannot be overridden")
            }
            ConfigError::EmptyMoveSpec(kind) => {
                write!(f, "movement spec for `{}` has neither leaps nor rays", kind)
            }
            ConfigError::BadDelta { kind, delta } => {
                write!(f, "bad movement delta [{}, {}] for `{}`", delta[0], delta[1], kind)
            }
            ConfigError::UnknownDrawback(name) => write!(f, "unknown drawback `{}`", name),
            ConfigError::BadRepetitionThreshold(n) => {
                write!(f, "repetition threshold {} is not usable (use 0 to disable)", n)
            }
            ConfigError::StartPosition(e) => write!(f, "bad start position: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::StartPosition(e) => Some(e),
            _ => None,
        }
    }
}
