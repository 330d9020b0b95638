//! Position evaluation.
//!
//! [`evaluate`] is a total, pure function scoring a position **from the
//! perspective of the side to move**: positive means the player about to
//! move stands better. It combines, per the configured weight table:
//!
//! - material (separate midgame/endgame values, tapered by phase)
//! - piece-square tables
//! - pawn structure: doubled, isolated and passed pawns
//! - rook bonuses on open and semi-open files
//! - pseudo-mobility (attacked squares not occupied by friendly pieces)
//! - a king-danger penalty when the side's king is attacked
//!
//! Mobility deliberately counts attack squares rather than fully legal
//! moves; a legality pass per evaluation would multiply the cost of every
//! search node for no measurable strength difference at these depths.

pub mod pst;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::movegen::attacks;
use crate::types::{Bitboard, Color, PieceKind, Score, Square, Value};
use crate::variant::Rules;

/// Evaluation weight table, configurable per variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalWeights {
    /// Midgame material values indexed by piece kind (king last, unused).
    pub material_mg: [Value; PieceKind::COUNT],
    /// Endgame material values.
    pub material_eg: [Value; PieceKind::COUNT],
    pub bishop_pair: Value,
    pub doubled_pawn: Value,
    pub isolated_pawn: Value,
    /// Passed-pawn bonus by rank from the owner's side.
    pub passed_pawn: [Value; 8],
    pub rook_open_file: Value,
    pub rook_semi_open_file: Value,
    /// Bonus per pseudo-mobility square for non-pawn, non-king pieces.
    pub mobility: Value,
    /// Penalty applied while the side's king is attacked (negative).
    pub king_danger: Value,
}

impl Default for EvalWeights {
    fn default() -> Self {
        EvalWeights {
            material_mg: [100, 320, 330, 500, 900, 0],
            material_eg: [120, 300, 320, 550, 950, 0],
            bishop_pair: 30,
            doubled_pawn: -10,
            isolated_pawn: -20,
            passed_pawn: [0, 10, 20, 40, 60, 90, 130, 0],
            rook_open_file: 20,
            rook_semi_open_file: 10,
            mobility: 2,
            king_danger: -50,
        }
    }
}

/// Game phase in 0..=256, where 256 is the opening and 0 a bare endgame.
/// Driven by remaining non-pawn material.
fn game_phase(board: &Board) -> i32 {
    const KNIGHT_PHASE: i32 = 1;
    const BISHOP_PHASE: i32 = 1;
    const ROOK_PHASE: i32 = 2;
    const QUEEN_PHASE: i32 = 4;
    const TOTAL: i32 = 4 * KNIGHT_PHASE + 4 * BISHOP_PHASE + 4 * ROOK_PHASE + 2 * QUEEN_PHASE;

    let phase = board.pieces(PieceKind::Knight).count() as i32 * KNIGHT_PHASE
        + board.pieces(PieceKind::Bishop).count() as i32 * BISHOP_PHASE
        + board.pieces(PieceKind::Rook).count() as i32 * ROOK_PHASE
        + board.pieces(PieceKind::Queen).count() as i32 * QUEEN_PHASE;

    (phase * 256 / TOTAL).min(256)
}

#[inline]
fn taper(mg: i32, eg: i32, phase: i32) -> i32 {
    (mg * phase + eg * (256 - phase)) / 256
}

/// Squares in front of `sq` from `color`'s point of view, on the same and
/// both adjacent files. Used for passed-pawn detection.
fn front_span(sq: Square, color: Color) -> Bitboard {
    let file = sq.file();
    let mut files = Bitboard::file(file);
    if file > 0 {
        files |= Bitboard::file(file - 1);
    }
    if file < 7 {
        files |= Bitboard::file(file + 1);
    }
    let rank = sq.rank();
    let ahead = match color {
        Color::White if rank < 7 => Bitboard(!0u64 << ((rank + 1) * 8)),
        Color::Black if rank > 0 => Bitboard(!0u64 >> ((8 - rank) * 8)),
        _ => Bitboard::EMPTY,
    };
    files & ahead
}

fn adjacent_files(file: u8) -> Bitboard {
    let mut bb = Bitboard::EMPTY;
    if file > 0 {
        bb |= Bitboard::file(file - 1);
    }
    if file < 7 {
        bb |= Bitboard::file(file + 1);
    }
    bb
}

/// Evaluate `board` from the side to move's perspective.
pub fn evaluate(board: &Board, rules: &Rules, weights: &EvalWeights) -> Score {
    let phase = game_phase(board);
    let occupied = board.occupied();
    let all_pawns = board.pieces(PieceKind::Pawn);

    let mut mg = 0i32;
    let mut eg = 0i32;

    for color in [Color::White, Color::Black] {
        let sign = match color {
            Color::White => 1,
            Color::Black => -1,
        };
        let own = board.color_bb(color);
        let own_pawns = board.pieces_of(color, PieceKind::Pawn);
        let enemy_pawns = all_pawns ^ own_pawns;

        for kind in PieceKind::ALL {
            for sq in board.pieces_of(color, kind) {
                let idx = pst::index(sq, color);
                mg += sign * (weights.material_mg[kind.index()] + pst::mg(kind)[idx]);
                eg += sign * (weights.material_eg[kind.index()] + pst::eg(kind)[idx]);

                match kind {
                    PieceKind::Pawn => {
                        let file_bb = Bitboard::file(sq.file());
                        if (own_pawns & file_bb).count() > 1 {
                            mg += sign * weights.doubled_pawn;
                            eg += sign * weights.doubled_pawn;
                        }
                        if (own_pawns & adjacent_files(sq.file())).is_empty() {
                            mg += sign * weights.isolated_pawn;
                            eg += sign * weights.isolated_pawn;
                        }
                        if (enemy_pawns & front_span(sq, color)).is_empty() {
                            let rel_rank = match color {
                                Color::White => sq.rank(),
                                Color::Black => 7 - sq.rank(),
                            };
                            let bonus = weights.passed_pawn[rel_rank as usize];
                            mg += sign * bonus / 2;
                            eg += sign * bonus;
                        }
                    }
                    PieceKind::Rook => {
                        let file_bb = Bitboard::file(sq.file());
                        if (all_pawns & file_bb).is_empty() {
                            mg += sign * weights.rook_open_file;
                            eg += sign * weights.rook_open_file;
                        } else if (own_pawns & file_bb).is_empty() {
                            mg += sign * weights.rook_semi_open_file;
                            eg += sign * weights.rook_semi_open_file;
                        }
                    }
                    _ => {}
                }

                // Mobility for everything that is not a pawn or the king.
                if kind != PieceKind::Pawn && kind != PieceKind::King {
                    let mut reach = rules.leap_attacks(kind, sq);
                    let dirs = rules.ray_dirs(kind);
                    if !dirs.is_empty() {
                        reach |= attacks::ray_attacks(sq, dirs, occupied);
                    }
                    let count = (reach & !own).count() as i32;
                    mg += sign * weights.mobility * count;
                    eg += sign * weights.mobility * count;
                }
            }
        }

        if board.pieces_of(color, PieceKind::Bishop).count() >= 2 {
            mg += sign * weights.bishop_pair;
            eg += sign * weights.bishop_pair;
        }

        if attacks::is_square_attacked(board, board.king_square(color), !color, rules) {
            mg += sign * weights.king_danger;
            eg += sign * weights.king_danger;
        }
    }

    let white_score = taper(mg, eg, phase);
    match board.side_to_move() {
        Color::White => Score::cp(white_score),
        Color::Black => Score::cp(-white_score),
    }
}
