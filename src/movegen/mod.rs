//! Move generation.
//!
//! [`legal_moves`] is the composition the contract asks for: pseudo-legal
//! generation per piece kind, then a king-safety filter that applies each
//! candidate and discards any that leaves the mover's king attacked, then
//! the active player's drawback filter. The returned order is deterministic
//! for a given position and rule set: kinds are visited in a fixed order and
//! squares in ascending index order.
//!
//! An empty result means the game is over for the side to move; callers
//! distinguish checkmate from stalemate with [`is_in_check`].

pub mod attacks;

pub use attacks::is_square_attacked;

use crate::board::Board;
use crate::types::{Color, Move, PieceKind, Square};
use crate::variant::Rules;

/// Promotion kinds in generation order.
const PROMOTION_KINDS: [PieceKind; 4] =
    [PieceKind::Queen, PieceKind::Rook, PieceKind::Bishop, PieceKind::Knight];

/// Generate all legal moves for the side to move.
pub fn legal_moves(board: &Board, rules: &Rules) -> Vec<Move> {
    let us = board.side_to_move();
    let them = !us;

    let mut moves = pseudo_legal(board, rules);

    // King-safety filter: simulate, reject anything leaving our king
    // attacked. Castling path squares were already vetted during
    // generation; the destination square is covered here like any move.
    moves.retain(|&m| {
        let next = board.apply(m);
        !is_square_attacked(&next, next.king_square(us), them, rules)
    });

    if let Some(drawback) = rules.drawback(us) {
        moves.retain(|&m| drawback.allows(m));
    }

    moves
}

/// Is the side to move currently in check?
#[inline]
pub fn is_in_check(board: &Board, rules: &Rules) -> bool {
    let us = board.side_to_move();
    is_square_attacked(board, board.king_square(us), !us, rules)
}

/// Count leaf nodes of the legal move tree to `depth`. The standard
/// move-generator correctness harness: totals for known positions are
/// tabulated in the chess literature and in this crate's tests.
pub fn perft(board: &Board, rules: &Rules, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = legal_moves(board, rules);
    if depth == 1 {
        return moves.len() as u64;
    }
    moves
        .iter()
        .map(|&m| perft(&board.apply(m), rules, depth - 1))
        .sum()
}

fn pseudo_legal(board: &Board, rules: &Rules) -> Vec<Move> {
    let us = board.side_to_move();
    let own = board.color_bb(us);
    let enemy = board.color_bb(!us);
    let occupied = board.occupied();

    let mut moves = Vec::with_capacity(64);

    for from in board.pieces_of(us, PieceKind::Pawn) {
        pawn_moves(board, rules, from, &mut moves);
    }

    for kind in [
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ] {
        for from in board.pieces_of(us, kind) {
            let mut targets = rules.leap_attacks(kind, from) & !own;
            let dirs = rules.ray_dirs(kind);
            if !dirs.is_empty() {
                targets |= attacks::ray_attacks(from, dirs, occupied) & !own;
            }
            for to in targets {
                if enemy.contains(to) {
                    moves.push(Move::capture(from, to, kind));
                } else {
                    moves.push(Move::quiet(from, to, kind));
                }
            }
        }
    }

    castle_moves(board, rules, &mut moves);

    moves
}

fn pawn_moves(board: &Board, rules: &Rules, from: Square, moves: &mut Vec<Move>) {
    let us = board.side_to_move();
    let enemy = board.color_bb(!us);
    let occupied = board.occupied();
    let forward = us.forward();
    let start_rank = match us {
        Color::White => 1,
        Color::Black => 6,
    };
    let promo_rank = (!us).back_rank();

    // Pushes.
    if let Some(to) = from.offset(0, forward) {
        if !occupied.contains(to) {
            if to.rank() == promo_rank {
                for promo in PROMOTION_KINDS {
                    moves.push(Move::promotion(from, to, promo, false));
                }
            } else {
                moves.push(Move::quiet(from, to, PieceKind::Pawn));
                if from.rank() == start_rank {
                    if let Some(double) = from.offset(0, 2 * forward) {
                        if !occupied.contains(double) {
                            moves.push(Move::double_push(from, double));
                        }
                    }
                }
            }
        }
    }

    // Captures, including en passant onto the ghost square.
    for to in attacks::pawn_attacks(us, from) {
        if enemy.contains(to) {
            if to.rank() == promo_rank {
                for promo in PROMOTION_KINDS {
                    moves.push(Move::promotion(from, to, promo, true));
                }
            } else {
                moves.push(Move::capture(from, to, PieceKind::Pawn));
            }
        } else if rules.en_passant && board.ep_square() == Some(to) {
            moves.push(Move::en_passant(from, to));
        }
    }
}

fn castle_moves(board: &Board, rules: &Rules, moves: &mut Vec<Move>) {
    use crate::board::CastlingRights;
    use crate::types::Piece;

    if !rules.castling {
        return;
    }

    let us = board.side_to_move();
    let them = !us;
    let rank = us.back_rank();
    let king_home = Square::at(4, rank);

    if board.piece_at(king_home) != Some(Piece::new(us, PieceKind::King)) {
        return;
    }
    // The king may not castle out of check.
    if is_square_attacked(board, king_home, them, rules) {
        return;
    }

    let occupied = board.occupied();
    let rook = Piece::new(us, PieceKind::Rook);

    // Kingside: f and g empty, e-f-g unattacked, rook on h.
    if board.castling_rights().has(CastlingRights::kingside(us))
        && board.piece_at(Square::at(7, rank)) == Some(rook)
        && !occupied.contains(Square::at(5, rank))
        && !occupied.contains(Square::at(6, rank))
        && !is_square_attacked(board, Square::at(5, rank), them, rules)
        && !is_square_attacked(board, Square::at(6, rank), them, rules)
    {
        moves.push(Move::castle(king_home, Square::at(6, rank)));
    }

    // Queenside: b, c and d empty, e-d-c unattacked, rook on a. The b
    // square may be attacked; only the king's path matters.
    if board.castling_rights().has(CastlingRights::queenside(us))
        && board.piece_at(Square::at(0, rank)) == Some(rook)
        && !occupied.contains(Square::at(1, rank))
        && !occupied.contains(Square::at(2, rank))
        && !occupied.contains(Square::at(3, rank))
        && !is_square_attacked(board, Square::at(3, rank), them, rules)
        && !is_square_attacked(board, Square::at(2, rank), them, rules)
    {
        moves.push(Move::castle(king_home, Square::at(2, rank)));
    }
}
