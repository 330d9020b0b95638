//! Attack computation.
//!
//! Leaper attacks come from per-kind lookup tables compiled out of the
//! variant's delta lists. Sliding attacks walk rays until the first blocker.
//! Pawn attack tables are fixed (pawn movement is not configurable) and
//! built once into a process-wide table.
//!
//! The attacked-square query works backwards from the target: reverse-leap
//! tables answer "which squares jump onto this one", and a walk outward
//! along each compass direction finds the nearest blocker, which attacks the
//! target iff its own ray set contains the direction pointing back. Built
//! this way the query stays exact even for asymmetric movement overrides.

use std::sync::OnceLock;

use crate::board::Board;
use crate::types::{Bitboard, Color, PieceKind, Square};
use crate::variant::{Rules, QUEEN_DIRS};

/// Build a 64-entry attack table from a (file, rank) delta list.
pub fn leap_table(deltas: &[(i8, i8)]) -> [Bitboard; Square::COUNT] {
    let mut table = [Bitboard::EMPTY; Square::COUNT];
    for sq in Square::all() {
        for &(df, dr) in deltas {
            if let Some(to) = sq.offset(df, dr) {
                table[sq.index()] |= to.bb();
            }
        }
    }
    table
}

struct PawnTables {
    /// Capture targets of a pawn of [color] standing on [square].
    attacks: [[Bitboard; Square::COUNT]; Color::COUNT],
}

static PAWN_TABLES: OnceLock<PawnTables> = OnceLock::new();

fn pawn_tables() -> &'static PawnTables {
    PAWN_TABLES.get_or_init(|| {
        let mut attacks = [[Bitboard::EMPTY; Square::COUNT]; Color::COUNT];
        for color in [Color::White, Color::Black] {
            for sq in Square::all() {
                for df in [-1i8, 1] {
                    if let Some(to) = sq.offset(df, color.forward()) {
                        attacks[color.index()][sq.index()] |= to.bb();
                    }
                }
            }
        }
        PawnTables { attacks }
    })
}

/// Capture targets of a pawn of `color` on `sq`.
#[inline]
pub fn pawn_attacks(color: Color, sq: Square) -> Bitboard {
    pawn_tables().attacks[color.index()][sq.index()]
}

/// Sliding attacks from `sq` along `dirs`, stopping at (and including) the
/// first occupied square of each ray.
pub fn ray_attacks(sq: Square, dirs: &[(i8, i8)], occupied: Bitboard) -> Bitboard {
    let mut attacks = Bitboard::EMPTY;
    for &(df, dr) in dirs {
        let mut current = sq;
        while let Some(next) = current.offset(df, dr) {
            attacks |= next.bb();
            if occupied.contains(next) {
                break;
            }
            current = next;
        }
    }
    attacks
}

/// Is `sq` attacked by any piece of `by` under the given rules?
pub fn is_square_attacked(board: &Board, sq: Square, by: Color, rules: &Rules) -> bool {
    // Pawns: a pawn of `by` attacks sq iff sq's reverse pawn-attack set
    // (computed with the defender's color) contains it.
    if !(pawn_attacks(!by, sq) & board.pieces_of(by, PieceKind::Pawn)).is_empty() {
        return true;
    }

    // Leapers, via the reverse tables (exact for asymmetric overrides).
    for kind in PieceKind::ALL {
        if kind == PieceKind::Pawn {
            continue;
        }
        if !(rules.leap_attackers(kind, sq) & board.pieces_of(by, kind)).is_empty() {
            return true;
        }
    }

    // Sliders: walk outward, test the nearest blocker on each line.
    let occupied = board.occupied();
    for &(df, dr) in QUEEN_DIRS.iter() {
        let mut current = sq;
        while let Some(next) = current.offset(df, dr) {
            if occupied.contains(next) {
                if let Some(piece) = board.piece_at(next) {
                    if piece.color == by
                        && piece.kind != PieceKind::Pawn
                        && rules.ray_dirs(piece.kind).contains(&(-df, -dr))
                    {
                        return true;
                    }
                }
                break;
            }
            current = next;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    #[test]
    fn test_ray_attacks_stop_at_blockers() {
        let occupied = sq("e6").bb() | sq("b4").bb();
        let attacks = ray_attacks(sq("e4"), &[(0, 1), (-1, 0)], occupied);
        assert!(attacks.contains(sq("e5")));
        assert!(attacks.contains(sq("e6"))); // blocker included
        assert!(!attacks.contains(sq("e7"))); // beyond blocker
        assert!(attacks.contains(sq("b4")));
        assert!(!attacks.contains(sq("a4")));
    }

    #[test]
    fn test_pawn_attack_tables() {
        assert_eq!(pawn_attacks(Color::White, sq("e4")), sq("d5").bb() | sq("f5").bb());
        assert_eq!(pawn_attacks(Color::Black, sq("a5")), sq("b4").bb());
    }

    #[test]
    fn test_attacked_by_knight_and_slider() {
        let rules = Rules::standard();
        let board =
            Board::from_fen("4k3/8/8/8/2n5/8/4R3/4K3 w - - 0 1").unwrap();
        // Black knight on c4 attacks e3.
        assert!(is_square_attacked(&board, sq("e3"), Color::Black, &rules));
        // White rook on e2 attacks e8 through empty squares...
        assert!(is_square_attacked(&board, sq("e8"), Color::White, &rules));
        // ...but not f5, which no white piece reaches.
        assert!(!is_square_attacked(&board, sq("f5"), Color::White, &rules));
    }

    #[test]
    fn test_slider_attack_blocked() {
        let rules = Rules::standard();
        let board =
            Board::from_fen("4k3/8/8/4p3/8/8/4R3/4K3 w - - 0 1").unwrap();
        // The black pawn on e5 blocks the rook's ray beyond it.
        assert!(is_square_attacked(&board, sq("e5"), Color::White, &rules));
        assert!(!is_square_attacked(&board, sq("e8"), Color::White, &rules));
    }

    #[test]
    fn test_pawn_attacks_directional() {
        let rules = Rules::standard();
        let board = Board::from_fen("4k3/8/8/8/3p4/8/8/4K3 w - - 0 1").unwrap();
        // Black pawn on d4 attacks c3 and e3, not c5/e5.
        assert!(is_square_attacked(&board, sq("c3"), Color::Black, &rules));
        assert!(is_square_attacked(&board, sq("e3"), Color::Black, &rules));
        assert!(!is_square_attacked(&board, sq("c5"), Color::Black, &rules));
    }
}
