//! Zobrist hashing.
//!
//! Every position maps to a 64-bit fingerprint built by XOR-ing one random
//! key per (color, kind, square) occupancy plus keys for the side to move,
//! the castling-rights mask and the en-passant file. The key tables are
//! generated once from a fixed seed so hashes are reproducible across runs,
//! which keeps transposition-table tests and saved games stable.

use std::sync::OnceLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{Color, Hash, PieceKind, Square};

const ZOBRIST_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// The full key table.
pub struct ZobristKeys {
    pieces: [[[Hash; Square::COUNT]; PieceKind::COUNT]; Color::COUNT],
    side_to_move: Hash,
    castling: [Hash; 16],
    ep_file: [Hash; 8],
}

static KEYS: OnceLock<ZobristKeys> = OnceLock::new();

/// Global key table, generated on first use.
pub fn keys() -> &'static ZobristKeys {
    KEYS.get_or_init(ZobristKeys::generate)
}

impl ZobristKeys {
    fn generate() -> Self {
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
        let mut pieces = [[[0u64; Square::COUNT]; PieceKind::COUNT]; Color::COUNT];
        for color in pieces.iter_mut() {
            for kind in color.iter_mut() {
                for key in kind.iter_mut() {
                    *key = rng.gen();
                }
            }
        }
        let side_to_move = rng.gen();
        let mut castling = [0u64; 16];
        for key in castling.iter_mut() {
            *key = rng.gen();
        }
        let mut ep_file = [0u64; 8];
        for key in ep_file.iter_mut() {
            *key = rng.gen();
        }
        ZobristKeys { pieces, side_to_move, castling, ep_file }
    }

    #[inline]
    pub fn piece(&self, color: Color, kind: PieceKind, sq: Square) -> Hash {
        self.pieces[color.index()][kind.index()][sq.index()]
    }

    /// XOR-ed in when black is to move.
    #[inline]
    pub fn side(&self) -> Hash {
        self.side_to_move
    }

    #[inline]
    pub fn castling(&self, rights_bits: u8) -> Hash {
        self.castling[(rights_bits & 0x0F) as usize]
    }

    #[inline]
    pub fn ep_file(&self, file: u8) -> Hash {
        self.ep_file[file as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_deterministic() {
        let a = ZobristKeys::generate();
        let b = ZobristKeys::generate();
        assert_eq!(
            a.piece(Color::White, PieceKind::Pawn, Square::new(12)),
            b.piece(Color::White, PieceKind::Pawn, Square::new(12))
        );
        assert_eq!(a.side(), b.side());
    }

    #[test]
    fn test_keys_are_distinct() {
        let keys = keys();
        let a = keys.piece(Color::White, PieceKind::Knight, Square::new(0));
        let b = keys.piece(Color::Black, PieceKind::Knight, Square::new(0));
        assert_ne!(a, b);
        assert_ne!(keys.castling(0b0001), keys.castling(0b1000));
    }
}
