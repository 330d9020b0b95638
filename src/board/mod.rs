//! Board state.
//!
//! [`Board`] keeps two redundant representations of the position: per-kind
//! and per-color bitboards for fast set queries, and a mailbox array for
//! square lookups, together with the side to move, castling rights, the
//! en-passant target, the half-move clock, the full-move number and an
//! incrementally maintained Zobrist hash.
//!
//! A board is immutable between moves: [`Board::apply`] is a pure copy-make
//! function producing the successor state. Undo is "keep the previous
//! value"; the search holds parents on its call stack and the game
//! controller keeps a history vector, so no unmake bookkeeping exists.

pub mod zobrist;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Bitboard, Color, Hash, Move, Piece, PieceKind, Square};
use crate::variant::{Rules, START_FEN};

/// Castling rights as a 4-bit mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const WHITE_KINGSIDE: u8 = 0b0001;
    pub const WHITE_QUEENSIDE: u8 = 0b0010;
    pub const BLACK_KINGSIDE: u8 = 0b0100;
    pub const BLACK_QUEENSIDE: u8 = 0b1000;

    #[inline]
    pub const fn none() -> Self {
        CastlingRights(0)
    }

    #[inline]
    pub const fn all() -> Self {
        CastlingRights(0b1111)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn has(self, mask: u8) -> bool {
        self.0 & mask != 0
    }

    #[inline]
    pub const fn kingside(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_KINGSIDE,
            Color::Black => Self::BLACK_KINGSIDE,
        }
    }

    #[inline]
    pub const fn queenside(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_QUEENSIDE,
            Color::Black => Self::BLACK_QUEENSIDE,
        }
    }

    /// Drop both rights of one color (its king moved).
    #[inline]
    pub const fn without_color(self, color: Color) -> Self {
        CastlingRights(self.0 & !(Self::kingside(color) | Self::queenside(color)))
    }

    /// Drop the right tied to a rook home corner, if `sq` is one. A rook
    /// moving off its corner and a rook captured on its corner both pass
    /// through here.
    #[inline]
    pub fn without_square(self, sq: Square) -> Self {
        let mask = match (sq.file(), sq.rank()) {
            (0, 0) => Self::WHITE_QUEENSIDE,
            (7, 0) => Self::WHITE_KINGSIDE,
            (0, 7) => Self::BLACK_QUEENSIDE,
            (7, 7) => Self::BLACK_KINGSIDE,
            _ => 0,
        };
        CastlingRights(self.0 & !mask)
    }
}

impl fmt::Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("-");
        }
        for (mask, ch) in [
            (Self::WHITE_KINGSIDE, 'K'),
            (Self::WHITE_QUEENSIDE, 'Q'),
            (Self::BLACK_KINGSIDE, 'k'),
            (Self::BLACK_QUEENSIDE, 'q'),
        ] {
            if self.has(mask) {
                write!(f, "{}", ch)?;
            }
        }
        Ok(())
    }
}

/// A position.
///
/// Serializes through its FEN string, which carries every field losslessly.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Board {
    mailbox: [Option<Piece>; Square::COUNT],
    by_kind: [Bitboard; PieceKind::COUNT],
    by_color: [Bitboard; Color::COUNT],
    side: Color,
    castling: CastlingRights,
    ep_square: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
    hash: Hash,
}

impl Board {
    /// The standard initial position.
    pub fn startpos() -> Board {
        Board::from_fen(START_FEN).expect("the standard start FEN is valid")
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.mailbox[sq.index()]
    }

    /// All pieces of a kind, both colors.
    #[inline]
    pub fn pieces(&self, kind: PieceKind) -> Bitboard {
        self.by_kind[kind.index()]
    }

    #[inline]
    pub fn color_bb(&self, color: Color) -> Bitboard {
        self.by_color[color.index()]
    }

    /// Pieces of one kind and color.
    #[inline]
    pub fn pieces_of(&self, color: Color, kind: PieceKind) -> Bitboard {
        self.by_kind[kind.index()] & self.by_color[color.index()]
    }

    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.by_color[0] | self.by_color[1]
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side
    }

    #[inline]
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    #[inline]
    pub fn ep_square(&self) -> Option<Square> {
        self.ep_square
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    #[inline]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    #[inline]
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// The king square of `color`. One king per color is a construction
    /// invariant: FEN loading enforces it and legal moves never capture a
    /// king.
    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        let kings = self.pieces_of(color, PieceKind::King);
        debug_assert_eq!(kings.count(), 1);
        kings.first().expect("exactly one king per color")
    }

    // ------------------------------------------------------------------
    // Move application
    // ------------------------------------------------------------------

    /// Produce the successor position. Pure copy-make: `self` is untouched.
    ///
    /// The move must be legal for this position; the search and controller
    /// only pass generator-produced moves, so this is asserted rather than
    /// re-validated. Use [`Board::try_apply`] at trust boundaries.
    pub fn apply(&self, m: Move) -> Board {
        let us = self.side;
        debug_assert_eq!(self.mailbox[m.from.index()], Some(Piece::new(us, m.kind)));

        let mut next = self.clone();

        if m.is_en_passant() {
            // The captured pawn sits behind the target square.
            let captured_rank = (m.to.rank() as i8 - us.forward()) as u8;
            next.clear_piece(Square::at(m.to.file(), captured_rank));
        } else if m.is_capture() {
            next.clear_piece(m.to);
        }

        next.clear_piece(m.from);
        next.put_piece(m.to, Piece::new(us, m.promotion.unwrap_or(m.kind)));

        if m.is_castle() {
            let rank = m.from.rank();
            let (rook_from, rook_to) = if m.to.file() == 6 {
                (Square::at(7, rank), Square::at(5, rank))
            } else {
                (Square::at(0, rank), Square::at(3, rank))
            };
            next.clear_piece(rook_from);
            next.put_piece(rook_to, Piece::new(us, PieceKind::Rook));
        }

        let mut rights = self.castling;
        if m.kind == PieceKind::King {
            rights = rights.without_color(us);
        }
        rights = rights.without_square(m.from).without_square(m.to);

        let new_ep = if m.is_double_push() {
            let passed_rank = (m.from.rank() as i8 + us.forward()) as u8;
            Some(Square::at(m.from.file(), passed_rank))
        } else {
            None
        };

        let keys = zobrist::keys();
        next.hash ^= keys.side();
        next.hash ^= keys.castling(self.castling.bits()) ^ keys.castling(rights.bits());
        if let Some(ep) = self.ep_square {
            next.hash ^= keys.ep_file(ep.file());
        }
        if let Some(ep) = new_ep {
            next.hash ^= keys.ep_file(ep.file());
        }

        next.castling = rights;
        next.ep_square = new_ep;
        next.halfmove_clock = if m.kind == PieceKind::Pawn || m.is_capture() {
            0
        } else {
            self.halfmove_clock + 1
        };
        if us == Color::Black {
            next.fullmove_number += 1;
        }
        next.side = !us;

        debug_assert_eq!(next.hash, next.compute_hash());
        next
    }

    /// Validated application: the move must be in the generator's output for
    /// this position under `rules`.
    pub fn try_apply(&self, m: Move, rules: &Rules) -> Result<Board, IllegalMove> {
        if crate::movegen::legal_moves(self, rules).contains(&m) {
            Ok(self.apply(m))
        } else {
            Err(IllegalMove(m))
        }
    }

    fn put_piece(&mut self, sq: Square, piece: Piece) {
        debug_assert!(self.mailbox[sq.index()].is_none());
        self.mailbox[sq.index()] = Some(piece);
        self.by_kind[piece.kind.index()] |= sq.bb();
        self.by_color[piece.color.index()] |= sq.bb();
        self.hash ^= zobrist::keys().piece(piece.color, piece.kind, sq);
    }

    fn clear_piece(&mut self, sq: Square) {
        let piece = self.mailbox[sq.index()].take().expect("clearing an occupied square");
        self.by_kind[piece.kind.index()] ^= sq.bb();
        self.by_color[piece.color.index()] ^= sq.bb();
        self.hash ^= zobrist::keys().piece(piece.color, piece.kind, sq);
    }

    /// Full hash recomputation. Used after FEN loading and by debug
    /// assertions against the incremental updates in [`Board::apply`].
    pub fn compute_hash(&self) -> Hash {
        let keys = zobrist::keys();
        let mut hash = 0u64;
        for sq in Square::all() {
            if let Some(piece) = self.mailbox[sq.index()] {
                hash ^= keys.piece(piece.color, piece.kind, sq);
            }
        }
        if self.side == Color::Black {
            hash ^= keys.side();
        }
        hash ^= keys.castling(self.castling.bits());
        if let Some(ep) = self.ep_square {
            hash ^= keys.ep_file(ep.file());
        }
        hash
    }

    // ------------------------------------------------------------------
    // FEN
    // ------------------------------------------------------------------

    /// Parse a FEN string. The half-move clock and full-move number default
    /// to 0 and 1 when omitted.
    pub fn from_fen(fen: &str) -> Result<Board, FenError> {
        let mut parts = fen.split_whitespace();
        let placement = parts.next().ok_or(FenError::MissingField("piece placement"))?;
        let side_part = parts.next().ok_or(FenError::MissingField("side to move"))?;
        let castling_part = parts.next().unwrap_or("-");
        let ep_part = parts.next().unwrap_or("-");
        let halfmove_part = parts.next().unwrap_or("0");
        let fullmove_part = parts.next().unwrap_or("1");

        let mut board = Board {
            mailbox: [None; Square::COUNT],
            by_kind: [Bitboard::EMPTY; PieceKind::COUNT],
            by_color: [Bitboard::EMPTY; Color::COUNT],
            side: Color::White,
            castling: CastlingRights::none(),
            ep_square: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            hash: 0,
        };

        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::BadStructure("expected 8 ranks"));
        }
        for (i, rank_text) in ranks.iter().enumerate() {
            let rank = 7 - i as u8; // FEN lists rank 8 first
            let mut file = 0u8;
            for ch in rank_text.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    file += skip as u8;
                } else {
                    if file > 7 {
                        return Err(FenError::BadStructure("rank overflows 8 files"));
                    }
                    let piece = Piece::from_char(ch).ok_or(FenError::BadPiece(ch))?;
                    let sq = Square::at(file, rank);
                    board.mailbox[sq.index()] = Some(piece);
                    board.by_kind[piece.kind.index()] |= sq.bb();
                    board.by_color[piece.color.index()] |= sq.bb();
                    file += 1;
                }
            }
            if file != 8 {
                return Err(FenError::BadStructure("rank does not cover 8 files"));
            }
        }

        board.side = match side_part {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::BadSide(other.to_string())),
        };

        let mut rights = 0u8;
        if castling_part != "-" {
            for ch in castling_part.chars() {
                rights |= match ch {
                    'K' => CastlingRights::WHITE_KINGSIDE,
                    'Q' => CastlingRights::WHITE_QUEENSIDE,
                    'k' => CastlingRights::BLACK_KINGSIDE,
                    'q' => CastlingRights::BLACK_QUEENSIDE,
                    other => return Err(FenError::BadCastling(other)),
                };
            }
        }
        board.castling = CastlingRights(rights);

        board.ep_square = if ep_part == "-" {
            None
        } else {
            Some(ep_part.parse().map_err(|_| FenError::BadEnPassant(ep_part.to_string()))?)
        };

        board.halfmove_clock = halfmove_part
            .parse()
            .map_err(|_| FenError::BadClock(halfmove_part.to_string()))?;
        board.fullmove_number = fullmove_part
            .parse()
            .map_err(|_| FenError::BadClock(fullmove_part.to_string()))?;

        for color in [Color::White, Color::Black] {
            let kings = board.pieces_of(color, PieceKind::King).count();
            if kings != 1 {
                return Err(FenError::KingCount { color, count: kings });
            }
        }

        board.hash = board.compute_hash();
        Ok(board)
    }

    /// Render the position as a FEN string. `from_fen` of the result yields
    /// an equal board; this is the lossless round trip the save format relies on.
    pub fn to_fen(&self) -> String {
        let mut fen = String::new();
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.mailbox[Square::at(file, rank).index()] {
                    Some(piece) => {
                        if empty > 0 {
                            fen.push_str(&empty.to_string());
                            empty = 0;
                        }
                        fen.push(piece.to_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push_str(&empty.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }
        let side = match self.side {
            Color::White => 'w',
            Color::Black => 'b',
        };
        let ep = match self.ep_square {
            Some(sq) => sq.to_string(),
            None => "-".to_string(),
        };
        format!(
            "{} {} {} {} {} {}",
            fen, side, self.castling, ep, self.halfmove_clock, self.fullmove_number
        )
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  +-----------------+")?;
        for rank in (0..8).rev() {
            write!(f, "{} |", rank + 1)?;
            for file in 0..8 {
                let ch = self.mailbox[Square::at(file, rank).index()]
                    .map_or('.', |p| p.to_char());
                write!(f, " {}", ch)?;
            }
            writeln!(f, " |")?;
        }
        writeln!(f, "  +-----------------+")?;
        writeln!(f, "    a b c d e f g h")?;
        write!(f, "{} to move", self.side)
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({})", self.to_fen())
    }
}

impl From<Board> for String {
    fn from(board: Board) -> String {
        board.to_fen()
    }
}

impl TryFrom<String> for Board {
    type Error = FenError;

    fn try_from(fen: String) -> Result<Board, FenError> {
        Board::from_fen(&fen)
    }
}

/// A move rejected by [`Board::try_apply`] because the generator does not
/// produce it for the current position. Surfaced to the caller, never
/// silently corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalMove(pub Move);

impl fmt::Display for IllegalMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal move {}", self.0)
    }
}

impl std::error::Error for IllegalMove {}

/// Malformed FEN input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    MissingField(&'static str),
    BadStructure(&'static str),
    BadPiece(char),
    BadSide(String),
    BadCastling(char),
    BadEnPassant(String),
    BadClock(String),
    KingCount { color: Color, count: u32 },
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::MissingField(field) => write!(f, "FEN is missing the {} field", field),
            FenError::BadStructure(what) => write!(f, "malformed FEN board: {}", what),
            FenError::BadPiece(ch) => write!(f, "unknown piece letter `{}`", ch),
            FenError::BadSide(s) => write!(f, "bad side-to-move field `{}`", s),
            FenError::BadCastling(ch) => write!(f, "bad castling flag `{}`", ch),
            FenError::BadEnPassant(s) => write!(f, "bad en-passant square `{}`", s),
            FenError::BadClock(s) => write!(f, "bad move counter `{}`", s),
            FenError::KingCount { color, count } => {
                write!(f, "{} has {} kings, expected exactly 1", color, count)
            }
        }
    }
}

impl std::error::Error for FenError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Move;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    #[test]
    fn test_startpos_layout() {
        let board = Board::startpos();
        assert_eq!(board.side_to_move(), Color::White);
        assert_eq!(board.pieces(PieceKind::Pawn).count(), 16);
        assert_eq!(board.pieces_of(Color::White, PieceKind::Rook).count(), 2);
        assert_eq!(board.king_square(Color::White), sq("e1"));
        assert_eq!(board.king_square(Color::Black), sq("e8"));
        assert_eq!(board.castling_rights(), CastlingRights::all());
        assert_eq!(board.ep_square(), None);
    }

    #[test]
    fn test_fen_round_trip() {
        let fens = [
            START_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 3 17",
            "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2",
        ];
        for fen in fens {
            let board = Board::from_fen(fen).unwrap();
            assert_eq!(board.to_fen(), fen);
        }
    }

    #[test]
    fn test_fen_rejects_garbage() {
        assert!(Board::from_fen("").is_err());
        assert!(Board::from_fen("8/8/8/8/8/8/8/8 w - - 0 1").is_err()); // no kings
        assert!(Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1").is_err());
        assert!(Board::from_fen("rnbqkbnr/ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_err());
    }

    #[test]
    fn test_apply_is_pure() {
        let board = Board::startpos();
        let before = board.clone();
        let _ = board.apply(Move::double_push(sq("e2"), sq("e4")));
        assert_eq!(board, before);
    }

    #[test]
    fn test_double_push_sets_ep_target() {
        let board = Board::startpos();
        let next = board.apply(Move::double_push(sq("e2"), sq("e4")));
        assert_eq!(next.ep_square(), Some(sq("e3")));
        assert_eq!(next.side_to_move(), Color::Black);
        assert_eq!(next.halfmove_clock(), 0);
        // And it clears again on the next non-double-push move.
        let after = next.apply(Move::quiet(sq("g8"), sq("f6"), PieceKind::Knight));
        assert_eq!(after.ep_square(), None);
        assert_eq!(after.halfmove_clock(), 1);
        assert_eq!(after.fullmove_number(), 2);
    }

    #[test]
    fn test_en_passant_capture_removes_pawn() {
        let board = Board::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2").unwrap();
        let next = board.apply(Move::en_passant(sq("e5"), sq("d6")));
        assert_eq!(next.piece_at(sq("d5")), None);
        assert_eq!(
            next.piece_at(sq("d6")),
            Some(Piece::new(Color::White, PieceKind::Pawn))
        );
        assert_eq!(next.pieces_of(Color::Black, PieceKind::Pawn).count(), 0);
    }

    #[test]
    fn test_castling_moves_rook_and_clears_rights() {
        let board =
            Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let next = board.apply(Move::castle(sq("e1"), sq("g1")));
        assert_eq!(
            next.piece_at(sq("f1")),
            Some(Piece::new(Color::White, PieceKind::Rook))
        );
        assert_eq!(next.piece_at(sq("h1")), None);
        assert!(!next.castling_rights().has(CastlingRights::WHITE_KINGSIDE));
        assert!(!next.castling_rights().has(CastlingRights::WHITE_QUEENSIDE));
        assert!(next.castling_rights().has(CastlingRights::BLACK_KINGSIDE));
    }

    #[test]
    fn test_rook_capture_revokes_enemy_right() {
        let board =
            Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let next = board.apply(Move::capture(sq("a1"), sq("a8"), PieceKind::Rook));
        assert!(!next.castling_rights().has(CastlingRights::BLACK_QUEENSIDE));
        assert!(!next.castling_rights().has(CastlingRights::WHITE_QUEENSIDE));
        assert!(next.castling_rights().has(CastlingRights::BLACK_KINGSIDE));
    }

    #[test]
    fn test_promotion_replaces_pawn() {
        let board = Board::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let next = board.apply(Move::promotion(sq("a7"), sq("a8"), PieceKind::Queen, false));
        assert_eq!(
            next.piece_at(sq("a8")),
            Some(Piece::new(Color::White, PieceKind::Queen))
        );
        assert_eq!(next.pieces_of(Color::White, PieceKind::Pawn).count(), 0);
    }

    #[test]
    fn test_incremental_hash_matches_recomputation() {
        let board = Board::startpos();
        let next = board
            .apply(Move::double_push(sq("e2"), sq("e4")))
            .apply(Move::quiet(sq("b8"), sq("c6"), PieceKind::Knight))
            .apply(Move::quiet(sq("g1"), sq("f3"), PieceKind::Knight));
        assert_eq!(next.hash(), next.compute_hash());
        assert_ne!(next.hash(), board.hash());
    }

    #[test]
    fn test_serde_round_trip() {
        let board =
            Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 7 21").unwrap();
        let json = serde_json::to_string(&board).unwrap();
        let back: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(back, board);
        assert_eq!(back.halfmove_clock(), 7);
        assert_eq!(back.fullmove_number(), 21);
    }
}
