//! Transposition table.
//!
//! Caches search results keyed by position fingerprint so transpositions
//! are not re-searched. Entries pack into a single `AtomicU64`, which makes
//! every read and write atomic: a reader can observe a stale entry but
//! never a torn one, and no locking is needed anywhere. Replacement is
//! depth-preferred with generation-based aging.
//!
//! Mate scores are stored relative to the probing node (`Score::to_tt` /
//! `Score::from_tt`), otherwise a mate found at one ply would read as the
//! wrong distance at another.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::types::{Depth, Hash, Score};

/// What the stored score proves about the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Bound {
    /// Empty slot.
    None = 0,
    /// Exact score (the node completed inside the window).
    Exact = 1,
    /// Lower bound (fail high, real score >= stored).
    Lower = 2,
    /// Upper bound (fail low, real score <= stored).
    Upper = 3,
}

impl From<u8> for Bound {
    fn from(v: u8) -> Self {
        match v & 0x03 {
            1 => Bound::Exact,
            2 => Bound::Lower,
            3 => Bound::Upper,
            _ => Bound::None,
        }
    }
}

/// One table entry, packed into 64 bits:
/// key (16) | move action (16) | score (16) | depth (8) | bound+generation (8).
#[derive(Debug, Clone, Copy)]
pub struct TtEntry {
    key: u16,
    action: u16,
    score: i16,
    depth: i8,
    bound_gen: u8,
}

impl TtEntry {
    fn new(hash: Hash, action: u16, score: Score, depth: Depth, bound: Bound, generation: u8) -> Self {
        TtEntry {
            key: (hash >> 48) as u16,
            action,
            score: score.raw() as i16,
            depth: depth.raw() as i8,
            bound_gen: bound as u8 | ((generation & 0x3F) << 2),
        }
    }

    #[inline]
    fn pack(self) -> u64 {
        ((self.key as u64) << 48)
            | ((self.action as u64) << 32)
            | (((self.score as u16) as u64) << 16)
            | (((self.depth as u8) as u64) << 8)
            | (self.bound_gen as u64)
    }

    #[inline]
    fn unpack(raw: u64) -> Self {
        TtEntry {
            key: (raw >> 48) as u16,
            action: (raw >> 32) as u16,
            score: (raw >> 16) as i16,
            depth: (raw >> 8) as i8,
            bound_gen: raw as u8,
        }
    }

    #[inline]
    fn matches(self, hash: Hash) -> bool {
        self.key == (hash >> 48) as u16
    }

    /// The stored best move's from/to/promotion encoding, 0 when none.
    /// Callers match it back against generated legal moves; flags are not
    /// reconstructed from the table.
    #[inline]
    pub fn action(self) -> u16 {
        self.action
    }

    /// Stored score, still relative to the storing node; rebase with
    /// [`Score::from_tt`].
    #[inline]
    pub fn score(self) -> Score {
        Score::cp(self.score as i32)
    }

    #[inline]
    pub fn depth(self) -> Depth {
        Depth::new(self.depth as i32)
    }

    #[inline]
    pub fn bound(self) -> Bound {
        Bound::from(self.bound_gen)
    }

    #[inline]
    pub fn generation(self) -> u8 {
        self.bound_gen >> 2
    }

    #[inline]
    fn is_empty(self) -> bool {
        self.bound() == Bound::None
    }
}

/// Lock-free transposition table over packed atomic entries.
pub struct TranspositionTable {
    entries: Vec<AtomicU64>,
    generation: AtomicU8,
}

impl TranspositionTable {
    /// Create a table of roughly `size_mb` megabytes (rounded down to a
    /// power of two of 8-byte entries).
    pub fn new(size_mb: usize) -> Self {
        let bytes = size_mb.max(1) * 1024 * 1024;
        let entries = (bytes / 8).next_power_of_two() / 2;
        let entries = entries.max(1024);
        TranspositionTable {
            entries: (0..entries).map(|_| AtomicU64::new(0)).collect(),
            generation: AtomicU8::new(0),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advance the generation. Called once per search; older entries become
    /// preferred replacement victims.
    pub fn new_search(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    #[inline]
    fn index(&self, hash: Hash) -> usize {
        hash as usize & (self.entries.len() - 1)
    }

    /// Look up the entry for a position, if one survives.
    #[inline]
    pub fn probe(&self, hash: Hash) -> Option<TtEntry> {
        let raw = self.entries[self.index(hash)].load(Ordering::Relaxed);
        if raw == 0 {
            return None;
        }
        let entry = TtEntry::unpack(raw);
        if entry.matches(hash) && !entry.is_empty() {
            Some(entry)
        } else {
            None
        }
    }

    /// Store a result. Replaces empty slots, entries from older searches,
    /// and entries searched no deeper than this one.
    pub fn store(&self, hash: Hash, action: u16, score: Score, depth: Depth, bound: Bound) {
        let idx = self.index(hash);
        let existing = TtEntry::unpack(self.entries[idx].load(Ordering::Relaxed));
        let generation = self.generation();

        let replace = existing.is_empty()
            || existing.generation() != generation
            || depth.raw() >= existing.depth as i32;

        if replace {
            let entry = TtEntry::new(hash, action, score, depth, bound, generation);
            self.entries[idx].store(entry.pack(), Ordering::Relaxed);
        }
    }

    /// Wipe the table.
    pub fn clear(&self) {
        for entry in &self.entries {
            entry.store(0, Ordering::Relaxed);
        }
        self.generation.store(0, Ordering::Relaxed);
    }

    /// Occupancy of the current generation in permill, sampled over the
    /// first thousand entries.
    pub fn hashfull(&self) -> u32 {
        let generation = self.generation();
        let sample = self.entries.len().min(1000);
        let used = self.entries[..sample]
            .iter()
            .filter(|slot| {
                let entry = TtEntry::unpack(slot.load(Ordering::Relaxed));
                !entry.is_empty() && entry.generation() == generation
            })
            .count();
        (used * 1000 / sample) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_probe() {
        let tt = TranspositionTable::new(1);
        let hash: Hash = 0x1234_5678_9ABC_DEF0;

        assert!(tt.probe(hash).is_none());

        tt.store(hash, 77, Score::cp(150), Depth::new(6), Bound::Exact);
        let entry = tt.probe(hash).expect("stored entry");
        assert_eq!(entry.action(), 77);
        assert_eq!(entry.score().raw(), 150);
        assert_eq!(entry.depth().raw(), 6);
        assert_eq!(entry.bound(), Bound::Exact);
    }

    #[test]
    fn test_pack_unpack_round_trip() {
        let entry = TtEntry::new(
            0xABCD_1234_5678_9000,
            0x0FFF,
            Score::cp(-321),
            Depth::new(11),
            Bound::Upper,
            9,
        );
        let back = TtEntry::unpack(entry.pack());
        assert_eq!(back.key, entry.key);
        assert_eq!(back.action(), entry.action());
        assert_eq!(back.score(), entry.score());
        assert_eq!(back.depth(), entry.depth());
        assert_eq!(back.bound(), entry.bound());
        assert_eq!(back.generation(), entry.generation());
    }

    #[test]
    fn test_shallower_results_do_not_replace() {
        let tt = TranspositionTable::new(1);
        let hash: Hash = 42;
        tt.store(hash, 1, Score::cp(10), Depth::new(8), Bound::Exact);
        tt.store(hash, 2, Score::cp(99), Depth::new(3), Bound::Exact);
        assert_eq!(tt.probe(hash).unwrap().action(), 1);
    }

    #[test]
    fn test_negative_scores_survive_packing() {
        let tt = TranspositionTable::new(1);
        tt.store(7, 0, Score::mated_in(4).to_tt(0), Depth::new(2), Bound::Lower);
        let entry = tt.probe(7).unwrap();
        assert_eq!(entry.score().from_tt(0), Score::mated_in(4));
    }

    #[test]
    fn test_clear() {
        let tt = TranspositionTable::new(1);
        tt.store(13, 5, Score::cp(1), Depth::new(1), Bound::Exact);
        tt.clear();
        assert!(tt.probe(13).is_none());
    }
}
