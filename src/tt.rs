//! Shared transposition table.
//!
//! Bucketed clusters of four 16-byte entries, indexed by the low bits of the
//! Zobrist key with the high bits stored as a verification fragment. Entries
//! are packed into two `AtomicU64` words per slot and read/written with plain
//! atomic loads/stores, following the same lock-free XOR-free pattern as
//! [`crate::pawn_hash::PawnHashTable`]: a torn or racing write is caught by
//! comparing the stored key fragment against the probing key rather than by
//! taking a lock. A generation counter bumped once per search ages out stale
//! entries so that a "benign" collision from an in-flight write is simply
//! treated as a miss by the caller (the position's move is re-validated with
//! `pseudo_legal` before use, per the error-handling policy).
//!
//! Mate scores are stored root-independent (shifted by the searching ply) so
//! that a mate distance discovered deep in one search is still meaningful
//! when retrieved from a different ply in a later probe.

use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::board::Move;

/// Scores at or beyond this magnitude are mate scores and get the
/// root-independent ply shift applied on store/retrieve.
const MATE_THRESHOLD: i32 = 28_000;

/// Bound type recorded for a transposition table entry.
///
/// `None` marks an empty/unwritten slot; it is never produced by a
/// successful [`TranspositionTable::probe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BoundType {
    None = 0,
    Exact = 1,
    LowerBound = 2,
    UpperBound = 3,
}

impl BoundType {
    const fn from_u8(v: u8) -> Self {
        match v {
            1 => BoundType::Exact,
            2 => BoundType::LowerBound,
            3 => BoundType::UpperBound,
            _ => BoundType::None,
        }
    }
}

/// Perturb a position key for a singular-extension sub-search that excludes
/// `excluded_move`: XORing in bits derived from the excluded move steers the
/// sub-search to a different cluster/fragment than the node it was spawned
/// from, so its probe and store can't cut off or overwrite the parent's own
/// TT entry for the same position.
fn excluded_key(hash: u64, excluded_move: Move) -> u64 {
    if excluded_move == Move::null() {
        hash
    } else {
        hash ^ (u64::from(excluded_move.as_u16()) << 32)
    }
}

/// Adjust a mate score for storage: shifts mate distance to be root-independent.
fn mate_score_to_tt(score: i32, ply: usize) -> i32 {
    let ply = ply as i32;
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

/// Reverse of [`mate_score_to_tt`]: converts a root-independent stored mate
/// score back into one relative to the current search ply.
fn mate_score_from_tt(score: i32, ply: usize) -> i32 {
    let ply = ply as i32;
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

/// A decoded, consistent view of one transposition table entry.
#[derive(Clone, Copy, Debug)]
pub struct Entry {
    depth: u32,
    score: i32,
    bound_type: BoundType,
    best_move: Option<Move>,
    static_eval: i32,
    node_tag: u16,
}

impl Entry {
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[must_use]
    pub fn score(&self) -> i32 {
        self.score
    }

    #[must_use]
    pub fn bound_type(&self) -> BoundType {
        self.bound_type
    }

    #[must_use]
    pub fn best_move(&self) -> Option<Move> {
        self.best_move
    }

    #[must_use]
    pub fn static_eval(&self) -> i32 {
        self.static_eval
    }

    /// Truncated subtree node count recorded when this entry was stored, a
    /// coarse hint of how much search effort backs the stored value.
    #[must_use]
    pub fn node_tag(&self) -> u16 {
        self.node_tag
    }
}

/// One 16-byte slot: two naturally-aligned atomic words.
///
/// word0: key fragment (32) | best move (16) | depth (16)
/// word1: bound (8) | generation (8) | node tag (16) | value (16) | static eval (16)
///
/// The node tag records the low 16 bits of the subtree node count observed
/// at store time (see [`TranspositionTable::store_at_ply`]) — a cheap,
/// always-populated hint of how much work backs the stored value.
#[repr(C)]
struct Slot {
    word0: AtomicU64,
    word1: AtomicU64,
}

impl Slot {
    fn new() -> Self {
        Slot {
            word0: AtomicU64::new(0),
            word1: AtomicU64::new(0),
        }
    }

    fn is_empty(&self) -> bool {
        self.word1.load(Ordering::Relaxed) & 0xff == BoundType::None as u64
    }

    fn read_raw(&self) -> (u64, u64) {
        (
            self.word0.load(Ordering::Relaxed),
            self.word1.load(Ordering::Relaxed),
        )
    }

    fn fragment(word0: u64) -> u32 {
        word0 as u32
    }

    fn depth(word0: u64) -> u32 {
        u32::from((word0 >> 48) as u16)
    }

    fn best_move(word0: u64) -> Option<Move> {
        let bits = (word0 >> 32) as u16;
        if bits == 0 {
            None
        } else {
            Some(Move::from_u16(bits))
        }
    }

    fn bound_type(word1: u64) -> BoundType {
        BoundType::from_u8((word1 & 0xff) as u8)
    }

    fn generation(word1: u64) -> u16 {
        ((word1 >> 8) & 0xff) as u16
    }

    fn node_tag(word1: u64) -> u16 {
        ((word1 >> 16) & 0xffff) as u16
    }

    fn value(word1: u64) -> i32 {
        i32::from(((word1 >> 32) & 0xffff) as u16 as i16)
    }

    fn static_eval(word1: u64) -> i32 {
        i32::from(((word1 >> 48) & 0xffff) as u16 as i16)
    }

    #[allow(clippy::too_many_arguments)]
    fn store(
        &self,
        fragment: u32,
        best_move: Option<Move>,
        depth: u32,
        bound: BoundType,
        generation: u16,
        value: i32,
        static_eval: i32,
        node_tag: u16,
    ) {
        let move_bits = best_move.map_or(0u16, Move::as_u16);
        let depth_bits = depth.min(u32::from(u16::MAX)) as u16;
        let word0 = u64::from(fragment)
            | (u64::from(move_bits) << 32)
            | (u64::from(depth_bits) << 48);

        let value_bits = value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16 as u16;
        let eval_bits =
            static_eval.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16 as u16;
        let word1 = u64::from(bound as u8)
            | (u64::from(generation) << 8)
            | (u64::from(node_tag) << 16)
            | (u64::from(value_bits) << 32)
            | (u64::from(eval_bits) << 48);

        // Write the data word before the key word; a reader validates the
        // fragment last so a concurrent writer can only ever be observed as
        // a fragment mismatch (treated as a miss), never as mixed fields
        // from two different entries.
        self.word1.store(word1, Ordering::Relaxed);
        self.word0.store(word0, Ordering::Relaxed);
    }
}

/// A cluster of four entries sharing the same index.
#[repr(C)]
struct Cluster {
    slots: [Slot; 4],
}

impl Cluster {
    fn new() -> Self {
        Cluster {
            slots: [Slot::new(), Slot::new(), Slot::new(), Slot::new()],
        }
    }
}

/// Shared, concurrently-accessible transposition table.
///
/// Sized as a power-of-two number of 4-entry clusters so `index()` can mask
/// instead of dividing.
pub struct TranspositionTable {
    clusters: Vec<Cluster>,
    mask: usize,
}

// Safety: all mutation goes through `AtomicU64` operations.
unsafe impl Send for TranspositionTable {}
unsafe impl Sync for TranspositionTable {}

impl TranspositionTable {
    /// Build a table sized to approximately `size_mb` megabytes.
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        let cluster_size = mem::size_of::<Cluster>();
        let mut num_clusters = (size_mb.max(1) * 1024 * 1024) / cluster_size;
        num_clusters = num_clusters.next_power_of_two() / 2;
        if num_clusters == 0 {
            num_clusters = 1024;
        }

        let mut clusters = Vec::with_capacity(num_clusters);
        for _ in 0..num_clusters {
            clusters.push(Cluster::new());
        }

        TranspositionTable {
            clusters,
            mask: num_clusters - 1,
        }
    }

    #[inline]
    fn index(&self, hash: u64) -> usize {
        (hash as usize) & self.mask
    }

    #[inline]
    fn fragment(hash: u64) -> u32 {
        (hash >> 32) as u32
    }

    /// Touch the cluster backing `hash` to bring it into cache ahead of use.
    pub fn prefetch(&self, hash: u64) {
        let cluster = &self.clusters[self.index(hash)];
        for slot in &cluster.slots {
            std::hint::black_box(slot.word0.load(Ordering::Relaxed));
        }
    }

    /// Probe for `hash`, returning a consistent decoded entry with the
    /// stored score already converted from root-independent mate distance
    /// to one relative to `ply`.
    #[must_use]
    pub fn probe(&self, hash: u64) -> Option<Entry> {
        let cluster = &self.clusters[self.index(hash)];
        let fragment = Self::fragment(hash);
        for slot in &cluster.slots {
            let (word0, word1) = slot.read_raw();
            if Slot::bound_type(word1) == BoundType::None {
                continue;
            }
            if Slot::fragment(word0) == fragment {
                return Some(Entry {
                    depth: Slot::depth(word0),
                    score: Slot::value(word1),
                    bound_type: Slot::bound_type(word1),
                    best_move: Slot::best_move(word0),
                    static_eval: Slot::static_eval(word1),
                    node_tag: Slot::node_tag(word1),
                });
            }
        }
        None
    }

    /// Probe adjusting the retrieved score for the given ply (mate scores
    /// are stored root-independent; see module docs).
    #[must_use]
    pub fn probe_at_ply(&self, hash: u64, ply: usize) -> Option<Entry> {
        self.probe(hash).map(|mut e| {
            e.score = mate_score_from_tt(e.score, ply);
            e
        })
    }

    /// [`Self::probe_at_ply`], but for a singular-extension sub-search that
    /// excludes `excluded_move`. Probing under the perturbed key (see
    /// [`excluded_key`]) means the sub-search sees the main entry as a miss
    /// rather than a false cutoff, and its own store (via
    /// [`Self::store_at_ply_excluding`]) can't clobber it either.
    #[must_use]
    pub fn probe_at_ply_excluding(
        &self,
        hash: u64,
        ply: usize,
        excluded_move: Move,
    ) -> Option<Entry> {
        self.probe_at_ply(excluded_key(hash, excluded_move), ply)
    }

    /// Store an entry, choosing a replacement slot within the cluster when
    /// no matching or empty slot is available: prefer an existing entry for
    /// the same key, then an empty slot, then the slot with the lowest
    /// `depth*2 - age` priority (oldest and shallowest loses).
    #[allow(clippy::too_many_arguments)]
    pub fn store(
        &self,
        hash: u64,
        depth: u32,
        score: i32,
        bound: BoundType,
        best_move: Option<Move>,
        generation: u16,
    ) {
        self.store_at_ply(hash, depth, score, bound, best_move, generation, 0, 0, 0);
    }

    /// Store with explicit ply (for mate-score normalization), static eval,
    /// and `node_tag` — the truncated subtree node count at the time of this
    /// store, a coarse hint of the search effort behind the stored value.
    #[allow(clippy::too_many_arguments)]
    pub fn store_at_ply(
        &self,
        hash: u64,
        depth: u32,
        score: i32,
        bound: BoundType,
        best_move: Option<Move>,
        generation: u16,
        ply: usize,
        static_eval: i32,
        node_tag: u16,
    ) {
        let cluster = &self.clusters[self.index(hash)];
        let fragment = Self::fragment(hash);
        let stored_score = mate_score_to_tt(score, ply);

        // Same-key overwrite, preserving any existing best move when the
        // new store has none (a re-search that fails low still keeps the
        // previously known good move for ordering).
        for slot in &cluster.slots {
            let (word0, word1) = slot.read_raw();
            if Slot::bound_type(word1) != BoundType::None && Slot::fragment(word0) == fragment {
                let mv = best_move.or_else(|| Slot::best_move(word0));
                slot.store(fragment, mv, depth, bound, generation, stored_score, static_eval, node_tag);
                return;
            }
        }

        // Empty slot.
        for slot in &cluster.slots {
            if slot.is_empty() {
                slot.store(fragment, best_move, depth, bound, generation, stored_score, static_eval, node_tag);
                return;
            }
        }

        // Replace the lowest-priority occupant.
        let mut replace_idx = 0usize;
        let mut worst_priority = i32::MAX;
        for (idx, slot) in cluster.slots.iter().enumerate() {
            let (word0, word1) = slot.read_raw();
            let age = generation.wrapping_sub(Slot::generation(word1));
            let priority = (Slot::depth(word0) as i32).saturating_mul(2) - i32::from(age);
            if priority < worst_priority {
                worst_priority = priority;
                replace_idx = idx;
            }
        }
        cluster.slots[replace_idx].store(
            fragment,
            best_move,
            depth,
            bound,
            generation,
            stored_score,
            static_eval,
            node_tag,
        );
    }

    /// [`Self::store_at_ply`], but for a singular-extension sub-search that
    /// excludes `excluded_move`: stores under the perturbed key from
    /// [`excluded_key`] so the write lands in a different slot than the
    /// node the sub-search was spawned from.
    #[allow(clippy::too_many_arguments)]
    pub fn store_at_ply_excluding(
        &self,
        hash: u64,
        excluded_move: Move,
        depth: u32,
        score: i32,
        bound: BoundType,
        best_move: Option<Move>,
        generation: u16,
        ply: usize,
        static_eval: i32,
        node_tag: u16,
    ) {
        self.store_at_ply(
            excluded_key(hash, excluded_move),
            depth,
            score,
            bound,
            best_move,
            generation,
            ply,
            static_eval,
            node_tag,
        );
    }

    /// Fraction of clusters with at least one occupied slot, in per-mille
    /// (reported by the `hashfull` UCI info field).
    #[must_use]
    pub fn hashfull_per_mille(&self) -> u32 {
        let sample = self.clusters.len().min(1000).max(1);
        let mut occupied = 0u64;
        for cluster in self.clusters.iter().take(sample) {
            for slot in &cluster.slots {
                if !slot.is_empty() {
                    occupied += 1;
                }
            }
        }
        let total_slots = (sample * 4) as u64;
        ((occupied * 1000) / total_slots) as u32
    }

    /// Clear every slot and reset ages (`ucinewgame`).
    pub fn clear(&self) {
        for cluster in &self.clusters {
            for slot in &cluster.slots {
                slot.word1.store(0, Ordering::Relaxed);
                slot.word0.store(0, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Square;

    fn mv() -> Move {
        Move::quiet(Square::new(12), Square::new(28))
    }

    #[test]
    fn store_and_probe_roundtrip() {
        let tt = TranspositionTable::new(1);
        let hash = 0x1234_5678_9abc_def0u64;
        tt.store(hash, 6, 123, BoundType::Exact, Some(mv()), 1);

        let entry = tt.probe(hash).expect("entry should be present");
        assert_eq!(entry.depth(), 6);
        assert_eq!(entry.score(), 123);
        assert_eq!(entry.bound_type(), BoundType::Exact);
        assert_eq!(entry.best_move(), Some(mv()));
    }

    #[test]
    fn probe_miss_on_different_key() {
        let tt = TranspositionTable::new(1);
        tt.store(0x1111_1111_1111_1111, 4, 10, BoundType::Exact, Some(mv()), 1);
        assert!(tt.probe(0x2222_2222_2222_2222).is_none());
    }

    #[test]
    fn mate_score_is_root_independent() {
        let tt = TranspositionTable::new(1);
        let hash = 0xaaaa_bbbb_cccc_ddddu64;
        // Mate found 3 ply deep in this search.
        tt.store_at_ply(hash, 10, MATE_THRESHOLD + 2, BoundType::Exact, Some(mv()), 1, 3, 0, 0);

        // Retrieved 5 ply deep in a later search: distance shrinks accordingly.
        let entry = tt.probe_at_ply(hash, 5).unwrap();
        assert_eq!(entry.score(), MATE_THRESHOLD + 2 - 5);
    }

    #[test]
    fn node_tag_round_trips() {
        let tt = TranspositionTable::new(1);
        let hash = 0x5555_6666_7777_8888u64;
        tt.store_at_ply(hash, 6, 10, BoundType::Exact, Some(mv()), 1, 0, 0, 42);
        let entry = tt.probe(hash).unwrap();
        assert_eq!(entry.node_tag(), 42);
    }

    #[test]
    fn hashfull_starts_at_zero() {
        let tt = TranspositionTable::new(1);
        assert_eq!(tt.hashfull_per_mille(), 0);
    }

    #[test]
    fn clear_empties_table() {
        let tt = TranspositionTable::new(1);
        let hash = 0x1234;
        tt.store(hash, 4, 10, BoundType::Exact, Some(mv()), 1);
        assert!(tt.probe(hash).is_some());
        tt.clear();
        assert!(tt.probe(hash).is_none());
    }
}
