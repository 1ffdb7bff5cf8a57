//! Move-ordering heuristic tables: killers, history, counter/follow-up moves.
//!
//! Each table is a plain fixed-size array wrapped so the search can treat it
//! as an opaque scoring oracle. None of these take a lock: per-thread search
//! state owns its own copy, so races only happen across workers sharing a
//! position, and the usual benign-race tolerance for heuristic tables applies.

use crate::board::{Board, Move, Piece, EMPTY_MOVE, MAX_PLY};

/// Two (plus one reserve) killer-move slots per ply: quiet moves that
/// previously caused a beta cutoff at the same ply in a sibling node.
pub struct KillerTable {
    killers: Box<[[Move; 3]; MAX_PLY]>,
}

impl KillerTable {
    #[must_use]
    pub fn new() -> Self {
        KillerTable {
            killers: Box::new([[EMPTY_MOVE; 3]; MAX_PLY]),
        }
    }

    #[must_use]
    pub fn primary(&self, ply: usize) -> Move {
        self.killers.get(ply).map_or(EMPTY_MOVE, |k| k[0])
    }

    #[must_use]
    pub fn secondary(&self, ply: usize) -> Move {
        self.killers.get(ply).map_or(EMPTY_MOVE, |k| k[1])
    }

    #[must_use]
    pub fn tertiary(&self, ply: usize) -> Move {
        self.killers.get(ply).map_or(EMPTY_MOVE, |k| k[2])
    }

    /// Record a new killer at `ply`, shifting the existing ones down.
    /// A move already stored as the primary killer is not duplicated.
    pub fn update(&mut self, ply: usize, mv: Move) {
        let Some(slots) = self.killers.get_mut(ply) else {
            return;
        };
        if slots[0] == mv {
            return;
        }
        slots[2] = slots[1];
        slots[1] = slots[0];
        slots[0] = mv;
    }

    pub fn reset(&mut self) {
        for slots in self.killers.iter_mut() {
            *slots = [EMPTY_MOVE; 3];
        }
    }
}

impl Default for KillerTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Butterfly history: quiet-move score indexed by (from, to), gravity-free
/// depth-cubed bonus/malus on cutoff/non-cutoff as is conventional.
pub struct HistoryTable {
    scores: Box<[i32; 4096]>,
}

impl HistoryTable {
    #[must_use]
    pub fn new() -> Self {
        HistoryTable {
            scores: Box::new([0; 4096]),
        }
    }

    #[inline]
    fn index(mv: &Move) -> usize {
        mv.from().index().as_usize() * 64 + mv.to().index().as_usize()
    }

    #[must_use]
    pub fn score(&self, mv: &Move) -> i32 {
        self.scores[Self::index(mv)]
    }

    /// Reward a quiet move that caused a beta cutoff. `extra` is an
    /// additional flat bonus on top of the depth-cubed base (0 for none).
    pub fn update(&mut self, mv: &Move, depth: u32, extra: i32) {
        let idx = Self::index(mv);
        let bonus = (depth * depth * depth) as i32 + extra;
        self.scores[idx] = self.scores[idx].saturating_add(bonus);
    }

    /// Penalize a quiet move that was tried but did not cause the cutoff.
    pub fn penalize(&mut self, mv: &Move, depth: u32) {
        let idx = Self::index(mv);
        let malus = (depth * depth * depth) as i32;
        self.scores[idx] = self.scores[idx].saturating_sub(malus);
    }

    /// Halve every entry; run once per new search so stale biases fade.
    pub fn decay(&mut self) {
        for s in self.scores.iter_mut() {
            *s >>= 1;
        }
    }

    pub fn reset(&mut self) {
        *self.scores = [0; 4096];
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter-move table: the quiet move that refuted a given opponent move,
/// keyed by the opponent move's (from, to) squares.
pub struct CounterMoveTable {
    moves: Box<[[Move; 64]; 64]>,
}

impl CounterMoveTable {
    #[must_use]
    pub fn new() -> Self {
        CounterMoveTable {
            moves: Box::new([[EMPTY_MOVE; 64]; 64]),
        }
    }

    #[must_use]
    pub fn get(&self, from: usize, to: usize) -> Move {
        self.moves
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or(EMPTY_MOVE)
    }

    pub fn set(&mut self, from: usize, to: usize, mv: Move) {
        if let Some(row) = self.moves.get_mut(from) {
            if let Some(slot) = row.get_mut(to) {
                *slot = mv;
            }
        }
    }

    pub fn reset(&mut self) {
        for row in self.moves.iter_mut() {
            *row = [EMPTY_MOVE; 64];
        }
    }
}

impl Default for CounterMoveTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Follow-up/continuation history: quiet-move score conditioned on the piece
/// type and destination square of the move played two plies earlier (i.e.
/// the mover's own previous move), refining plain butterfly history with
/// positional context.
pub struct ContinuationHistory {
    // Indexed by [prev_piece][prev_to][from * 64 + to].
    scores: Box<[[[i32; 4096]; 64]; 6]>,
}

impl ContinuationHistory {
    #[must_use]
    pub fn new() -> Self {
        ContinuationHistory {
            scores: Box::new([[[0; 4096]; 64]; 6]),
        }
    }

    #[must_use]
    pub fn score(&self, prev_piece: Piece, prev_to: usize, mv: &Move) -> i32 {
        let idx = mv.from().index().as_usize() * 64 + mv.to().index().as_usize();
        self.scores[prev_piece.index()][prev_to.min(63)][idx]
    }

    pub fn update(&mut self, prev_piece: Piece, prev_to: usize, mv: &Move, depth: u32) {
        let idx = mv.from().index().as_usize() * 64 + mv.to().index().as_usize();
        let bonus = (depth * depth) as i32;
        let slot = &mut self.scores[prev_piece.index()][prev_to.min(63)][idx];
        *slot = slot.saturating_add(bonus);
    }

    pub fn reset(&mut self) {
        for piece_table in self.scores.iter_mut() {
            for row in piece_table.iter_mut() {
                *row = [0; 4096];
            }
        }
    }
}

impl Default for ContinuationHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Capture history: bonus/malus for a (attacker, victim) piece-type pair,
/// used to refine MVV-LVA ordering among captures with the same victim.
pub struct CaptureHistory {
    scores: Box<[[i32; 6]; 6]>,
}

impl CaptureHistory {
    #[must_use]
    pub fn new() -> Self {
        CaptureHistory {
            scores: Box::new([[0; 6]; 6]),
        }
    }

    #[must_use]
    pub fn score(&self, attacker: Piece, victim: Piece) -> i32 {
        self.scores[attacker.index()][victim.index()]
    }

    pub fn update(&mut self, attacker: Piece, victim: Piece, depth: u32) {
        let bonus = (depth * depth) as i32;
        let slot = &mut self.scores[attacker.index()][victim.index()];
        *slot = slot.saturating_add(bonus);
    }

    pub fn reset(&mut self) {
        *self.scores = [[0; 6]; 6];
    }
}

impl Default for CaptureHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// MVV-LVA score for a capture, refined by capture history.
#[must_use]
pub fn mvv_lva_score(board: &Board, mv: &Move, capture_history: &CaptureHistory) -> i32 {
    if !mv.is_capture() {
        return 0;
    }
    let Some((_, attacker)) = board.piece_at(mv.from()) else {
        return 0;
    };
    let victim = if mv.is_en_passant() {
        Piece::Pawn
    } else if let Some((_, piece)) = board.piece_at(mv.to()) {
        piece
    } else {
        return 0;
    };
    super::move_order::piece_value(victim) * 10 + capture_history.score(attacker, victim) / 16
}
