//! Contracts for the external systems this search core is embedded in.
//!
//! An opening book and an endgame tablebase both answer the same kind of
//! question — "is there a known-good move (or result) for this position?" —
//! from storage this crate does not own or format. The protocol dispatcher
//! consults them before calling into search; a miss here is not an error,
//! just a "search normally" signal. `NoBook`/`NoTablebase` are the defaults
//! wired up when no book or tablebase file is configured.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::board::{Board, Move};

/// A source of known-good moves for positions seen before search begins.
pub trait OpeningBook: Send + Sync {
    /// Return a move to play from `board`, or `None` if the position isn't
    /// in the book. Implementations must not assume the move is pseudo-legal
    /// without checking — callers re-validate against the live position.
    fn probe(&self, board: &Board) -> Option<Move>;
}

/// Result of a tablebase probe: the position's theoretical outcome for the
/// side to move, independent of search depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TablebaseResult {
    Win,
    Loss,
    Draw,
}

/// A source of exact endgame results for positions at or below some piece
/// count, typically backed by Syzygy-style files.
pub trait TablebaseProbe: Send + Sync {
    /// Return the exact result for `board` from the side to move's
    /// perspective, or `None` if `board` isn't covered (too many pieces, or
    /// the probe files aren't loaded).
    fn probe(&self, board: &Board) -> Option<TablebaseResult>;
}

/// Opening book that never has an answer. The default when `Own Book` is off
/// or no `Book File` is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBook;

impl OpeningBook for NoBook {
    fn probe(&self, _board: &Board) -> Option<Move> {
        None
    }
}

/// Tablebase probe that never has an answer. The default when no `Syzygy
/// Path` is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTablebase;

impl TablebaseProbe for NoTablebase {
    fn probe(&self, _board: &Board) -> Option<TablebaseResult> {
        None
    }
}

/// A single book line: the position it applies to, stored as the exact FEN
/// the move was recorded against, and the move in UCI notation.
struct BookEntry {
    fen: String,
    uci_move: String,
}

/// An opening book read from a plain-text file: one `<fen> <uci move>` pair
/// per line, blank lines and `#`-prefixed lines ignored. This is a much
/// simpler format than Polyglot's binary layout, chosen because the search
/// core has no polyglot reader of its own and the protocol dispatcher that
/// would own one is explicitly out of scope here — the file format is this
/// crate's own, not an interchange standard.
///
/// Lines are matched against the probing position's FEN with move-count
/// fields stripped, so a book built from one game still matches transposed
/// positions reached via a different move order.
pub struct FileOpeningBook {
    entries: RwLock<Vec<BookEntry>>,
}

impl FileOpeningBook {
    /// Load a book from `path`. Malformed lines are skipped rather than
    /// rejecting the whole file.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let mut entries = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((fen, uci_move)) = parse_book_line(line) {
                entries.push(BookEntry { fen, uci_move });
            }
        }
        Ok(FileOpeningBook {
            entries: RwLock::new(entries),
        })
    }

    /// An empty book, useful as a placeholder before a real file is loaded.
    #[must_use]
    pub fn empty() -> Self {
        FileOpeningBook {
            entries: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |e| e.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OpeningBook for FileOpeningBook {
    fn probe(&self, board: &Board) -> Option<Move> {
        let key = position_key(&board.to_fen());
        let entries = self.entries.read().ok()?;
        let candidates: Vec<&str> = entries
            .iter()
            .filter(|e| position_key(&e.fen) == key)
            .map(|e| e.uci_move.as_str())
            .collect();
        let uci_move = candidates.first().copied()?;
        let mut probe_board = board.clone();
        probe_board.parse_move(uci_move).ok()
    }
}

/// Strip the halfmove clock and fullmove number so transposed games with
/// different move counters still compare equal.
fn position_key(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

fn parse_book_line(line: &str) -> Option<(String, String)> {
    // A FEN has six space-separated fields; the move is whatever follows.
    let mut fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 7 {
        return None;
    }
    let uci_move = fields.pop()?.to_string();
    let fen = fields.join(" ");
    Some((fen, uci_move))
}

/// Default path layout used when `Book File` names a bare filename rather
/// than a full path: look next to the running binary first, then the
/// current directory.
#[must_use]
pub fn resolve_book_path(configured: &str) -> PathBuf {
    let candidate = PathBuf::from(configured);
    if candidate.is_absolute() || candidate.exists() {
        return candidate;
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let beside_exe = dir.join(configured);
            if beside_exe.exists() {
                return beside_exe;
            }
        }
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;

    #[test]
    fn no_book_never_answers() {
        let book = NoBook;
        assert_eq!(book.probe(&Board::new()), None);
    }

    #[test]
    fn no_tablebase_never_answers() {
        let tb = NoTablebase;
        assert_eq!(tb.probe(&Board::new()), None);
    }

    #[test]
    fn position_key_ignores_move_counters() {
        let a = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let b = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 3 17";
        assert_eq!(position_key(a), position_key(b));
    }

    #[test]
    fn file_book_probes_known_opening() {
        let board = Board::new();
        let fen = board.to_fen();
        let line = format!("{fen} e2e4");
        let (parsed_fen, parsed_move) = parse_book_line(&line).expect("line should parse");
        assert_eq!(parsed_move, "e2e4");
        assert_eq!(position_key(&parsed_fen), position_key(&fen));

        let book = FileOpeningBook {
            entries: RwLock::new(vec![BookEntry {
                fen: parsed_fen,
                uci_move: parsed_move,
            }]),
        };
        let mv = book.probe(&board).expect("book should answer startpos");
        assert_eq!(mv.to_string(), "e2e4");
    }

    #[test]
    fn empty_book_has_no_answer() {
        let book = FileOpeningBook::empty();
        assert!(book.is_empty());
        assert_eq!(book.probe(&Board::new()), None);
    }
}
