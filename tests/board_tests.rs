use corvid::board::Board;
use corvid::tt::{BoundType, TranspositionTable};

#[test]
fn perft_positions() {
    struct TestPosition {
        name: &'static str,
        fen: &'static str,
        depths: &'static [(usize, u64)],
    }

    const TEST_POSITIONS: &[TestPosition] = &[
        TestPosition {
            name: "Initial Position",
            fen: "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            depths: &[(1, 20), (2, 400), (3, 8902)],
        },
        TestPosition {
            name: "Kiwipete",
            fen: "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            depths: &[(1, 48), (2, 2039), (3, 97862)],
        },
    ];

    for position in TEST_POSITIONS {
        let mut board = Board::from_fen(position.fen);
        for &(depth, expected) in position.depths {
            let nodes = board.perft(depth);
            assert_eq!(nodes, expected, "Perft failed for {} at depth {}", position.name, depth);
        }
    }
}

#[test]
fn test_draw_detection_50_move() {
    // One ply short of the fifty-move rule; a quiet king move should trip it.
    let mut board = Board::from_fen("8/8/8/8/8/8/8/K6k w - - 99 1");
    assert!(!board.is_draw());
    board.make_move_uci("a1b1").expect("legal king move");
    assert!(board.is_draw());
}

#[test]
fn test_transposition_table_store_probe() {
    let tt = TranspositionTable::new(1);
    let hash = 0xdead_beefu64;
    tt.store(hash, 1, 100, BoundType::Exact, None, 0);
    let entry = tt.probe(hash).expect("Entry missing");
    assert_eq!(entry.depth(), 1);
    assert_eq!(entry.score(), 100);

    // A same-key store always overwrites, since the caller is responsible
    // for only storing results from the current search.
    tt.store(hash, 5, 200, BoundType::Exact, None, 0);
    let entry2 = tt.probe(hash).expect("Entry missing after deeper store");
    assert_eq!(entry2.depth(), 5);
    assert_eq!(entry2.score(), 200);
}

#[test]
fn test_transposition_table_miss() {
    let tt = TranspositionTable::new(1);
    assert!(tt.probe(0x1234_5678).is_none());
}
