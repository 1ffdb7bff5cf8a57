//! Integration tests for the `Engine` controller: the search-thread
//! lifecycle a UCI session drives (start, wait, stop).

use std::sync::mpsc;
use std::time::Duration;

use corvid::board::Board;
use corvid::engine::{Engine, SearchParams};

#[test]
fn engine_depth_search_returns_move() {
    let mut engine = Engine::new(16);
    engine.set_board(Board::new());

    let (tx, rx) = mpsc::channel();
    let params = SearchParams {
        depth: Some(4),
        ..SearchParams::default()
    };
    engine.start_search(params, move |result| {
        let _ = tx.send(result);
    });

    let result = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("search did not report a result in time");
    assert!(result.best_move.is_some(), "depth-limited search should return a move");
}

#[test]
fn engine_time_limited_search_returns_move_within_time() {
    let mut engine = Engine::new(16);
    engine.set_board(Board::new());

    let (tx, rx) = mpsc::channel();
    let params = SearchParams {
        soft_time_ms: 50,
        hard_time_ms: 100,
        ..SearchParams::default()
    };
    engine.start_search(params, move |result| {
        let _ = tx.send(result);
    });

    let result = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("time-limited search did not finish in time");
    assert!(result.best_move.is_some(), "a 50ms search from startpos should still find a move");
}

#[test]
fn stop_signal_halts_an_infinite_search() {
    let mut engine = Engine::new(16);
    engine.set_board(Board::new());

    let (tx, rx) = mpsc::channel();
    let params = SearchParams {
        infinite: true,
        ..SearchParams::default()
    };
    engine.start_search(params, move |result| {
        let _ = tx.send(result);
    });

    std::thread::sleep(Duration::from_millis(50));
    engine.signal_stop();

    let result = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("stopped search should still report a result");
    assert!(result.best_move.is_some());
}
