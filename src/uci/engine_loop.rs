//! Top-level UCI session: reads commands from stdin, drives an [`Engine`],
//! and writes UCI-formatted responses to stdout until `quit`.
//!
//! This is the thin protocol dispatcher the search core treats as an
//! external collaborator (see spec §1): it owns the opening book and
//! tablebase handles, the option registry, and the engine's lifecycle, but
//! none of the search logic itself.

use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

use crate::board::DEFAULT_TT_MB;
use crate::collaborators::{resolve_book_path, FileOpeningBook, NoBook, NoTablebase, OpeningBook, TablebaseProbe};
use crate::engine::time::{compute_time_limits, TimeConfig};
use crate::engine::{Engine, SearchParams as GoSearchParams};

use super::command::{parse_go_params, parse_uci_command, GoParams, UciCommand};
use super::options::{parse_setoption, UciOptionAction, UciOptions};
use super::report::{print_bestmove, print_iteration_info, print_ready};
use super::{parse_position_command, print};

/// Drive a full UCI session over stdin/stdout until `quit` or EOF.
pub fn run_uci_loop() {
    let stdin = io::stdin();
    let mut engine = Engine::default();
    let mut options = UciOptions::new(DEFAULT_TT_MB);
    let mut book: Box<dyn OpeningBook> = Box::new(NoBook);
    let mut tablebase: Box<dyn TablebaseProbe> = Box::new(NoTablebase);

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let Some(command) = parse_uci_command(&line) else {
            continue;
        };

        match command {
            UciCommand::Uci => {
                engine.with_search_state_ref(|state| options.print(state.params()));
            }
            UciCommand::IsReady => print_ready(),
            UciCommand::UciNewGame => engine.new_game(),
            UciCommand::Position(parts) => {
                let mut board = engine.board().clone();
                let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
                parse_position_command(&mut board, &refs);
                engine.set_board(board);
            }
            UciCommand::Go(parts) => {
                let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
                let go = parse_go_params(&refs);
                handle_go(&mut engine, &options, book.as_ref(), go);
            }
            UciCommand::Perft(depth) => {
                let mut board = engine.board().clone();
                let start = Instant::now();
                let nodes = board.perft(depth);
                print::print_perft_info(depth, nodes, start.elapsed());
            }
            UciCommand::SetOption(parts) => {
                let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
                if let Some((name, value)) = parse_setoption(&refs) {
                    let action = engine
                        .with_search_state(|state| options.apply_setoption(&name, value.as_deref(), state));
                    apply_option_action(&mut engine, &mut book, &mut tablebase, action);
                }
            }
            UciCommand::Debug(arg) => {
                let on = matches!(arg.as_deref(), Some("on"));
                engine.set_trace(on);
            }
            UciCommand::Stop => engine.signal_stop(),
            UciCommand::PonderHit => engine.ponderhit(),
            UciCommand::Quit => {
                engine.stop_search();
                break;
            }
            UciCommand::Unknown(_) => {}
        }

        let _ = io::stdout().flush();
    }
}

/// Apply the side effect an option change requested, beyond the value
/// update `UciOptions::apply_setoption` already made in place.
fn apply_option_action(
    engine: &mut Engine,
    book: &mut Box<dyn OpeningBook>,
    tablebase: &mut Box<dyn TablebaseProbe>,
    action: Option<UciOptionAction>,
) {
    match action {
        Some(UciOptionAction::ReinitHash(mb)) => engine.resize_hash(mb),
        Some(UciOptionAction::SetThreads(n)) => engine.set_threads(n),
        Some(UciOptionAction::LoadBook(path)) => {
            let resolved = resolve_book_path(&path);
            match FileOpeningBook::load(&resolved) {
                Ok(loaded) => {
                    println!("info string loaded book {} ({} lines)", resolved.display(), loaded.len());
                    *book = Box::new(loaded);
                }
                Err(err) => {
                    println!("info string failed to load book {}: {err}", resolved.display());
                    *book = Box::new(NoBook);
                }
            }
        }
        Some(UciOptionAction::LoadTablebase(path)) => {
            // Syzygy probing is an external collaborator this core only
            // defines the contract for (spec §1); record the configured
            // path but keep answering "no result" until a real backend is
            // wired in behind `TablebaseProbe`.
            println!("info string Syzygy Path set to {path} (tablebase probing not implemented)");
            *tablebase = Box::new(NoTablebase);
        }
        None => {}
    }
}

/// Handle a `go` command: consult the opening book first, then fall back to
/// a timed/depth-limited search.
fn handle_go(engine: &mut Engine, options: &UciOptions, book: &dyn OpeningBook, go: GoParams) {
    if options.own_book {
        if let Some(mv) = book.probe(engine.board()) {
            print_bestmove(Some(mv), None);
            return;
        }
    }

    let search_moves = if go.searchmoves.is_empty() {
        Vec::new()
    } else {
        let mut probe_board = engine.board().clone();
        go.searchmoves
            .iter()
            .filter_map(|s| probe_board.parse_move(s).ok())
            .collect()
    };

    let time_config = TimeConfig {
        move_overhead_ms: options.move_overhead_ms,
        soft_time_percent: options.soft_time_percent,
        hard_time_percent: options.hard_time_percent,
        default_max_nodes: options.default_max_nodes,
    };

    let no_time_fields = go.wtime.is_none() && go.btime.is_none();
    let (soft_ms, hard_ms) = if let Some(movetime) = go.movetime {
        (movetime, movetime)
    } else if go.infinite || go.ponder || no_time_fields {
        // No wtime/btime given: either a depth/nodes-limited search, an
        // infinite/ponder search, or a bare "go" — none of these have a
        // clock to manage, so leave the search unbounded by time.
        (0, 0)
    } else {
        let white_to_move = engine.board().white_to_move();
        let (time_left, inc) = if white_to_move {
            (go.wtime.unwrap_or(0), go.winc.unwrap_or(0))
        } else {
            (go.btime.unwrap_or(0), go.binc.unwrap_or(0))
        };
        compute_time_limits(
            Duration::from_millis(time_left),
            Duration::from_millis(inc),
            None,
            go.movestogo,
            &time_config,
        )
    };

    // Skill Level below the maximum caps how deep iterative deepening is
    // allowed to go, approximating weaker play without touching move
    // ordering or evaluation.
    let skill_depth_cap = if options.skill_level >= 20 || go.infinite || go.ponder {
        None
    } else {
        Some(u32::from(options.skill_level) / 2 + 1)
    };
    let depth = match (go.depth, skill_depth_cap) {
        (Some(d), Some(cap)) => Some(d.min(cap)),
        (Some(d), None) => Some(d),
        (None, cap) => cap,
    };

    let node_limit = go.nodes.unwrap_or(options.default_max_nodes);

    let params = GoSearchParams {
        depth,
        soft_time_ms: soft_ms,
        hard_time_ms: hard_ms,
        ponder: go.ponder,
        infinite: go.infinite,
        multi_pv: options.multi_pv,
        search_moves,
    };

    engine.set_max_nodes(node_limit);
    engine.set_info_callback(Some(std::sync::Arc::new(|info| print_iteration_info(info))));
    engine.start_search(params, |result| {
        print_bestmove(result.best_move, result.ponder_move);
    });
}
