use crate::board::{Move, SearchIterationInfo};

use super::format_uci_move;

pub fn print_ready() {
    println!("readyok");
}

/// Print the final `bestmove [ponder <m>]` line that ends a search.
pub fn print_bestmove(best_move: Option<Move>, ponder_move: Option<Move>) {
    match best_move {
        Some(best_move) => {
            let uci_move = format_uci_move(&best_move);
            match ponder_move {
                Some(ponder) => println!("bestmove {} ponder {}", uci_move, format_uci_move(&ponder)),
                None => println!("bestmove {}", uci_move),
            }
        }
        None => println!("bestmove (none)"),
    }
}

/// Print one `info depth ...` line for a completed iteration.
pub fn print_iteration_info(info: &SearchIterationInfo) {
    let score = match info.mate_in {
        Some(mate) => format!("mate {mate}"),
        None => format!("cp {}", info.score),
    };
    println!(
        "info depth {} seldepth {} multipv {} score {} time {} nodes {} nps {} pv {}",
        info.depth,
        info.seldepth,
        info.multipv,
        score,
        info.time_ms,
        info.nodes,
        info.nps,
        info.pv
    );
}
