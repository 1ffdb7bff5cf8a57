//! Engine controller implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::board::{
    search, spawn_watchdog, Board, Pool, PoolConfig, SearchClock, SearchConfig, SearchInfoCallback,
    SearchResult, SearchState,
};

/// Search thread stack size (32 MB). Deep recursive alpha-beta needs more
/// than the platform default thread stack.
const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;
const HARD_STOP_MARGIN_MS: u64 = 5;

/// Poll interval when waiting for ponder to complete
const PONDER_POLL_MS: u64 = 10;

/// Active search job state
pub struct SearchJob {
    /// Stop flag for the search
    pub stop: Arc<AtomicBool>,
    /// Clock for time management
    pub clock: Arc<SearchClock>,
    /// Whether we're currently pondering
    pub pondering: Arc<AtomicBool>,
    /// Planned soft time limit (for ponderhit)
    pub planned_soft_time_ms: u64,
    /// Planned hard time limit (for ponderhit)
    pub planned_hard_time_ms: u64,
    /// Handle to the search thread
    handle: JoinHandle<()>,
    /// Optional handle to the timer thread enforcing hard stops
    timer_handle: Option<JoinHandle<()>>,
}

impl SearchJob {
    /// Stop the search and wait for the thread to finish
    pub fn stop_and_wait(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.handle.join();
        if let Some(timer) = self.timer_handle {
            let _ = timer.join();
        }
    }

    /// Signal stop without waiting
    pub fn signal_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        self.pondering.store(false, Ordering::Relaxed);
    }

    /// Handle ponderhit: transition from pondering to a real search with the
    /// time budget that was computed when the ponder search started.
    pub fn ponderhit(&self) {
        if self.pondering.load(Ordering::Relaxed) {
            let start = Instant::now();
            let hard_deadline = start + Duration::from_millis(self.planned_hard_time_ms);
            self.clock.reset(
                start,
                Some(start + Duration::from_millis(self.planned_soft_time_ms)),
                Some(hard_deadline),
            );
            let _ = spawn_watchdog(hard_deadline, Arc::clone(&self.stop));
            self.pondering.store(false, Ordering::Relaxed);
        }
    }
}

/// Parameters for starting a new search
#[derive(Default)]
pub struct SearchParams {
    /// Maximum depth to search (None = unlimited)
    pub depth: Option<u32>,
    /// Soft time limit in milliseconds
    pub soft_time_ms: u64,
    /// Hard time limit in milliseconds
    pub hard_time_ms: u64,
    /// Whether to ponder (think on opponent's time)
    pub ponder: bool,
    /// Whether to search infinitely
    pub infinite: bool,
    /// Number of principal variations to search (1 = normal, >1 = `MultiPV`)
    pub multi_pv: u32,
    /// Restrict the root move list to this set (UCI `go searchmoves`).
    pub search_moves: Vec<crate::board::Move>,
}

/// Owns the current position and persistent search state, and manages the
/// lifecycle of the background search thread: starting it, stopping it,
/// and handling `ponderhit`.
pub struct Engine {
    board: Board,
    search_state: Arc<Mutex<SearchState>>,
    current_job: Option<SearchJob>,
    info_callback: Option<SearchInfoCallback>,
    num_threads: usize,
}

impl Engine {
    /// Create a new engine with a transposition table of `tt_mb` megabytes.
    #[must_use]
    pub fn new(tt_mb: usize) -> Self {
        Engine {
            board: Board::new(),
            search_state: Arc::new(Mutex::new(SearchState::new(tt_mb))),
            current_job: None,
            info_callback: None,
            num_threads: 1,
        }
    }

    /// Set the number of search threads used for a pooled search.
    pub fn set_threads(&mut self, num_threads: usize) {
        self.num_threads = num_threads.max(1);
    }

    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Replace the current position. Stops any in-flight search first.
    pub fn set_board(&mut self, board: Board) {
        self.stop_search();
        self.board = board;
    }

    #[must_use]
    pub fn search_state(&self) -> &Arc<Mutex<SearchState>> {
        &self.search_state
    }

    /// Reset the board to the starting position and clear per-game search
    /// heuristics (history, killers, counter moves).
    pub fn new_game(&mut self) {
        self.stop_search();
        self.board = Board::new();
        let mut state = self.search_state.lock();
        state.new_search();
    }

    /// Stop any active search and wait for the search thread to exit.
    pub fn stop_search(&mut self) {
        if let Some(job) = self.current_job.take() {
            job.stop_and_wait();
        }
    }

    /// Signal stop to an active search without blocking on thread exit.
    pub fn signal_stop(&mut self) {
        if let Some(job) = &self.current_job {
            job.signal_stop();
        }
    }

    /// Handle a `ponderhit` command.
    pub fn ponderhit(&mut self) {
        if let Some(job) = &self.current_job {
            job.ponderhit();
        }
    }

    #[must_use]
    pub fn is_searching(&self) -> bool {
        self.current_job.is_some()
    }

    fn build_deadlines(params: &SearchParams, start: Instant) -> (Option<Instant>, Option<Instant>) {
        if params.infinite || params.ponder {
            return (None, None);
        }

        let soft_deadline = (params.soft_time_ms > 0)
            .then(|| start + Duration::from_millis(params.soft_time_ms));
        let hard_deadline = (params.hard_time_ms > 0).then(|| {
            start + Duration::from_millis(params.hard_time_ms.saturating_sub(HARD_STOP_MARGIN_MS))
        });

        (soft_deadline, hard_deadline)
    }

    fn build_search_config(&self, params: &SearchParams, node_limit: u64) -> SearchConfig {
        let mut config = if let Some(d) = params.depth {
            SearchConfig::depth(d)
        } else {
            SearchConfig::default()
        };

        if !params.infinite && !params.ponder && params.soft_time_ms > 0 {
            config.time_limit_ms = params.soft_time_ms;
        }
        if node_limit > 0 {
            config = config.with_nodes(node_limit);
        }
        if let Some(cb) = &self.info_callback {
            config = config.with_info_callback(cb.clone());
        }
        if params.multi_pv > 1 {
            config = config.with_multi_pv(params.multi_pv);
        }
        if !params.search_moves.is_empty() {
            config = config.with_search_moves(params.search_moves.clone());
        }
        config
    }

    /// Start a search with the given parameters.
    ///
    /// `on_complete` is called from the search thread once the search
    /// finishes (after waiting out any ponder period).
    #[allow(clippy::needless_pass_by_value)]
    pub fn start_search<F>(&mut self, params: SearchParams, on_complete: F)
    where
        F: FnOnce(SearchResult) + Send + 'static,
    {
        self.stop_search();

        let node_limit = {
            let mut guard = self.search_state.lock();
            guard.new_search();
            guard.stats.max_nodes
        };

        let stop = Arc::new(AtomicBool::new(false));
        let start = Instant::now();
        let (soft_deadline, hard_deadline) = Self::build_deadlines(&params, start);
        let clock = Arc::new(SearchClock::new(start, soft_deadline, hard_deadline));
        let pondering = Arc::new(AtomicBool::new(params.ponder));

        let timer_handle = if !params.infinite
            && !params.ponder
            && params.depth.is_none()
            && params.hard_time_ms > 0
        {
            hard_deadline.map(|deadline| spawn_watchdog(deadline, Arc::clone(&stop)))
        } else {
            None
        };

        let search_board = self.board.clone();
        let search_state = Arc::clone(&self.search_state);
        let stop_clone = Arc::clone(&stop);
        let pondering_clone = Arc::clone(&pondering);
        let num_threads = self.num_threads;
        let info_callback = self.info_callback.clone();

        let handle = if num_threads > 1 {
            let pool_config = PoolConfig {
                num_threads,
                max_depth: params.depth.unwrap_or(64),
                time_limit_ms: if params.infinite || params.ponder {
                    0
                } else {
                    params.soft_time_ms
                },
                node_limit,
                info_callback,
                search_moves: params.search_moves.clone(),
            };

            thread::Builder::new()
                .name("search-main".to_string())
                .stack_size(SEARCH_STACK_SIZE)
                .spawn(move || {
                    let mut guard = search_state.lock();
                    let result = Pool::search(&search_board, &mut guard, pool_config, stop_clone.clone());
                    drop(guard);

                    while pondering_clone.load(Ordering::Relaxed) && !stop_clone.load(Ordering::Relaxed) {
                        thread::sleep(Duration::from_millis(PONDER_POLL_MS));
                    }

                    on_complete(result);
                })
                .expect("failed to spawn search thread")
        } else {
            let config = self.build_search_config(&params, node_limit);
            let mut search_board = search_board;

            thread::Builder::new()
                .name("search".to_string())
                .stack_size(SEARCH_STACK_SIZE)
                .spawn(move || {
                    let mut guard = search_state.lock();
                    let result: SearchResult = search(&mut search_board, &mut guard, config, &stop_clone);
                    drop(guard);

                    while pondering_clone.load(Ordering::Relaxed) && !stop_clone.load(Ordering::Relaxed) {
                        thread::sleep(Duration::from_millis(PONDER_POLL_MS));
                    }

                    on_complete(result);
                })
                .expect("failed to spawn search thread")
        };

        self.current_job = Some(SearchJob {
            stop,
            clock,
            pondering,
            planned_soft_time_ms: params.soft_time_ms,
            planned_hard_time_ms: params.hard_time_ms,
            handle,
            timer_handle,
        });
    }

    /// Execute a closure with mutable access to the search state.
    pub fn with_search_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut SearchState) -> R,
    {
        f(&mut self.search_state.lock())
    }

    /// Execute a closure with immutable access to the search state.
    pub fn with_search_state_ref<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&SearchState) -> R,
    {
        f(&self.search_state.lock())
    }

    /// Resize the transposition table, discarding its contents.
    pub fn resize_hash(&mut self, mb: usize) {
        self.stop_search();
        self.with_search_state(|state| state.reset_tables(mb));
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.with_search_state(|state| state.set_trace(trace));
    }

    pub fn set_max_nodes(&mut self, nodes: u64) {
        self.with_search_state(|state| state.set_max_nodes(nodes));
    }

    /// Set the callback invoked with each completed iteration's info.
    pub fn set_info_callback(&mut self, cb: Option<SearchInfoCallback>) {
        self.info_callback = cb;
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(crate::board::DEFAULT_TT_MB)
    }
}
