use crate::board::{SearchParams, SearchState, DEFAULT_TT_MB};

/// Print a UCI spin option.
fn print_spin(
    name: &str,
    default: impl std::fmt::Display,
    min: impl std::fmt::Display,
    max: impl std::fmt::Display,
) {
    println!("option name {name} type spin default {default} min {min} max {max}");
}

/// Print a UCI check option.
fn print_check(name: &str, default: bool) {
    println!(
        "option name {name} type check default {}",
        if default { "true" } else { "false" }
    );
}

pub enum UciOptionAction {
    ReinitHash(usize),
    SetThreads(usize),
    /// `Book File` was (re)configured: (re)load the opening book from this path.
    LoadBook(String),
    /// `Syzygy Path` was configured: (re)load tablebase files from this path.
    LoadTablebase(String),
}

/// Print a UCI string option.
fn print_string(name: &str, default: &str) {
    let shown = if default.is_empty() { "<empty>" } else { default };
    println!("option name {name} type string default {shown}");
}

pub struct UciOptions {
    pub hash_mb: usize,
    pub threads: usize,
    pub default_max_nodes: u64,
    pub move_overhead_ms: u64,
    pub soft_time_percent: u64,
    pub hard_time_percent: u64,
    pub multi_pv: u32,
    pub ponder: bool,
    /// 0 = weakest, 20 = full strength. Caps the search depth the engine
    /// will reach for non-infinite/non-depth-limited searches.
    pub skill_level: u8,
    /// Positive values make the engine avoid drawing when it believes it
    /// is better; negative values make it seek draws when worse.
    pub contempt: i32,
    pub own_book: bool,
    pub book_file: String,
    pub uci_chess960: bool,
    pub syzygy_path: String,
    /// Number of halfmoves without a capture or pawn move before the
    /// position is a forced draw (the FIDE rule is 100, i.e. 50 full moves).
    pub fifty_move_distance: u32,
    pub force_null_move: bool,
    pub write_search_log: bool,
    pub search_log_file: String,
}

impl UciOptions {
    #[must_use]
    pub fn new(hash_mb: usize) -> Self {
        UciOptions {
            hash_mb,
            threads: 1,
            default_max_nodes: 0,
            move_overhead_ms: 50,
            soft_time_percent: 70,
            hard_time_percent: 90,
            multi_pv: 1,
            ponder: false,
            skill_level: 20,
            contempt: 0,
            own_book: false,
            book_file: String::new(),
            uci_chess960: false,
            syzygy_path: String::new(),
            fifty_move_distance: 100,
            force_null_move: false,
            write_search_log: false,
            search_log_file: "corvid.log".to_string(),
        }
    }

    pub fn print(&self, params: &SearchParams) {
        println!("id name corvid");
        println!("id author Dean Menezes");

        // Engine options
        print_spin("Hash", self.hash_mb, 1, 65536);
        print_spin("Threads", self.threads, 1, 256);
        print_spin("Move Overhead", self.move_overhead_ms, 0, 1000);
        print_spin("Soft Time Percent", self.soft_time_percent, 1, 100);
        print_spin("Hard Time Percent", self.hard_time_percent, 1, 100);
        print_spin("Max Nodes", self.default_max_nodes, 0_u64, u64::MAX);
        print_spin("MultiPV", self.multi_pv, 1, 64);
        print_check("Ponder", self.ponder);

        // Playing-strength and game-rule options
        print_spin("Skill Level", self.skill_level, 0, 20);
        print_spin("Contempt Factor", self.contempt, -100, 100);
        print_check("Own Book", self.own_book);
        print_string("Book File", &self.book_file);
        print_check("UCI_Chess960", self.uci_chess960);
        print_string("Syzygy Path", &self.syzygy_path);
        print_spin("50 Move Distance", self.fifty_move_distance, 5, 100);
        print_check("Force Null Move", self.force_null_move);
        print_check("Write Search Log", self.write_search_log);
        print_string("Search Log File", &self.search_log_file);

        // Tunable search parameters for SPSA
        print_spin("RFPMargin", params.rfp_margin, 50, 300);
        print_spin("NullMoveReduction", params.null_reduction, 1, 5);
        print_spin("FutilityMargin", params.futility_margin, 50, 250);
        print_spin("IIRMinDepth", params.iir_min_depth, 3, 8);
        print_spin("LMRMinDepth", params.lmr_min_depth, 2, 6);

        println!("uciok");
    }

    pub fn apply_setoption(
        &mut self,
        name: &str,
        value: Option<&str>,
        state: &mut SearchState,
    ) -> Option<UciOptionAction> {
        let normalized = name.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "hash" => {
                let mb = value
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(DEFAULT_TT_MB)
                    .max(1);
                if mb != self.hash_mb {
                    self.hash_mb = mb;
                    return Some(UciOptionAction::ReinitHash(mb));
                }
            }
            "threads" => {
                let threads = value
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(1)
                    .clamp(1, 256);
                if threads != self.threads {
                    self.threads = threads;
                    return Some(UciOptionAction::SetThreads(threads));
                }
            }
            "move overhead" => {
                if let Some(v) = value.and_then(|v| v.parse::<u64>().ok()) {
                    self.move_overhead_ms = v;
                }
            }
            "soft time percent" => {
                if let Some(v) = value.and_then(|v| v.parse::<u64>().ok()) {
                    self.soft_time_percent = v.clamp(1, 100);
                }
            }
            "hard time percent" => {
                if let Some(v) = value.and_then(|v| v.parse::<u64>().ok()) {
                    self.hard_time_percent = v.clamp(1, 100);
                }
            }
            "max nodes" => {
                if let Some(v) = value.and_then(|v| v.parse::<u64>().ok()) {
                    self.default_max_nodes = v;
                }
            }
            "softtime" => {
                if let Some(v) = value.and_then(|v| v.parse::<u64>().ok()) {
                    self.soft_time_percent = v.clamp(1, 100);
                }
            }
            "hardtime" => {
                if let Some(v) = value.and_then(|v| v.parse::<u64>().ok()) {
                    self.hard_time_percent = v.clamp(1, 100);
                }
            }
            "nodes" => {
                if let Some(v) = value.and_then(|v| v.parse::<u64>().ok()) {
                    self.default_max_nodes = v;
                }
            }
            "multipv" => {
                if let Some(v) = value.and_then(|v| v.parse::<u32>().ok()) {
                    self.multi_pv = v.clamp(1, 64);
                }
            }
            "ponder" => {
                if let Some(v) = value {
                    self.ponder = matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1");
                }
            }
            "skill level" => {
                if let Some(v) = value.and_then(|v| v.parse::<u8>().ok()) {
                    self.skill_level = v.min(20);
                }
            }
            "contempt factor" | "contempt" => {
                if let Some(v) = value.and_then(|v| v.parse::<i32>().ok()) {
                    self.contempt = v.clamp(-100, 100);
                    state.params_mut().contempt = self.contempt;
                }
            }
            "own book" => {
                if let Some(v) = value {
                    self.own_book = matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1");
                }
            }
            "book file" => {
                if let Some(v) = value {
                    self.book_file = v.to_string();
                    if !self.book_file.is_empty() {
                        return Some(UciOptionAction::LoadBook(self.book_file.clone()));
                    }
                }
            }
            "uci_chess960" => {
                if let Some(v) = value {
                    self.uci_chess960 = matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1");
                }
            }
            "syzygy path" => {
                if let Some(v) = value {
                    self.syzygy_path = v.to_string();
                    if !self.syzygy_path.is_empty() {
                        return Some(UciOptionAction::LoadTablebase(self.syzygy_path.clone()));
                    }
                }
            }
            "50 move distance" => {
                if let Some(v) = value.and_then(|v| v.parse::<u32>().ok()) {
                    self.fifty_move_distance = v.clamp(5, 100);
                    state.params_mut().fifty_move_distance = self.fifty_move_distance;
                }
            }
            "force null move" => {
                if let Some(v) = value {
                    self.force_null_move = matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1");
                    state.params_mut().force_null_move = self.force_null_move;
                }
            }
            "write search log" => {
                if let Some(v) = value {
                    self.write_search_log = matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1");
                }
            }
            "search log file" => {
                if let Some(v) = value {
                    self.search_log_file = v.to_string();
                }
            }
            // Tunable search parameters for SPSA
            "rfpmargin" => {
                if let Some(v) = value.and_then(|v| v.parse::<i32>().ok()) {
                    state.params_mut().rfp_margin = v.clamp(50, 300);
                }
            }
            "nullmovereduction" => {
                if let Some(v) = value.and_then(|v| v.parse::<u32>().ok()) {
                    state.params_mut().null_reduction = v.clamp(1, 5);
                }
            }
            "futilitymargin" => {
                if let Some(v) = value.and_then(|v| v.parse::<i32>().ok()) {
                    state.params_mut().futility_margin = v.clamp(50, 250);
                }
            }
            "iirmindepth" => {
                if let Some(v) = value.and_then(|v| v.parse::<u32>().ok()) {
                    state.params_mut().iir_min_depth = v.clamp(3, 8);
                }
            }
            "lmrmindepth" => {
                if let Some(v) = value.and_then(|v| v.parse::<u32>().ok()) {
                    state.params_mut().lmr_min_depth = v.clamp(2, 6);
                }
            }
            _ => {}
        }
        None
    }
}

#[must_use]
pub fn parse_setoption(parts: &[&str]) -> Option<(String, Option<String>)> {
    if parts.is_empty() || parts[0] != "setoption" {
        return None;
    }

    let mut name_parts: Vec<&str> = Vec::new();
    let mut value_parts: Vec<&str> = Vec::new();
    let mut mode = "";

    for part in parts.iter().skip(1) {
        match *part {
            "name" => mode = "name",
            "value" => mode = "value",
            _ => match mode {
                "name" => name_parts.push(part),
                "value" => value_parts.push(part),
                _ => {}
            },
        }
    }

    if name_parts.is_empty() {
        return None;
    }

    let name = name_parts.join(" ");
    let value = if value_parts.is_empty() {
        None
    } else {
        Some(value_parts.join(" "))
    };

    Some((name, value))
}
