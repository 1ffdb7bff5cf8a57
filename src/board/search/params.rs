#[derive(Clone, Debug)]
pub struct SearchParams {
    pub null_reduction: u32,
    pub null_min_depth: u32,
    pub null_verification_depth: u32,
    pub futility_margin: i32,
    pub razor_margin: i32,
    pub lmr_min_depth: u32,
    pub lmr_min_move: usize,
    pub lmr_reduction: u32,
    pub lmp_min_depth: u32,
    pub lmp_move_limit: usize,
    pub iir_min_depth: u32,
    pub singular_margin: i32,
    pub rfp_margin: i32,
    pub static_null_margin: i32,
    pub delta_margin: i32,
    /// Score penalty applied to a draw from the side-to-move's perspective
    /// at the point it's detected (positive avoids draws, negative seeks them).
    pub contempt: i32,
    /// Halfmove clock value at which a position is a forced draw.
    pub fifty_move_distance: u32,
    /// When set, null-move pruning ignores `null_min_depth` and is tried at
    /// every eligible node regardless of depth.
    pub force_null_move: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            null_reduction: 2,
            null_min_depth: 3,
            null_verification_depth: 12,
            futility_margin: 150,
            razor_margin: 250,
            lmr_min_depth: 3,
            lmr_min_move: 3,
            lmr_reduction: 1,
            lmp_min_depth: 3,
            lmp_move_limit: 8,
            iir_min_depth: 6,
            singular_margin: 50,
            rfp_margin: 100,
            static_null_margin: 120,
            delta_margin: 200,
            contempt: 0,
            fifty_move_distance: 100,
            force_null_move: false,
        }
    }
}
