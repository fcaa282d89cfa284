/// Fraction of clusters drawn once per confidence-interval group.
pub const CI_HALF_SAMPLE_FRACTION: f64 = 0.5;
/// `draw` switches from rejection sampling to Fisher-Yates once
/// the requested count reaches `max / DRAW_SIMPLE_RATIO`.
pub const DRAW_SIMPLE_RATIO: usize = 10;
pub const DEFAULT_NUM_TREES: usize = 2000;
pub const DEFAULT_SAMPLE_FRACTION: f64 = 0.5;
pub const DEFAULT_CI_GROUP_SIZE: usize = 2;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_BLOCK_SIZE: usize = 2;
pub const DEFAULT_HONESTY_FRACTION: f64 = 0.5;
pub const DEFAULT_MIN_NODE_SIZE: usize = 5;
pub const DEFAULT_ALPHA: f64 = 0.05;
