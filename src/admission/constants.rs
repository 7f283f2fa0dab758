/// Default global bucket settings
pub const DEFAULT_GLOBAL_CAPACITY: u64 = 50;
pub const DEFAULT_GLOBAL_REFILL_RATE: u64 = 10;
pub const DEFAULT_GLOBAL_REFILL_INTERVAL_MS: u64 = 1000;

/// Default per-destination bucket settings
pub const DEFAULT_PER_AGENT_CAPACITY: u64 = 10;
pub const DEFAULT_PER_AGENT_REFILL_RATE: u64 = 2;
pub const DEFAULT_PER_AGENT_REFILL_INTERVAL_MS: u64 = 1000;

/// Fraction of headroom below which a bucket counts as near saturation
pub const DEFAULT_BACKPRESSURE_THRESHOLD: f64 = 0.2;

/// Smallest capacity, refill rate or refill interval a bucket accepts
pub const MIN_BUCKET_SETTING: u64 = 1;

/// Smallest advisory wait handed back on a denial, in milliseconds
pub const MIN_RETRY_AFTER_MS: u64 = 1;

/// Decimal places kept when reporting the backpressure level
pub const LEVEL_PRECISION: i32 = 4;
