// 3rd party crates
use tracing::warn;

// Current module imports
use super::constants::{
    DEFAULT_BACKPRESSURE_THRESHOLD, DEFAULT_GLOBAL_CAPACITY, DEFAULT_GLOBAL_REFILL_INTERVAL_MS,
    DEFAULT_GLOBAL_REFILL_RATE, DEFAULT_PER_AGENT_CAPACITY, DEFAULT_PER_AGENT_REFILL_INTERVAL_MS,
    DEFAULT_PER_AGENT_REFILL_RATE, LEVEL_PRECISION, MIN_BUCKET_SETTING,
};

pub fn default_global_capacity() -> u64 {
    DEFAULT_GLOBAL_CAPACITY
}

pub fn default_global_refill_rate() -> u64 {
    DEFAULT_GLOBAL_REFILL_RATE
}

pub fn default_global_refill_interval_ms() -> u64 {
    DEFAULT_GLOBAL_REFILL_INTERVAL_MS
}

pub fn default_per_agent_capacity() -> u64 {
    DEFAULT_PER_AGENT_CAPACITY
}

pub fn default_per_agent_refill_rate() -> u64 {
    DEFAULT_PER_AGENT_REFILL_RATE
}

pub fn default_per_agent_refill_interval_ms() -> u64 {
    DEFAULT_PER_AGENT_REFILL_INTERVAL_MS
}

pub fn default_backpressure_threshold() -> f64 {
    DEFAULT_BACKPRESSURE_THRESHOLD
}

/// Raises a bucket setting to the smallest usable value, logging when it had to.
pub fn coerce_bucket_setting(name: &str, value: u64) -> u64 {
    if value < MIN_BUCKET_SETTING {
        warn!(
            "{} = {} is not usable, falling back to {}",
            name, value, MIN_BUCKET_SETTING
        );
        return MIN_BUCKET_SETTING;
    }
    value
}

/// Maps the threshold into [0, 1]; non-finite values fall back to the default.
pub fn coerce_threshold(value: f64) -> f64 {
    if !value.is_finite() {
        warn!(
            "backpressure_threshold = {} is not finite, falling back to {}",
            value, DEFAULT_BACKPRESSURE_THRESHOLD
        );
        return DEFAULT_BACKPRESSURE_THRESHOLD;
    }

    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        warn!(
            "backpressure_threshold = {} is outside [0, 1], clamped to {}",
            value, clamped
        );
    }
    clamped
}

/// Rounds a utilization level to the reported precision.
pub fn round_level(level: f64) -> f64 {
    let scale = 10f64.powi(LEVEL_PRECISION);
    (level * scale).round() / scale
}
