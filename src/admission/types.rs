// Standard library
use std::collections::HashMap;
use std::sync::Arc;

// 3rd party crates
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

// Project imports
use crate::metrics::AdmissionMetrics;
use crate::utility::clock::SystemClock;

// Current module imports
use super::functions::{
    default_backpressure_threshold, default_global_capacity, default_global_refill_interval_ms,
    default_global_refill_rate, default_per_agent_capacity, default_per_agent_refill_interval_ms,
    default_per_agent_refill_rate,
};

/// Rate limiter configuration as read from settings.
///
/// Values are coerced, never rejected, when a [`RateLimiter`] is built from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Maximum tokens in the shared global bucket
    #[serde(default = "default_global_capacity")]
    pub global_capacity: u64,
    /// Tokens added to the global bucket per refill interval
    #[serde(default = "default_global_refill_rate")]
    pub global_refill_rate: u64,
    /// Length of one global refill interval in milliseconds
    #[serde(default = "default_global_refill_interval_ms")]
    pub global_refill_interval_ms: u64,
    /// Maximum tokens in each destination bucket
    #[serde(default = "default_per_agent_capacity")]
    pub per_agent_capacity: u64,
    /// Tokens added to a destination bucket per refill interval
    #[serde(default = "default_per_agent_refill_rate")]
    pub per_agent_refill_rate: u64,
    /// Length of one destination refill interval in milliseconds
    #[serde(default = "default_per_agent_refill_interval_ms")]
    pub per_agent_refill_interval_ms: u64,
    /// Fraction of headroom that counts as near saturation, in [0, 1]
    #[serde(default = "default_backpressure_threshold")]
    pub backpressure_threshold: f64,
}

/// Shape of a single bucket. Every field is at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketConfig {
    pub capacity: u64,
    pub refill_rate: u64,
    pub refill_interval_ms: u64,
}

/// A capped token counter replenished in whole refill intervals.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    pub(super) config: BucketConfig,
    pub(super) tokens: f64,
    pub(super) last_refill_at: u64,
}

/// Outcome of trying to take one token from a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketDecision {
    pub allowed: bool,
    pub remaining_tokens: f64,
    /// Advisory wait before a retry can succeed; 0 when allowed
    pub retry_after_ms: u64,
}

/// Token count of a bucket at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketLevel {
    pub tokens: f64,
    pub capacity: u64,
}

/// Why a request was not admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    GlobalRateLimit,
    AgentRateLimit,
}

/// Result of a two-stage admission check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdmissionResult {
    pub allowed: bool,
    pub agent_id: String,
    pub retry_after_ms: u64,
    pub reason: Option<DenyReason>,
    /// Global bucket state after the call; reflects the refund on an agent denial
    pub global: BucketDecision,
    /// Destination bucket decision; `None` when the global stage denied
    pub agent: Option<BucketDecision>,
}

/// Which bucket raised a backpressure signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Global,
    Agent(String),
}

/// A bucket that is at or above the saturation line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackpressureSignal {
    pub source: SignalSource,
    pub utilization: f64,
    pub remaining_tokens: f64,
    pub capacity: u64,
}

/// Aggregate saturation across the global bucket and every tracked destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackpressureStatus {
    pub backpressure: bool,
    /// Highest utilization observed, rounded to four decimals
    pub level: f64,
    pub signals: Vec<BackpressureSignal>,
}

/// Two-level admission controller: one global bucket plus one bucket per destination.
///
/// All operations take `&self`; share it across threads behind an `Arc`.
/// Locks are always taken in the order global, destination map, destination bucket.
pub struct RateLimiter<C = SystemClock> {
    pub(super) clock: C,
    pub(super) config: LimiterConfig,
    pub(super) agent_template: BucketConfig,
    pub(super) threshold: f64,
    pub(super) global: Mutex<TokenBucket>,
    pub(super) agents: RwLock<HashMap<String, Arc<Mutex<TokenBucket>>>>,
    pub(super) metrics: AdmissionMetrics,
}
