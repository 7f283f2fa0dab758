//! Admission control
//!
//! Decides whether a unit of work may be dispatched to a named destination
//! right now, and reports how close the system is to saturation.
//!
//! # Model
//!
//! A [`RateLimiter`] owns one global [`TokenBucket`] and one bucket per
//! destination id, created full on first use and kept until reset. A check
//! consumes from the global bucket first and then from the destination
//! bucket; when the destination refuses, the global token is handed back.
//!
//! Buckets refill in whole intervals: `refill_rate` tokens per elapsed
//! `refill_interval_ms`, capped at `capacity`. Refill is lazy and happens on
//! every consume or peek, so reads such as [`RateLimiter::backpressure_at`]
//! advance bucket state.
//!
//! # Example
//!
//! ```rust
//! use swarm_admission::admission::{DenyReason, LimiterConfig, RateLimiter};
//! use swarm_admission::utility::clock::ManualClock;
//!
//! let config = LimiterConfig {
//!     global_capacity: 5,
//!     per_agent_capacity: 1,
//!     ..LimiterConfig::default()
//! };
//! let limiter = RateLimiter::with_clock(config, ManualClock::new(0));
//!
//! assert!(limiter.check_at("worker-1", 0).allowed);
//!
//! let denied = limiter.check_at("worker-1", 0);
//! assert_eq!(denied.reason, Some(DenyReason::AgentRateLimit));
//! assert_eq!(limiter.global_level_at(0).tokens, 4.0);
//! ```
//!
//! Denials are ordinary results, never errors. Callers branch on `allowed`
//! and may wait `retry_after_ms` before trying again; the limiter itself never
//! queues or retries.

pub mod constants;
pub mod functions;
pub mod impls;
pub mod limiter;
pub mod types;

pub use types::{
    AdmissionResult, BackpressureSignal, BackpressureStatus, BucketConfig, BucketDecision,
    BucketLevel, DenyReason, LimiterConfig, RateLimiter, SignalSource, TokenBucket,
};
