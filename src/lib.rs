//! Admission control for dispatching work to named destinations.
//!
//! A two-level token-bucket limiter (one global bucket, one bucket per
//! destination) combined with a utilization-based backpressure signal.
//! See [`admission`] for the model.

pub mod admission;
pub mod gate;
pub mod metrics;
pub mod settings;
pub mod utility;

pub use admission::{
    AdmissionResult, BackpressureStatus, DenyReason, LimiterConfig, RateLimiter, TokenBucket,
};
pub use metrics::MetricsSnapshot;
