// 3rd party crates
use parking_lot::RwLock;
use serde::Serialize;

// Project imports
use crate::admission::DenyReason;

/// Counters for admission decisions
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Total number of admission checks
    pub total_requests: u64,
    /// Number of admitted requests
    pub allowed: u64,
    /// Number of denied requests
    pub denied: u64,
    /// Number of backpressure evaluations that reported saturation
    pub backpressure_events: u64,
    /// Denials caused by the global bucket
    pub global_denials: u64,
    /// Denials caused by a destination bucket
    pub agent_denials: u64,
}

/// Thread-safe metrics manager
#[derive(Debug, Default)]
pub struct AdmissionMetrics {
    metrics: RwLock<MetricsSnapshot>,
}

impl AdmissionMetrics {
    /// Creates a new AdmissionMetrics
    pub fn new() -> Self {
        Self {
            metrics: RwLock::new(MetricsSnapshot::default()),
        }
    }

    /// Records an admitted request
    pub fn record_allowed(&self) {
        let mut metrics = self.metrics.write();
        metrics.total_requests += 1;
        metrics.allowed += 1;
    }

    /// Records a denied request
    pub fn record_denied(&self, reason: DenyReason) {
        let mut metrics = self.metrics.write();
        metrics.total_requests += 1;
        metrics.denied += 1;
        match reason {
            DenyReason::GlobalRateLimit => metrics.global_denials += 1,
            DenyReason::AgentRateLimit => metrics.agent_denials += 1,
        }
    }

    /// Records a saturated backpressure evaluation
    pub fn record_backpressure(&self) {
        let mut metrics = self.metrics.write();
        metrics.backpressure_events += 1;
    }

    /// Gets a snapshot of the current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        *self.metrics.read()
    }
}
