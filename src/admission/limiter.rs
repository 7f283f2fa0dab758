// Standard library
use std::collections::HashMap;
use std::sync::Arc;

// 3rd party crates
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace};

// Project imports
use crate::metrics::{AdmissionMetrics, MetricsSnapshot};
use crate::utility::clock::{Clock, SystemClock};

// Current module imports
use super::functions::round_level;
use super::types::{
    AdmissionResult, BackpressureSignal, BackpressureStatus, BucketDecision, BucketLevel,
    DenyReason, LimiterConfig, RateLimiter, SignalSource, TokenBucket,
};

impl RateLimiter<SystemClock> {
    /// Creates a limiter driven by the wall clock.
    pub fn new(config: LimiterConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl Default for RateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new(LimiterConfig::default())
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Creates a limiter that reads time from `clock`.
    ///
    /// The configuration is coerced once here; the global bucket starts full
    /// at the clock's current time.
    pub fn with_clock(config: LimiterConfig, clock: C) -> Self {
        let config = config.sanitized();
        let now_ms = clock.now_ms();
        let global = TokenBucket::new(config.global_bucket(), now_ms);

        debug!(
            "Rate limiter created: global {}/{}ms cap {}, per agent {}/{}ms cap {}, threshold {}",
            config.global_refill_rate,
            config.global_refill_interval_ms,
            config.global_capacity,
            config.per_agent_refill_rate,
            config.per_agent_refill_interval_ms,
            config.per_agent_capacity,
            config.backpressure_threshold
        );

        Self {
            clock,
            agent_template: config.per_agent_bucket(),
            threshold: config.backpressure_threshold,
            config,
            global: Mutex::new(global),
            agents: RwLock::new(HashMap::new()),
            metrics: AdmissionMetrics::new(),
        }
    }

    /// The coerced configuration in effect.
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Checks whether one unit of work may go to `agent_id` now.
    pub fn check(&self, agent_id: &str) -> AdmissionResult {
        self.check_at(agent_id, self.clock.now_ms())
    }

    /// Two-stage admission at `now_ms`: global bucket first, then the destination bucket.
    ///
    /// A global denial leaves the destination bucket untouched. A destination
    /// denial refunds the global token, so a rejected request costs no global
    /// budget. The global lock is held across both stages.
    pub fn check_at(&self, agent_id: &str, now_ms: u64) -> AdmissionResult {
        let mut global = self.global.lock();

        let global_result = global.try_consume_at(now_ms);
        if !global_result.allowed {
            self.metrics.record_denied(DenyReason::GlobalRateLimit);
            debug!(
                "Admission to {:?} denied by global limit, retry after {}ms",
                agent_id, global_result.retry_after_ms
            );
            return AdmissionResult {
                allowed: false,
                agent_id: agent_id.to_string(),
                retry_after_ms: global_result.retry_after_ms,
                reason: Some(DenyReason::GlobalRateLimit),
                global: global_result,
                agent: None,
            };
        }

        let bucket = self.agent_bucket(agent_id, now_ms);
        let agent_result = bucket.lock().try_consume_at(now_ms);
        if !agent_result.allowed {
            global.refund();
            self.metrics.record_denied(DenyReason::AgentRateLimit);
            debug!(
                "Admission to {:?} denied by agent limit, retry after {}ms",
                agent_id, agent_result.retry_after_ms
            );
            return AdmissionResult {
                allowed: false,
                agent_id: agent_id.to_string(),
                retry_after_ms: agent_result.retry_after_ms,
                reason: Some(DenyReason::AgentRateLimit),
                global: BucketDecision {
                    allowed: true,
                    remaining_tokens: global.tokens(),
                    retry_after_ms: 0,
                },
                agent: Some(agent_result),
            };
        }

        self.metrics.record_allowed();
        trace!("Admission to {:?} allowed", agent_id);
        AdmissionResult {
            allowed: true,
            agent_id: agent_id.to_string(),
            retry_after_ms: 0,
            reason: None,
            global: global_result,
            agent: Some(agent_result),
        }
    }

    /// Evaluates saturation now.
    pub fn backpressure(&self) -> BackpressureStatus {
        self.backpressure_at(self.clock.now_ms())
    }

    /// Evaluates saturation across the global bucket and every tracked destination.
    ///
    /// Each bucket is refilled to `now_ms` as a side effect. A bucket whose
    /// utilization reaches `1 - threshold` raises a signal; destination
    /// signals are ordered by id. Every saturated evaluation is counted.
    pub fn backpressure_at(&self, now_ms: u64) -> BackpressureStatus {
        let saturation_line = 1.0 - self.threshold;
        let mut signals = Vec::new();

        let global_level = self.global.lock().peek_at(now_ms);
        let mut max_level = global_level.utilization();
        if max_level >= saturation_line {
            signals.push(signal(SignalSource::Global, global_level));
        }

        for (agent_id, bucket) in self.tracked_buckets() {
            let level = bucket.lock().peek_at(now_ms);
            let utilization = level.utilization();
            if utilization > max_level {
                max_level = utilization;
            }
            if utilization >= saturation_line {
                signals.push(signal(SignalSource::Agent(agent_id), level));
            }
        }

        let backpressure = max_level >= saturation_line;
        if backpressure {
            self.metrics.record_backpressure();
            debug!(
                "Backpressure at level {:.4} with {} saturated buckets",
                max_level,
                signals.len()
            );
        }

        BackpressureStatus {
            backpressure,
            level: round_level(max_level),
            signals,
        }
    }

    /// Refills and reports the global bucket level now.
    pub fn global_level(&self) -> BucketLevel {
        self.global_level_at(self.clock.now_ms())
    }

    /// Refills and reports the global bucket level at `now_ms`.
    pub fn global_level_at(&self, now_ms: u64) -> BucketLevel {
        self.global.lock().peek_at(now_ms)
    }

    /// Refills and reports a destination bucket level, without creating one.
    pub fn agent_level_at(&self, agent_id: &str, now_ms: u64) -> Option<BucketLevel> {
        let bucket = self.agents.read().get(agent_id).cloned();
        bucket.map(|bucket| bucket.lock().peek_at(now_ms))
    }

    /// Number of destinations with a live bucket.
    pub fn tracked_agents(&self) -> usize {
        self.agents.read().len()
    }

    /// Independent copy of the counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Drops every destination bucket; each comes back full on next use.
    pub fn reset_agent_buckets(&self) {
        let mut agents = self.agents.write();
        let removed = agents.len();
        agents.clear();
        info!("Reset {} agent buckets", removed);
    }

    /// Drops one destination bucket. Returns whether it was tracked.
    pub fn reset_agent_bucket(&self, agent_id: &str) -> bool {
        let removed = self.agents.write().remove(agent_id).is_some();
        if removed {
            info!("Reset agent bucket for {:?}", agent_id);
        }
        removed
    }

    /// Fetches the destination bucket, creating a full one on first use.
    fn agent_bucket(&self, agent_id: &str, now_ms: u64) -> Arc<Mutex<TokenBucket>> {
        let existing = self.agents.read().get(agent_id).cloned();
        if let Some(bucket) = existing {
            return bucket;
        }

        let mut agents = self.agents.write();
        let bucket = agents.entry(agent_id.to_string()).or_insert_with(|| {
            debug!("Tracking new agent bucket for {:?}", agent_id);
            Arc::new(Mutex::new(TokenBucket::new(self.agent_template, now_ms)))
        });
        Arc::clone(bucket)
    }

    /// Copies out the tracked buckets so the map lock is not held while peeking.
    fn tracked_buckets(&self) -> Vec<(String, Arc<Mutex<TokenBucket>>)> {
        let mut tracked: Vec<_> = self
            .agents
            .read()
            .iter()
            .map(|(agent_id, bucket)| (agent_id.clone(), Arc::clone(bucket)))
            .collect();
        tracked.sort_by(|a, b| a.0.cmp(&b.0));
        tracked
    }
}

fn signal(source: SignalSource, level: BucketLevel) -> BackpressureSignal {
    BackpressureSignal {
        source,
        utilization: level.utilization(),
        remaining_tokens: level.tokens,
        capacity: level.capacity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utility::clock::ManualClock;

    fn limiter(
        global_capacity: u64,
        per_agent_capacity: u64,
        backpressure_threshold: f64,
    ) -> RateLimiter<ManualClock> {
        let config = LimiterConfig {
            global_capacity,
            global_refill_rate: 1,
            global_refill_interval_ms: 1000,
            per_agent_capacity,
            per_agent_refill_rate: 1,
            per_agent_refill_interval_ms: 1000,
            backpressure_threshold,
        };
        RateLimiter::with_clock(config, ManualClock::new(0))
    }

    #[test]
    fn test_allows_within_limits() {
        let limiter = limiter(10, 3, 0.2);
        let result = limiter.check_at("agent:a", 0);

        assert!(result.allowed);
        assert_eq!(result.agent_id, "agent:a");
        assert_eq!(result.reason, None);
        assert_eq!(result.retry_after_ms, 0);
        assert_eq!(result.global.remaining_tokens, 9.0);
        assert_eq!(result.agent.map(|a| a.remaining_tokens), Some(2.0));
    }

    #[test]
    fn test_global_denial_does_not_touch_agent_bucket() {
        let limiter = limiter(1, 5, 0.2);
        assert!(limiter.check_at("a", 0).allowed);

        let denied = limiter.check_at("b", 0);
        assert!(!denied.allowed);
        assert_eq!(denied.reason, Some(DenyReason::GlobalRateLimit));
        assert_eq!(denied.agent, None);
        assert_eq!(denied.retry_after_ms, 1000);
        assert_eq!(limiter.agent_level_at("b", 0), None);
        assert_eq!(limiter.tracked_agents(), 1);
    }

    #[test]
    fn test_agent_denial_refunds_global_token() {
        let limiter = limiter(5, 1, 0.2);
        assert!(limiter.check_at("a", 0).allowed);
        let before = limiter.global_level_at(0).tokens;

        let denied = limiter.check_at("a", 0);
        assert!(!denied.allowed);
        assert_eq!(denied.reason, Some(DenyReason::AgentRateLimit));
        assert_eq!(denied.global.remaining_tokens, before);
        assert!(denied.global.allowed);
        assert_eq!(limiter.global_level_at(0).tokens, 4.0);
    }

    #[test]
    fn test_other_agents_unaffected_by_agent_limit() {
        let limiter = limiter(100, 2, 0.2);
        assert!(limiter.check_at("agent:a", 0).allowed);
        assert!(limiter.check_at("agent:a", 0).allowed);

        let denied = limiter.check_at("agent:a", 0);
        assert!(!denied.allowed);
        assert!(denied.retry_after_ms > 0);

        assert!(limiter.check_at("agent:b", 0).allowed);
    }

    #[test]
    fn test_late_timestamp_gets_full_retry_after() {
        let limiter = limiter(10, 1, 0.2);
        assert!(limiter.check_at("a", 0).allowed);
        assert!(limiter.check_at("a", 1000).allowed);

        // a caller whose clock read predates the last refill
        let denied = limiter.check_at("a", 400);
        assert_eq!(denied.reason, Some(DenyReason::AgentRateLimit));
        assert_eq!(denied.retry_after_ms, 1600);

        assert!(!limiter.check_at("a", 1400).allowed);
        assert!(limiter.check_at("a", 2000).allowed);
    }

    #[test]
    fn test_clock_driven_check() {
        let limiter = limiter(5, 1, 0.2);
        assert!(limiter.check("a").allowed);
        assert!(!limiter.check("a").allowed);

        limiter.clock().advance(1000);
        assert!(limiter.check("a").allowed);
    }

    #[test]
    fn test_metrics_track_decisions() {
        let limiter = limiter(2, 10, 0.2);
        limiter.check_at("agent:a", 0);
        limiter.check_at("agent:b", 0);
        limiter.check_at("agent:c", 0);

        let metrics = limiter.metrics();
        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.allowed, 2);
        assert_eq!(metrics.denied, 1);
        assert_eq!(metrics.global_denials, 1);
    }

    #[test]
    fn test_backpressure_reports_saturation() {
        let limiter = limiter(3, 5, 0.2);

        let idle = limiter.backpressure_at(0);
        assert!(!idle.backpressure);
        assert_eq!(idle.level, 0.0);
        assert!(idle.signals.is_empty());

        limiter.check_at("agent:a", 0);
        limiter.check_at("agent:b", 0);
        limiter.check_at("agent:c", 0);

        let busy = limiter.backpressure_at(0);
        assert!(busy.backpressure);
        assert_eq!(busy.level, 1.0);
        assert_eq!(busy.signals.len(), 1);
        assert_eq!(busy.signals[0].source, SignalSource::Global);
        assert_eq!(limiter.metrics().backpressure_events, 1);
    }

    #[test]
    fn test_backpressure_level_is_max_over_agents() {
        let limiter = limiter(100, 4, 0.2);
        for _ in 0..3 {
            limiter.check_at("busy", 0);
        }
        limiter.check_at("quiet", 0);

        let status = limiter.backpressure_at(0);
        assert_eq!(status.level, 0.75);
        assert!(!status.backpressure);

        limiter.check_at("busy", 0);
        let status = limiter.backpressure_at(0);
        assert!(status.backpressure);
        assert_eq!(status.level, 1.0);
        assert_eq!(
            status.signals,
            vec![BackpressureSignal {
                source: SignalSource::Agent("busy".to_string()),
                utilization: 1.0,
                remaining_tokens: 0.0,
                capacity: 4,
            }]
        );
    }

    #[test]
    fn test_backpressure_events_count_every_saturated_call() {
        let limiter = limiter(1, 1, 0.2);
        limiter.check_at("a", 0);

        limiter.backpressure_at(0);
        limiter.backpressure_at(0);
        limiter.backpressure_at(0);
        assert_eq!(limiter.metrics().backpressure_events, 3);

        // refilled buckets clear the signal
        assert!(!limiter.backpressure_at(1000).backpressure);
        assert_eq!(limiter.metrics().backpressure_events, 3);
    }

    #[test]
    fn test_backpressure_refills_tracked_buckets() {
        let limiter = limiter(10, 2, 0.2);
        limiter.check_at("a", 0);
        limiter.check_at("a", 0);

        limiter.backpressure_at(1000);
        assert_eq!(
            limiter.agent_level_at("a", 1000),
            Some(BucketLevel {
                tokens: 1.0,
                capacity: 2
            })
        );
    }

    #[test]
    fn test_reset_agent_buckets() {
        let limiter = limiter(100, 1, 0.2);
        limiter.check_at("agent:a", 0);
        assert!(!limiter.check_at("agent:a", 0).allowed);

        limiter.reset_agent_buckets();
        assert_eq!(limiter.tracked_agents(), 0);
        assert!(limiter.check_at("agent:a", 0).allowed);
    }

    #[test]
    fn test_reset_single_agent_bucket() {
        let limiter = limiter(100, 1, 0.2);
        limiter.check_at("agent:a", 0);
        limiter.check_at("agent:b", 0);

        assert!(limiter.reset_agent_bucket("agent:a"));
        assert!(!limiter.reset_agent_bucket("agent:missing"));
        assert!(limiter.check_at("agent:a", 0).allowed);
        assert!(!limiter.check_at("agent:b", 0).allowed);
    }

    #[test]
    fn test_empty_agent_id_is_a_valid_key() {
        let limiter = limiter(10, 1, 0.2);
        assert!(limiter.check_at("", 0).allowed);
        assert_eq!(
            limiter.check_at("", 0).reason,
            Some(DenyReason::AgentRateLimit)
        );
    }

    #[test]
    fn test_config_is_coerced_once() {
        let config = LimiterConfig {
            global_capacity: 0,
            per_agent_refill_rate: 0,
            backpressure_threshold: f64::NAN,
            ..LimiterConfig::default()
        };
        let limiter = RateLimiter::with_clock(config, ManualClock::new(0));

        assert_eq!(limiter.config().global_capacity, 1);
        assert_eq!(limiter.config().per_agent_refill_rate, 1);
        assert_eq!(limiter.config().backpressure_threshold, 0.2);
        assert_eq!(limiter.global_level_at(0).capacity, 1);
    }
}
