// Standard library
use std::fmt;

// Current module imports
use super::constants::MIN_RETRY_AFTER_MS;
use super::functions::{
    coerce_bucket_setting, coerce_threshold, default_backpressure_threshold,
    default_global_capacity, default_global_refill_interval_ms, default_global_refill_rate,
    default_per_agent_capacity, default_per_agent_refill_interval_ms,
    default_per_agent_refill_rate,
};
use super::types::{
    BucketConfig, BucketDecision, BucketLevel, DenyReason, LimiterConfig, TokenBucket,
};

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            global_capacity: default_global_capacity(),
            global_refill_rate: default_global_refill_rate(),
            global_refill_interval_ms: default_global_refill_interval_ms(),
            per_agent_capacity: default_per_agent_capacity(),
            per_agent_refill_rate: default_per_agent_refill_rate(),
            per_agent_refill_interval_ms: default_per_agent_refill_interval_ms(),
            backpressure_threshold: default_backpressure_threshold(),
        }
    }
}

impl LimiterConfig {
    /// Returns a copy with every field forced into its usable range.
    pub fn sanitized(&self) -> Self {
        Self {
            global_capacity: coerce_bucket_setting("global_capacity", self.global_capacity),
            global_refill_rate: coerce_bucket_setting("global_refill_rate", self.global_refill_rate),
            global_refill_interval_ms: coerce_bucket_setting(
                "global_refill_interval_ms",
                self.global_refill_interval_ms,
            ),
            per_agent_capacity: coerce_bucket_setting(
                "per_agent_capacity",
                self.per_agent_capacity,
            ),
            per_agent_refill_rate: coerce_bucket_setting(
                "per_agent_refill_rate",
                self.per_agent_refill_rate,
            ),
            per_agent_refill_interval_ms: coerce_bucket_setting(
                "per_agent_refill_interval_ms",
                self.per_agent_refill_interval_ms,
            ),
            backpressure_threshold: coerce_threshold(self.backpressure_threshold),
        }
    }

    pub fn global_bucket(&self) -> BucketConfig {
        BucketConfig::new(
            self.global_capacity,
            self.global_refill_rate,
            self.global_refill_interval_ms,
        )
    }

    pub fn per_agent_bucket(&self) -> BucketConfig {
        BucketConfig::new(
            self.per_agent_capacity,
            self.per_agent_refill_rate,
            self.per_agent_refill_interval_ms,
        )
    }
}

impl BucketConfig {
    /// Builds a bucket shape, raising any zero field to 1.
    pub fn new(capacity: u64, refill_rate: u64, refill_interval_ms: u64) -> Self {
        Self {
            capacity: capacity.max(1),
            refill_rate: refill_rate.max(1),
            refill_interval_ms: refill_interval_ms.max(1),
        }
    }
}

impl TokenBucket {
    /// Creates a full bucket whose refill clock starts at `now_ms`.
    pub fn new(config: BucketConfig, now_ms: u64) -> Self {
        let config = BucketConfig::new(
            config.capacity,
            config.refill_rate,
            config.refill_interval_ms,
        );
        Self {
            config,
            tokens: config.capacity as f64,
            last_refill_at: now_ms,
        }
    }

    pub fn config(&self) -> BucketConfig {
        self.config
    }

    pub fn capacity(&self) -> u64 {
        self.config.capacity
    }

    /// Token count as of the last refill, without applying elapsed time.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Timestamp of the last applied refill interval.
    pub fn last_refill_at(&self) -> u64 {
        self.last_refill_at
    }

    /// Adds tokens for every whole refill interval elapsed since the last one.
    ///
    /// The refill clock advances by whole intervals only, so the partial
    /// interval in progress carries over to the next call. Timestamps at or
    /// before the last refill are ignored.
    pub fn refill(&mut self, now_ms: u64) {
        if now_ms <= self.last_refill_at {
            return;
        }

        let elapsed = now_ms - self.last_refill_at;
        let intervals = elapsed / self.config.refill_interval_ms;
        if intervals > 0 {
            let added = intervals.saturating_mul(self.config.refill_rate) as f64;
            self.tokens = (self.tokens + added).min(self.config.capacity as f64);
            self.last_refill_at += intervals * self.config.refill_interval_ms;
        }
    }

    /// Refills, then takes one token if one is available.
    pub fn try_consume_at(&mut self, now_ms: u64) -> BucketDecision {
        self.refill(now_ms);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return BucketDecision {
                allowed: true,
                remaining_tokens: self.tokens,
                retry_after_ms: 0,
            };
        }

        let deficit = 1.0 - self.tokens;
        let intervals_needed = (deficit / self.config.refill_rate as f64).ceil() as u64;
        // Measured from the last refill, so a timestamp older than it waits longer.
        let next_refill_at = self
            .last_refill_at
            .saturating_add(intervals_needed.saturating_mul(self.config.refill_interval_ms));
        let retry_after_ms = next_refill_at
            .saturating_sub(now_ms)
            .max(MIN_RETRY_AFTER_MS);

        BucketDecision {
            allowed: false,
            remaining_tokens: self.tokens,
            retry_after_ms,
        }
    }

    /// Refills and reports the level without consuming.
    ///
    /// This is a mutating read: the refill it applies is kept.
    pub fn peek_at(&mut self, now_ms: u64) -> BucketLevel {
        self.refill(now_ms);
        BucketLevel {
            tokens: self.tokens,
            capacity: self.config.capacity,
        }
    }

    /// Gives back one token, never exceeding capacity.
    pub fn refund(&mut self) {
        self.tokens = (self.tokens + 1.0).min(self.config.capacity as f64);
    }
}

impl BucketLevel {
    /// Fraction of capacity currently in use, in [0, 1].
    pub fn utilization(&self) -> f64 {
        1.0 - self.tokens / self.capacity as f64
    }
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::GlobalRateLimit => "global_rate_limit",
            DenyReason::AgentRateLimit => "agent_rate_limit",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(capacity: u64, refill_rate: u64, refill_interval_ms: u64) -> TokenBucket {
        TokenBucket::new(
            BucketConfig::new(capacity, refill_rate, refill_interval_ms),
            0,
        )
    }

    #[test]
    fn test_bucket_starts_full() {
        let mut bucket = bucket(5, 1, 1000);
        assert_eq!(bucket.tokens(), 5.0);
        assert_eq!(bucket.peek_at(0), BucketLevel { tokens: 5.0, capacity: 5 });
    }

    #[test]
    fn test_bucket_allows_up_to_capacity() {
        let mut bucket = bucket(3, 1, 1000);
        assert!(bucket.try_consume_at(0).allowed);
        assert!(bucket.try_consume_at(0).allowed);
        assert!(bucket.try_consume_at(0).allowed);
        assert!(!bucket.try_consume_at(0).allowed);
    }

    #[test]
    fn test_single_token_bucket_retry_after() {
        let mut bucket = bucket(1, 1, 1000);

        let first = bucket.try_consume_at(0);
        assert!(first.allowed);
        assert_eq!(first.remaining_tokens, 0.0);
        assert_eq!(first.retry_after_ms, 0);

        let second = bucket.try_consume_at(500);
        assert!(!second.allowed);
        assert_eq!(second.retry_after_ms, 500);

        assert!(bucket.try_consume_at(1000).allowed);
    }

    #[test]
    fn test_refill_keeps_partial_interval() {
        let mut bucket = bucket(2, 1, 500);
        bucket.try_consume_at(0);
        bucket.try_consume_at(0);

        // 1.2 intervals: one token, clock advanced to 500 not 600
        bucket.refill(600);
        assert_eq!(bucket.tokens(), 1.0);
        assert_eq!(bucket.last_refill_at(), 500);

        // the 100ms carried over completes the next interval at 1000
        bucket.refill(1000);
        assert_eq!(bucket.tokens(), 2.0);
        assert_eq!(bucket.last_refill_at(), 1000);
    }

    #[test]
    fn test_refill_is_capped_at_capacity() {
        let mut bucket = bucket(4, 3, 100);
        bucket.try_consume_at(0);
        bucket.refill(10_000);
        assert_eq!(bucket.tokens(), 4.0);
    }

    #[test]
    fn test_refill_ignores_stale_timestamps() {
        let mut bucket = TokenBucket::new(BucketConfig::new(2, 1, 100), 1_000);
        bucket.try_consume_at(1_000);

        bucket.refill(900);
        bucket.refill(1_000);
        assert_eq!(bucket.tokens(), 1.0);
        assert_eq!(bucket.last_refill_at(), 1_000);
    }

    #[test]
    fn test_retry_after_covers_several_intervals() {
        let mut bucket = bucket(1, 1, 200);
        bucket.try_consume_at(0);

        let denied = bucket.try_consume_at(50);
        assert_eq!(denied.retry_after_ms, 150);

        let denied = bucket.try_consume_at(199);
        assert_eq!(denied.retry_after_ms, 1);
    }

    #[test]
    fn test_retry_after_from_timestamp_before_last_refill() {
        let mut bucket = bucket(1, 1, 1000);
        assert!(bucket.try_consume_at(0).allowed);
        assert!(bucket.try_consume_at(1000).allowed);

        let denied = bucket.try_consume_at(500);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_ms, 1500);

        // the advised wait lands exactly on the next refill
        assert!(!bucket.try_consume_at(1999).allowed);
        assert!(bucket.try_consume_at(500 + denied.retry_after_ms).allowed);
    }

    #[test]
    fn test_peek_applies_refill() {
        let mut bucket = bucket(2, 1, 1000);
        bucket.try_consume_at(0);
        bucket.try_consume_at(0);

        assert_eq!(bucket.peek_at(1000).tokens, 1.0);
        assert_eq!(bucket.last_refill_at(), 1000);
        assert_eq!(bucket.peek_at(1000).tokens, 1.0);
    }

    #[test]
    fn test_refund_is_capped() {
        let mut bucket = bucket(2, 1, 1000);
        bucket.refund();
        assert_eq!(bucket.tokens(), 2.0);

        bucket.try_consume_at(0);
        bucket.refund();
        assert_eq!(bucket.tokens(), 2.0);
    }

    #[test]
    fn test_zero_settings_are_raised() {
        let config = BucketConfig::new(0, 0, 0);
        assert_eq!(
            config,
            BucketConfig {
                capacity: 1,
                refill_rate: 1,
                refill_interval_ms: 1
            }
        );
    }

    #[test]
    fn test_limiter_config_sanitized() {
        let config = LimiterConfig {
            global_capacity: 0,
            per_agent_refill_interval_ms: 0,
            backpressure_threshold: 7.0,
            ..LimiterConfig::default()
        };

        let sanitized = config.sanitized();
        assert_eq!(sanitized.global_capacity, 1);
        assert_eq!(sanitized.per_agent_refill_interval_ms, 1);
        assert_eq!(sanitized.backpressure_threshold, 1.0);
        assert_eq!(sanitized.global_refill_rate, 10);
    }

    #[test]
    fn test_utilization() {
        assert_eq!(BucketLevel { tokens: 5.0, capacity: 5 }.utilization(), 0.0);
        assert_eq!(BucketLevel { tokens: 0.0, capacity: 5 }.utilization(), 1.0);
        assert_eq!(BucketLevel { tokens: 1.0, capacity: 4 }.utilization(), 0.75);
    }

    #[test]
    fn test_deny_reason_names() {
        assert_eq!(DenyReason::GlobalRateLimit.to_string(), "global_rate_limit");
        assert_eq!(DenyReason::AgentRateLimit.to_string(), "agent_rate_limit");
    }
}
