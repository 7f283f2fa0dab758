// Standard library
use std::sync::atomic::AtomicU64;
use std::time::Instant;

/// Wall clock: milliseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

/// Monotonic clock: milliseconds elapsed since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    pub origin: Instant,
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    pub millis: AtomicU64,
}
