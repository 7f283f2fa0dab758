//! Millisecond clocks used to timestamp admission decisions.
//!
//! Every timestamped operation in the crate has an explicit `*_at(now_ms)`
//! form and a clock-driven form. The clock-driven forms ask a [`Clock`] for
//! the current time, so tests and simulations can inject a [`ManualClock`].

pub mod impls;
pub mod traits;
pub mod types;

pub use traits::Clock;
pub use types::{ManualClock, MonotonicClock, SystemClock};
