pub mod types;

pub use types::{AdmissionMetrics, MetricsSnapshot};
