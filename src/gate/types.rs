/// One line of input to the admission gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask for admission to a destination.
    Check(String),
    Backpressure,
    Metrics,
    /// Reset one destination bucket, or all of them when `None`.
    Reset(Option<String>),
}
