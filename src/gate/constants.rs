/// Marks a control command on an input line
pub const COMMAND_PREFIX: char = ':';

/// Checks the rest of the line as a verbatim destination id
pub const CHECK_COMMAND: &str = "check";

pub const BACKPRESSURE_COMMAND: &str = "backpressure";
pub const METRICS_COMMAND: &str = "metrics";
pub const RESET_COMMAND: &str = "reset";
