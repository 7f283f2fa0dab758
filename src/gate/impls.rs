// 3rd party crates
use serde_json::{json, Value};
use tracing::debug;

// Project imports
use crate::admission::RateLimiter;
use crate::utility::clock::Clock;

// Current module imports
use super::constants::{
    BACKPRESSURE_COMMAND, CHECK_COMMAND, COMMAND_PREFIX, METRICS_COMMAND, RESET_COMMAND,
};
use super::types::Command;

impl Command {
    /// Parses one input line. Blank lines yield `None`.
    ///
    /// Plain lines are trimmed. `:check <id>` takes everything after the
    /// single space verbatim, so empty ids, padded ids and ids that look like
    /// control commands can still be checked. Any other line starting with
    /// `:` is a control command; an unknown control word is a destination id.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
        if let Some(agent_id) = raw_check_argument(line) {
            return Some(Command::Check(agent_id.to_string()));
        }

        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let Some(control) = line.strip_prefix(COMMAND_PREFIX) else {
            return Some(Command::Check(line.to_string()));
        };

        let mut parts = control.splitn(2, char::is_whitespace);
        let word = parts.next().unwrap_or_default();
        let argument = parts.next().map(str::trim).filter(|arg| !arg.is_empty());

        let command = match (word, argument) {
            (BACKPRESSURE_COMMAND, None) => Command::Backpressure,
            (METRICS_COMMAND, None) => Command::Metrics,
            (RESET_COMMAND, agent_id) => Command::Reset(agent_id.map(str::to_string)),
            _ => Command::Check(line.to_string()),
        };
        Some(command)
    }

    /// Runs the command against `limiter` and renders the response document.
    pub fn execute<C: Clock>(&self, limiter: &RateLimiter<C>) -> Result<Value, serde_json::Error> {
        debug!("Executing {:?}", self);
        match self {
            Command::Check(agent_id) => serde_json::to_value(limiter.check(agent_id)),
            Command::Backpressure => serde_json::to_value(limiter.backpressure()),
            Command::Metrics => serde_json::to_value(limiter.metrics()),
            Command::Reset(None) => {
                limiter.reset_agent_buckets();
                Ok(json!({ "reset": "all" }))
            }
            Command::Reset(Some(agent_id)) => {
                let tracked = limiter.reset_agent_bucket(agent_id);
                Ok(json!({ "reset": agent_id, "tracked": tracked }))
            }
        }
    }
}

/// Returns the verbatim id of a `:check` line: empty for a bare `:check`.
fn raw_check_argument(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix(COMMAND_PREFIX)?
        .strip_prefix(CHECK_COMMAND)?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.strip_prefix(' ')
}
