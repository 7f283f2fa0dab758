//! Line-oriented front end for a [`RateLimiter`](crate::admission::RateLimiter).
//!
//! Each input line is either a destination id to check or a control command
//! (`:backpressure`, `:metrics`, `:reset [id]`). Each command yields one JSON
//! document.
//!
//! Plain lines are trimmed and blank lines are skipped. To check an id that
//! is empty, padded with whitespace, or collides with a control command, send
//! `:check <id>`: everything after the first space is the id, untouched.

pub mod constants;
pub mod impls;
pub mod types;

pub use types::Command;
