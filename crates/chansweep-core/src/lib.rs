//! Foundational helpers shared across chansweep crates.
//!
//! Provides workspace-timestamp parsing, staleness-cutoff math, and the
//! atomic file writes the on-disk stores rely on.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use time_utils::{humanize_age, lookback_cutoff, parse_message_ts};
