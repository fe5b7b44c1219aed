//! Output
//!
//! Population statistics, sampled from the world and written as JSONL.

pub mod stats;

pub use stats::{StatsWriter, TickStats};
