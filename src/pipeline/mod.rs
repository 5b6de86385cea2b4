//! Pipeline entry points for the bounty watcher.
//!
//! - `DiffCalculator`: compare a snapshot with stored state
//! - `Cycle`: fetch, diff, persist and notify once
//! - `Monitor`: repeat cycles on a fixed interval

pub mod cycle;
pub mod diff;
pub mod monitor;

pub use cycle::{Cycle, CycleReport};
pub use diff::{DiffCalculator, DiffResult, calculate_diff, link_difference};
pub use monitor::Monitor;
