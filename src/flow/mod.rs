//! Orchestration primitives
//!
//! - [`waterfall`] - steps in order, short-circuiting on failure or break
//! - [`map`] - one worker over a keyed collection, all keys at once
//! - [`parallel`] - independent named or positional tasks, all at once
//! - [`map_series`] - one worker over a keyed collection, one key at a time
//!
//! Each call builds its own [`Context`], drives its steps and resolves once
//! with the final diagnostic chain. Nothing is shared between calls.

pub mod context;
pub mod fan_out;
pub mod keyed;
pub mod series;
pub mod waterfall;

#[cfg(test)]
mod fan_out_tests;

pub use context::Context;
pub use fan_out::{map, parallel, task, Done, FanOutOutcome, KeyedFanOut, Parallel, Task};
pub use keyed::{Key, Keyed};
pub use series::{map_series, MapSeries};
pub use waterfall::{waterfall, Next, PipelineOutcome, Step, Waterfall};
