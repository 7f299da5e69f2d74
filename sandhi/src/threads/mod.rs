//! Worker threads for batch stitching.
//!
//! - [`BatchScheduler`]: bounded task queue served by `stitch-N` workers
//! - [`MergeGate`]: one-shot merge/cancel decision for per-frame timeouts

mod gate;
mod scheduler;

pub use gate::{GateState, MergeGate};
pub use scheduler::{BatchScheduler, FrameOutcome, FrameReport, SchedulerConfig};
