//! Stitching orchestration layer.
//!
//! This layer coordinates the per-frame algorithms into one batch run.
//!
//! # Contents
//!
//! - [`preprocessor`]: Per-frame pipeline (pose prior, depth gate, walls, post-filters)
//! - [`stitched_model`]: Shared merged cloud with serialized merges
//! - [`batch`]: Top-level run (discover, seed, schedule, finalize, write)
//! - [`timing`]: Stage time accounting

pub mod batch;
pub mod preprocessor;
pub mod stitched_model;
pub mod timing;

pub use batch::{BatchConfig, BatchPipeline, BatchSummary, InputSource, PipelineMode};
pub use preprocessor::{FramePreprocessor, PreprocessorConfig};
pub use stitched_model::{MergeSummary, StitchedModel, StitchedModelConfig};
pub use timing::TimeBreakdown;
