//! Sandhi - Offline multi-scan point cloud stitching
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 main / config/                      │  ← Entry point, TOML
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │               engine/ + threads/                    │  ← Orchestration
//! │  (batch, preprocessor, stitched model, scheduler)   │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                      io/                            │  ← Infrastructure
//! │          (pcd, pose-prior files, frames)            │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  algorithms/                        │  ← Core algorithms
//! │       (segmentation, features, registration)        │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   sensors/                          │  ← Cloud filters
//! │     (range gate, outlier removal, voxel grid)       │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │             (types, math, k-d tree)                 │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Pipeline
//!
//! Every frame goes through pose-prior correction, a depth gate and wall
//! segmentation, and is then merged into one shared model. Merges are
//! serialized; everything before them runs on the worker pool. In stitch
//! mode each frame is also registered (SAC-IA, then ICP) against a snapshot
//! of the model before merging.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;
pub mod utils;

// ============================================================================
// Layer 2: Cloud filters (depends on core)
// ============================================================================
pub mod sensors;

// ============================================================================
// Layer 3: Algorithms (depends on core, sensors)
// ============================================================================
pub mod algorithms;

// ============================================================================
// Layer 4: I/O infrastructure
// ============================================================================
pub mod io;

// ============================================================================
// Layer 5: Orchestration
// ============================================================================
pub mod engine;
pub mod threads;

// ============================================================================
// Cross-cutting
// ============================================================================
pub mod config;
pub mod error;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use core::math;
pub use core::types::{Axis, FrameDescriptor, FrameIndex, Point3D, PointCloud3D, TransformRecord};

// Preprocessing
pub use sensors::preprocessing::{
    AxisRangeFilter, CloudFilter, StatisticalOutlierFilter, VoxelDownsampler,
};

// Algorithms
pub use algorithms::matching::{
    CloudMatcher, IcpConfig, PointToPointIcp, RegistrationConfig, RegistrationEngine,
    RegistrationReport, SacIaConfig, SacIaMatcher,
};
pub use algorithms::segmentation::{
    LateralBounds, RansacPlaneFitter, SegmentationStats, WallSegmenter, WallSegmenterConfig,
};

// I/O
pub use io::{PosePriors, TransformRecordStore, load_pcd, save_pcd};

// Engine
pub use engine::{
    BatchConfig, BatchPipeline, BatchSummary, FramePreprocessor, InputSource, PipelineMode,
    StitchedModel, TimeBreakdown,
};
pub use threads::{BatchScheduler, FrameOutcome, FrameReport, MergeGate};

// Errors and config
pub use config::SandhiConfig;
pub use error::{Result, StitchError};
