//! Planar segmentation.
//!
//! - [`RansacPlaneFitter`]: single-plane RANSAC returning inlier indices
//! - [`WallSegmenter`]: four-region, banded wall extraction built on it

mod plane;
mod walls;

pub use plane::{PlaneFit, PlaneModel, RansacPlaneConfig, RansacPlaneFitter};
pub use walls::{
    LateralBounds, SegmentationStats, WallRegion, WallSegmenter, WallSegmenterConfig,
};
