//! Point cloud preprocessing filters.
//!
//! Provides the per-frame geometric filters applied before segmentation
//! and registration.
//!
//! # Pipeline
//!
//! The typical filter chain for one frame:
//!
//! ```text
//! raw cloud → AxisRangeFilter → (wall segmentation) → StatisticalOutlierFilter → VoxelDownsampler
//! ```
//!
//! # CloudFilter Trait
//!
//! All filters implement the [`CloudFilter`] trait for a consistent interface:
//!
//! ```ignore
//! use sandhi::sensors::preprocessing::{CloudFilter, VoxelDownsampler};
//!
//! let filter = VoxelDownsampler::with_leaf_size(0.1);
//! let filtered = filter.filter(&cloud);
//! println!("Filter '{}' applied", filter.name());
//! ```

mod downsampler;
mod outlier;
mod range_filter;

pub use downsampler::{VoxelDownsampler, VoxelDownsamplerConfig};
pub use outlier::{StatisticalOutlierConfig, StatisticalOutlierFilter};
pub use range_filter::{AxisRangeFilter, AxisRangeFilterConfig};

use crate::core::types::PointCloud3D;

/// Trait for point cloud filtering operations.
pub trait CloudFilter: Send + Sync {
    /// Apply the filter to a cloud, returning a filtered cloud.
    fn filter(&self, cloud: &PointCloud3D) -> PointCloud3D;

    /// Get the name of this filter for diagnostics.
    fn name(&self) -> &'static str;
}

impl CloudFilter for AxisRangeFilter {
    fn filter(&self, cloud: &PointCloud3D) -> PointCloud3D {
        self.apply(cloud)
    }

    fn name(&self) -> &'static str {
        "AxisRangeFilter"
    }
}

impl CloudFilter for StatisticalOutlierFilter {
    fn filter(&self, cloud: &PointCloud3D) -> PointCloud3D {
        self.apply(cloud)
    }

    fn name(&self) -> &'static str {
        "StatisticalOutlierFilter"
    }
}

impl CloudFilter for VoxelDownsampler {
    fn filter(&self, cloud: &PointCloud3D) -> PointCloud3D {
        self.apply(cloud)
    }

    fn name(&self) -> &'static str {
        "VoxelDownsampler"
    }
}

/// Run a chain of filters in order, logging the point count after each.
pub fn apply_chain(filters: &[&dyn CloudFilter], cloud: PointCloud3D) -> PointCloud3D {
    filters.iter().fold(cloud, |acc, f| {
        let before = acc.len();
        let out = f.filter(&acc);
        log::debug!("{}: {} -> {} points", f.name(), before, out.len());
        out
    })
}
