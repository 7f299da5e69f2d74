//! Pass-through filter along one axis.
//!
//! Keeps points whose coordinate on the configured axis lies in an inclusive
//! range. Used as the depth gate (z by default) before segmentation.

use crate::core::types::{Axis, PointCloud3D};

/// Configuration for axis range filtering.
#[derive(Debug, Clone, Copy)]
pub struct AxisRangeFilterConfig {
    /// Axis to gate on.
    ///
    /// Default: z (sensor depth)
    pub axis: Axis,

    /// Minimum kept coordinate (inclusive).
    ///
    /// Default: -5.0
    pub min: f32,

    /// Maximum kept coordinate (inclusive).
    ///
    /// Default: 0.0
    pub max: f32,
}

impl Default for AxisRangeFilterConfig {
    fn default() -> Self {
        Self {
            axis: Axis::Z,
            min: -5.0,
            max: 0.0,
        }
    }
}

/// Axis range filter for removing points outside the working volume.
///
/// Filters out:
/// - Points with the axis coordinate below `min` or above `max`
/// - NaN coordinates on the gated axis
#[derive(Debug, Clone)]
pub struct AxisRangeFilter {
    config: AxisRangeFilterConfig,
}

impl AxisRangeFilter {
    /// Create a new range filter with the given configuration.
    pub fn new(config: AxisRangeFilterConfig) -> Self {
        Self { config }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &AxisRangeFilterConfig {
        &self.config
    }

    /// Apply range filtering, returning a new cloud.
    pub fn apply(&self, cloud: &PointCloud3D) -> PointCloud3D {
        cloud.filtered_by_axis(self.config.axis, self.config.min, self.config.max)
    }
}

impl Default for AxisRangeFilter {
    fn default() -> Self {
        Self::new(AxisRangeFilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth_column() -> PointCloud3D {
        let mut cloud = PointCloud3D::new();
        for z in [-6.0, -5.0, -2.5, 0.0, 0.5, f32::NAN] {
            cloud.push_xyz(0.0, 0.0, z);
        }
        cloud
    }

    #[test]
    fn test_default_depth_gate_is_inclusive() {
        let filtered = AxisRangeFilter::default().apply(&depth_column());
        let zs: Vec<f32> = filtered.iter().map(|p| p.z).collect();
        assert_eq!(zs, vec![-5.0, -2.5, 0.0]);
    }

    #[test]
    fn test_other_axis() {
        let mut cloud = PointCloud3D::new();
        cloud.push_xyz(-1.0, 0.0, 0.0);
        cloud.push_xyz(1.0, 0.0, 0.0);
        let filter = AxisRangeFilter::new(AxisRangeFilterConfig {
            axis: Axis::X,
            min: 0.0,
            max: 2.0,
        });
        let filtered = filter.apply(&cloud);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.points[0].x, 1.0);
    }

    #[test]
    fn test_empty_cloud() {
        assert!(AxisRangeFilter::default().apply(&PointCloud3D::new()).is_empty());
    }
}
