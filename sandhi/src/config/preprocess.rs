//! Frame preprocessing and wall segmentation sections.

use serde::{Deserialize, Serialize};

use crate::algorithms::segmentation::{LateralBounds, RansacPlaneConfig, WallSegmenterConfig};
use crate::core::types::Axis;
use crate::engine::{PipelineMode, PreprocessorConfig};
use crate::sensors::preprocessing::{AxisRangeFilterConfig, StatisticalOutlierConfig};

use super::defaults;

/// Per-frame preprocessing section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PreprocessSection {
    /// Depth gate axis ("x", "y" or "z")
    #[serde(default = "defaults::range_axis")]
    pub range_axis: Axis,

    /// Depth gate minimum (inclusive)
    #[serde(default = "defaults::range_min")]
    pub range_min: f32,

    /// Depth gate maximum (inclusive)
    #[serde(default)]
    pub range_max: f32,

    /// Run wall segmentation
    #[serde(default = "defaults::enabled")]
    pub segment_walls: bool,

    /// Outlier removal + downsampling after segmentation.
    /// Unset: on in stitch mode, off in cleanup mode
    #[serde(default)]
    pub post_filters: Option<bool>,

    #[serde(default = "defaults::post_outlier_neighbors")]
    pub post_outlier_neighbors: usize,

    #[serde(default = "defaults::unit")]
    pub post_outlier_std_mul: f32,

    #[serde(default = "defaults::leaf_size")]
    pub post_leaf_size: f32,
}

impl Default for PreprocessSection {
    fn default() -> Self {
        Self {
            range_axis: Axis::Z,
            range_min: -5.0,
            range_max: 0.0,
            segment_walls: true,
            post_filters: None,
            post_outlier_neighbors: 100,
            post_outlier_std_mul: 1.0,
            post_leaf_size: 0.1,
        }
    }
}

impl PreprocessSection {
    /// Convert to PreprocessorConfig
    pub fn to_preprocessor_config(
        &self,
        segmenter: &SegmenterSection,
        mode: PipelineMode,
    ) -> PreprocessorConfig {
        let post = self
            .post_filters
            .unwrap_or(mode == PipelineMode::Stitch);
        PreprocessorConfig {
            range: AxisRangeFilterConfig {
                axis: self.range_axis,
                min: self.range_min,
                max: self.range_max,
            },
            walls: self
                .segment_walls
                .then(|| segmenter.to_segmenter_config()),
            post_outlier: post.then_some(StatisticalOutlierConfig {
                neighbors: self.post_outlier_neighbors,
                std_mul: self.post_outlier_std_mul,
            }),
            post_leaf_size: post.then_some(self.post_leaf_size),
        }
    }
}

/// Wall segmenter section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmenterSection {
    /// `[min_x, mid_x, max_x, min_y, mid_y, max_y]`
    #[serde(default = "defaults::lateral_bounds")]
    pub lateral_bounds: [f32; 6],

    /// Regions and bands with fewer points are skipped
    #[serde(default = "defaults::min_points")]
    pub min_points: usize,

    #[serde(default = "defaults::segmenter_outlier_neighbors")]
    pub outlier_neighbors: usize,

    #[serde(default = "defaults::unit")]
    pub outlier_std_mul: f32,

    /// Upper z limit of the first band
    #[serde(default)]
    pub band_top: f32,

    #[serde(default = "defaults::unit")]
    pub band_width: f32,

    #[serde(default = "defaults::band_count")]
    pub band_count: usize,

    /// RANSAC inlier distance (meters)
    #[serde(default = "defaults::distance_threshold")]
    pub distance_threshold: f32,

    #[serde(default = "defaults::ransac_max_iterations")]
    pub ransac_max_iterations: usize,

    #[serde(default = "defaults::segmenter_seed")]
    pub seed: u64,
}

impl Default for SegmenterSection {
    fn default() -> Self {
        Self {
            lateral_bounds: defaults::lateral_bounds(),
            min_points: 5,
            outlier_neighbors: 50,
            outlier_std_mul: 1.0,
            band_top: 0.0,
            band_width: 1.0,
            band_count: 5,
            distance_threshold: 0.1,
            ransac_max_iterations: 1000,
            seed: defaults::segmenter_seed(),
        }
    }
}

impl SegmenterSection {
    /// Convert to WallSegmenterConfig
    pub fn to_segmenter_config(&self) -> WallSegmenterConfig {
        WallSegmenterConfig {
            bounds: LateralBounds::from_array(self.lateral_bounds),
            min_points: self.min_points,
            outlier: StatisticalOutlierConfig {
                neighbors: self.outlier_neighbors,
                std_mul: self.outlier_std_mul,
            },
            band_top: self.band_top,
            band_width: self.band_width,
            band_count: self.band_count,
            ransac: RansacPlaneConfig {
                distance_threshold: self.distance_threshold,
                max_iterations: self.ransac_max_iterations,
                ..RansacPlaneConfig::default()
            },
            seed: self.seed,
        }
    }
}
