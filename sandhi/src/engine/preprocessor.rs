//! Per-frame preprocessing pipeline.
//!
//! ```text
//! raw cloud → pose-prior correction → AxisRangeFilter → WallSegmenter
//!           → (StatisticalOutlierFilter) → (VoxelDownsampler) → filtered cloud
//! ```
//!
//! The stages always run in this order. Wall segmentation and the two
//! post-filters can be switched off individually.

use crate::algorithms::segmentation::{WallSegmenter, WallSegmenterConfig};
use crate::core::types::{FrameIndex, PointCloud3D};
use crate::io::PosePriors;
use crate::sensors::preprocessing::{
    AxisRangeFilter, AxisRangeFilterConfig, CloudFilter, StatisticalOutlierConfig,
    StatisticalOutlierFilter, VoxelDownsampler, apply_chain,
};

/// Configuration for the frame preprocessor.
#[derive(Debug, Clone)]
pub struct PreprocessorConfig {
    /// Depth gate (default keeps z ∈ [-5, 0]).
    pub range: AxisRangeFilterConfig,

    /// Wall segmentation; `None` disables it.
    pub walls: Option<WallSegmenterConfig>,

    /// Outlier removal after segmentation; `None` disables it.
    pub post_outlier: Option<StatisticalOutlierConfig>,

    /// Voxel leaf size after segmentation; `None` disables it.
    pub post_leaf_size: Option<f32>,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            range: AxisRangeFilterConfig::default(),
            walls: Some(WallSegmenterConfig::default()),
            post_outlier: None,
            post_leaf_size: None,
        }
    }
}

impl PreprocessorConfig {
    /// Stitching defaults: segmentation plus outlier removal (100, 1.0) and
    /// 0.1 voxel downsampling before registration.
    pub fn stitching() -> Self {
        Self {
            post_outlier: Some(StatisticalOutlierConfig {
                neighbors: 100,
                std_mul: 1.0,
            }),
            post_leaf_size: Some(0.1),
            ..Self::default()
        }
    }
}

/// Frame preprocessor.
///
/// Holds the pose priors for the run; frames without a prior (or with an
/// all-zero one) are not moved.
#[derive(Debug, Clone)]
pub struct FramePreprocessor {
    priors: PosePriors,
    range_filter: AxisRangeFilter,
    walls: Option<WallSegmenter>,
    post_outlier: Option<StatisticalOutlierFilter>,
    downsampler: Option<VoxelDownsampler>,
}

impl FramePreprocessor {
    pub fn new(config: PreprocessorConfig, priors: PosePriors) -> Self {
        Self {
            priors,
            range_filter: AxisRangeFilter::new(config.range),
            walls: config.walls.map(WallSegmenter::new),
            post_outlier: config.post_outlier.map(StatisticalOutlierFilter::new),
            downsampler: config.post_leaf_size.map(VoxelDownsampler::with_leaf_size),
        }
    }

    pub fn priors(&self) -> &PosePriors {
        &self.priors
    }

    pub fn range_filter(&self) -> &AxisRangeFilter {
        &self.range_filter
    }

    /// Undo the frame's pose prior in place.
    ///
    /// Returns true if the cloud was moved.
    pub fn correct_pose(&self, cloud: &mut PointCloud3D, frame_index: FrameIndex) -> bool {
        match self.priors.get(frame_index) {
            Some(prior) if !prior.is_identity() => {
                cloud.transform_in_place(&prior.inverse_isometry());
                true
            }
            _ => false,
        }
    }

    /// Run the full pipeline on one frame.
    pub fn preprocess(&self, mut cloud: PointCloud3D, frame_index: FrameIndex) -> PointCloud3D {
        let input = cloud.len();
        if self.correct_pose(&mut cloud, frame_index) {
            log::debug!("Frame {}: applied pose prior", frame_index);
        }

        let mut chain: Vec<&dyn CloudFilter> = Vec::with_capacity(4);
        chain.push(&self.range_filter);
        if let Some(walls) = &self.walls {
            chain.push(walls);
        }
        if let Some(outlier) = &self.post_outlier {
            chain.push(outlier);
        }
        if let Some(downsampler) = &self.downsampler {
            chain.push(downsampler);
        }

        let cloud = apply_chain(&chain, cloud);
        log::debug!(
            "Frame {}: preprocessed {} -> {} points",
            frame_index,
            input,
            cloud.len()
        );
        cloud
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Point3D, TransformRecord};
    use approx::assert_relative_eq;

    fn grid(z: f32) -> PointCloud3D {
        let mut cloud = PointCloud3D::new();
        for i in 0..10 {
            for j in 0..10 {
                cloud.push_xyz(i as f32 * 0.1, j as f32 * 0.1, z);
            }
        }
        cloud
    }

    fn no_walls() -> PreprocessorConfig {
        PreprocessorConfig {
            walls: None,
            ..PreprocessorConfig::default()
        }
    }

    #[test]
    fn test_range_filter_only() {
        let mut cloud = grid(-1.0);
        cloud.extend_from(&grid(2.0));
        cloud.extend_from(&grid(-7.0));

        let pre = FramePreprocessor::new(no_walls(), PosePriors::new());
        let out = pre.preprocess(cloud, 1);
        assert_eq!(out.len(), 100);
        assert!(out.iter().all(|p| p.z == -1.0));
    }

    #[test]
    fn test_prior_applied_before_range_filter() {
        // Prior dz = 3 moves z = 2 down to z = -1, inside the gate
        let mut priors = PosePriors::new();
        priors.insert(4, TransformRecord::from_columns([0.0, 0.0, 0.0, 0.0, 0.0, 3.0], 1.0));
        let pre = FramePreprocessor::new(no_walls(), priors);

        let out = pre.preprocess(grid(2.0), 4);
        assert_eq!(out.len(), 100);
        assert_relative_eq!(out.points[0].z, -1.0, epsilon = 1e-6);

        // Other frames are untouched
        assert!(pre.preprocess(grid(2.0), 5).is_empty());
    }

    #[test]
    fn test_prior_rotation() {
        let mut priors = PosePriors::new();
        priors.insert(
            1,
            TransformRecord::from_columns([0.0, 0.0, std::f32::consts::FRAC_PI_2, 0.0, 0.0, 0.0], 1.0),
        );
        let pre = FramePreprocessor::new(no_walls(), priors);

        let mut cloud = PointCloud3D::from_points(vec![Point3D::new(1.0, 0.0, -1.0)]);
        assert!(pre.correct_pose(&mut cloud, 1));
        // Rz(-90°) takes +x to -y
        assert_relative_eq!(cloud.points[0].x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(cloud.points[0].y, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_post_filters_reduce_points() {
        let config = PreprocessorConfig {
            walls: None,
            post_outlier: None,
            post_leaf_size: Some(0.5),
            ..PreprocessorConfig::default()
        };
        let pre = FramePreprocessor::new(config, PosePriors::new());
        let out = pre.preprocess(grid(-1.0), 1);
        // 0.0..0.9 spans two 0.5 voxels per axis
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_stitching_config_enables_post_filters() {
        let config = PreprocessorConfig::stitching();
        assert!(config.walls.is_some());
        assert_eq!(config.post_outlier.map(|o| o.neighbors), Some(100));
        assert_eq!(config.post_leaf_size, Some(0.1));
    }
}
