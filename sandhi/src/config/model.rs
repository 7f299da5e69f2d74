//! Stitched model and scheduler sections.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{PipelineMode, StitchedModelConfig};
use crate::sensors::preprocessing::StatisticalOutlierConfig;
use crate::threads::SchedulerConfig;

use super::defaults;

/// Stitched model section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelSection {
    /// "cleanup" or "stitch"
    #[serde(default)]
    pub mode: PipelineMode,

    /// Downsample the merged cloud after every merge
    #[serde(default = "defaults::enabled")]
    pub merge_downsample: bool,

    #[serde(default = "defaults::leaf_size")]
    pub merge_leaf_size: f32,

    #[serde(default = "defaults::leaf_size")]
    pub final_leaf_size: f32,

    /// Outlier removal on the seed frame (stitch mode)
    #[serde(default = "defaults::post_outlier_neighbors")]
    pub seed_outlier_neighbors: usize,

    #[serde(default = "defaults::seed_outlier_std_mul")]
    pub seed_outlier_std_mul: f32,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            mode: PipelineMode::default(),
            merge_downsample: true,
            merge_leaf_size: 0.1,
            final_leaf_size: 0.1,
            seed_outlier_neighbors: 100,
            seed_outlier_std_mul: 2.0,
        }
    }
}

impl ModelSection {
    /// Convert to StitchedModelConfig
    pub fn to_model_config(&self) -> StitchedModelConfig {
        StitchedModelConfig {
            merge_leaf_size: self.merge_downsample.then_some(self.merge_leaf_size),
            final_leaf_size: self.final_leaf_size,
            seed_outlier: StatisticalOutlierConfig {
                neighbors: self.seed_outlier_neighbors,
                std_mul: self.seed_outlier_std_mul,
            },
        }
    }
}

/// Worker pool section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchedulerSection {
    /// Concurrent workers
    #[serde(default = "defaults::workers")]
    pub workers: usize,

    /// Task queue capacity (default: twice the workers)
    #[serde(default)]
    pub queue_capacity: Option<usize>,

    /// Per-frame time limit in seconds (default: none)
    #[serde(default)]
    pub frame_timeout_secs: Option<f64>,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: None,
            frame_timeout_secs: None,
        }
    }
}

impl SchedulerSection {
    /// Convert to SchedulerConfig
    ///
    /// Call after validation; a non-positive timeout is treated as none.
    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            frame_timeout: self
                .frame_timeout_secs
                .and_then(|s| Duration::try_from_secs_f64(s).ok())
                .filter(|d| !d.is_zero()),
        }
    }
}
