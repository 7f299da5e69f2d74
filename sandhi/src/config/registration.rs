//! Coarse+fine registration section.

use serde::{Deserialize, Serialize};

use crate::algorithms::features::{FpfhConfig, NormalEstimatorConfig};
use crate::algorithms::matching::{IcpConfig, RegistrationConfig, SacIaConfig};

use super::defaults;

/// Registration settings section (stitch mode only)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistrationSection {
    /// Iteration cap for both stages
    #[serde(default = "defaults::registration_iterations")]
    pub max_iterations: u32,

    /// Stages are skipped below this many points
    #[serde(default = "defaults::registration_min_points")]
    pub min_points: usize,

    /// PCA normal neighbourhood
    #[serde(default = "defaults::normal_neighbors")]
    pub normal_neighbors: usize,

    /// FPFH neighbourhood
    #[serde(default = "defaults::feature_neighbors")]
    pub feature_neighbors: usize,

    /// SAC-IA points per hypothesis
    #[serde(default = "defaults::samples")]
    pub samples: usize,

    /// Minimum spacing of SAC-IA sample points (meters)
    #[serde(default = "defaults::min_sample_distance")]
    pub min_sample_distance: f32,

    /// Candidates drawn from per sampled feature
    #[serde(default = "defaults::correspondence_randomness")]
    pub correspondence_randomness: usize,

    /// SAC-IA error truncation distance (meters)
    #[serde(default = "defaults::max_correspondence_distance")]
    pub coarse_max_correspondence_distance: f32,

    /// ICP correspondence rejection distance (meters)
    #[serde(default = "defaults::max_correspondence_distance")]
    pub fine_max_correspondence_distance: f32,

    /// Fraction of worst ICP correspondences dropped
    #[serde(default = "defaults::outlier_ratio")]
    pub outlier_ratio: f32,

    #[serde(default = "defaults::epsilon")]
    pub translation_epsilon: f32,

    #[serde(default = "defaults::epsilon")]
    pub rotation_epsilon: f32,

    #[serde(default = "defaults::registration_min_points")]
    pub min_correspondences: usize,

    /// SAC-IA sampling seed
    #[serde(default = "defaults::registration_seed")]
    pub seed: u64,
}

impl Default for RegistrationSection {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            min_points: 10,
            normal_neighbors: 30,
            feature_neighbors: 60,
            samples: 3,
            min_sample_distance: 0.25,
            correspondence_randomness: 10,
            coarse_max_correspondence_distance: 0.5,
            fine_max_correspondence_distance: 0.5,
            outlier_ratio: 0.1,
            translation_epsilon: 0.001,
            rotation_epsilon: 0.001,
            min_correspondences: 10,
            seed: defaults::registration_seed(),
        }
    }
}

impl RegistrationSection {
    /// Convert to RegistrationConfig
    pub fn to_registration_config(&self) -> RegistrationConfig {
        RegistrationConfig {
            max_iterations: self.max_iterations,
            min_points: self.min_points,
            coarse: SacIaConfig {
                max_iterations: self.max_iterations,
                samples: self.samples,
                min_sample_distance: self.min_sample_distance,
                correspondence_randomness: self.correspondence_randomness,
                max_correspondence_distance: self.coarse_max_correspondence_distance,
                normals: NormalEstimatorConfig {
                    neighbors: self.normal_neighbors,
                    ..NormalEstimatorConfig::default()
                },
                features: FpfhConfig {
                    neighbors: self.feature_neighbors,
                },
                seed: self.seed,
            },
            fine: IcpConfig {
                max_iterations: self.max_iterations,
                translation_epsilon: self.translation_epsilon,
                rotation_epsilon: self.rotation_epsilon,
                max_correspondence_distance: self.fine_max_correspondence_distance,
                min_correspondences: self.min_correspondences,
                outlier_ratio: self.outlier_ratio,
            },
        }
    }
}
