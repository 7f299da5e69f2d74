//! Point-to-Point Iterative Closest Point (ICP) algorithm.
//!
//! Classic ICP algorithm for aligning two point clouds by iteratively:
//! 1. Finding nearest neighbor correspondences
//! 2. Computing optimal rigid transform
//! 3. Applying transform and repeating until convergence
//!
//! # Algorithm
//!
//! ```text
//! Input: Source cloud S, Target cloud T, Initial guess T₀
//! Output: Transform T* that aligns S to T
//!
//! 1. Transform S by T₀ to get S'
//! 2. For each iteration:
//!    a. Find nearest neighbor in T for each point in S'
//!    b. Reject pairs beyond max distance, trim the worst fraction
//!    c. Compute optimal transform ΔT using SVD (Kabsch)
//!    d. Apply ΔT: T* = ΔT · T*
//!    e. If ΔT < threshold, converged
//! 3. Return the lowest-error transform seen
//! ```

use nalgebra::Isometry3;

use super::icp_common::{correspondence_mse, find_correspondences, mse_to_score};
use super::{CloudMatcher, RegistrationResult};
use crate::core::kdtree::PointIndex;
use crate::core::math::{estimate_rigid_transform, transform_magnitude, transform_point};
use crate::core::types::{Point3D, PointCloud3D};

/// Configuration for Point-to-Point ICP.
#[derive(Debug, Clone)]
pub struct IcpConfig {
    /// Maximum number of iterations.
    pub max_iterations: u32,

    /// Convergence threshold for translation.
    ///
    /// If the translation component of the incremental transform
    /// is below this, consider converged.
    pub translation_epsilon: f32,

    /// Convergence threshold for rotation (radians).
    pub rotation_epsilon: f32,

    /// Maximum correspondence distance.
    ///
    /// Point pairs farther than this are rejected as outliers.
    pub max_correspondence_distance: f32,

    /// Minimum number of valid correspondences required.
    ///
    /// If fewer correspondences are found, the match fails.
    pub min_correspondences: usize,

    /// Outlier rejection ratio (0.0 to 1.0).
    ///
    /// After computing correspondences, reject this fraction
    /// of the worst (largest distance) correspondences.
    pub outlier_ratio: f32,
}

impl Default for IcpConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            translation_epsilon: 0.001,       // 1mm
            rotation_epsilon: 0.001,          // ~0.06°
            max_correspondence_distance: 0.5, // 50cm
            min_correspondences: 10,
            outlier_ratio: 0.1, // Reject worst 10%
        }
    }
}

/// Point-to-Point ICP matcher.
///
/// Uses a k-d tree for nearest neighbor queries.
/// Suitable for small initial errors (well under the correspondence distance).
#[derive(Debug, Clone, Default)]
pub struct PointToPointIcp {
    config: IcpConfig,
}

impl PointToPointIcp {
    /// Create a new ICP matcher with the given configuration.
    pub fn new(config: IcpConfig) -> Self {
        Self { config }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &IcpConfig {
        &self.config
    }

    fn transformed(source: &PointCloud3D, transform: &Isometry3<f32>) -> Vec<Point3D> {
        source.iter().map(|p| transform_point(transform, p)).collect()
    }
}

impl CloudMatcher for PointToPointIcp {
    fn align(
        &self,
        source: &PointCloud3D,
        target: &PointCloud3D,
        initial_guess: &Isometry3<f32>,
    ) -> RegistrationResult {
        // Check for empty point clouds
        if source.is_empty() || target.is_empty() {
            return RegistrationResult::failed();
        }

        let target_index = PointIndex::build(target);

        let mut current = *initial_guess;
        let mut best: Option<(Isometry3<f32>, f32)> = None;
        let mut iterations = 0u32;
        let mut converged = false;

        for iter in 0..self.config.max_iterations {
            iterations = iter + 1;

            let moved = Self::transformed(source, &current);
            let correspondences = find_correspondences(
                &moved,
                &target_index,
                self.config.max_correspondence_distance,
                self.config.outlier_ratio,
                self.config.min_correspondences,
            );

            if correspondences.len() < self.config.min_correspondences {
                log::debug!(
                    "ICP: {} correspondences < {} at iteration {}",
                    correspondences.len(),
                    self.config.min_correspondences,
                    iterations
                );
                break;
            }

            // Error of the current estimate
            let mse = correspondence_mse(&correspondences);
            if best.is_none_or(|(_, m)| mse < m) {
                best = Some((current, mse));
            }

            let src: Vec<Point3D> = correspondences.iter().map(|c| moved[c.source]).collect();
            let dst: Vec<Point3D> = correspondences
                .iter()
                .map(|c| target.points[c.target])
                .collect();

            let Some(delta) = estimate_rigid_transform(&src, &dst) else {
                break;
            };

            current = delta * current;

            let (translation_change, rotation_change) = transform_magnitude(&delta);
            if translation_change < self.config.translation_epsilon
                && rotation_change < self.config.rotation_epsilon
            {
                converged = true;
                break;
            }
        }

        // Score the final estimate as well
        let moved = Self::transformed(source, &current);
        let final_corr = find_correspondences(
            &moved,
            &target_index,
            self.config.max_correspondence_distance,
            self.config.outlier_ratio,
            self.config.min_correspondences,
        );
        if final_corr.len() >= self.config.min_correspondences {
            let mse = correspondence_mse(&final_corr);
            if best.is_none_or(|(_, m)| mse <= m) {
                best = Some((current, mse));
            }
        }

        let Some((transform, mse)) = best else {
            return RegistrationResult::failed();
        };
        let score = mse_to_score(mse);

        if converged {
            RegistrationResult::success(transform, score, iterations, mse)
        } else {
            RegistrationResult {
                transform,
                score,
                converged: false,
                iterations,
                mse,
            }
        }
    }

    fn name(&self) -> &'static str {
        "PointToPointIcp"
    }
}
