//! Cloud registration module.
//!
//! Provides algorithms for aligning a frame cloud to the stitched model.
//!
//! # Algorithms
//!
//! - [`SacIaMatcher`]: Sample-consensus initial alignment on FPFH features
//!   (coarse, tolerant of large offsets)
//! - [`PointToPointIcp`]: Classic Iterative Closest Point (fine)
//! - [`RegistrationEngine`]: Coarse-then-fine pipeline that applies the
//!   result to the candidate cloud in place
//!
//! # Example
//!
//! ```ignore
//! use sandhi::algorithms::matching::{RegistrationConfig, RegistrationEngine};
//!
//! let engine = RegistrationEngine::from_config(&RegistrationConfig::default());
//! let report = engine.register(&mut frame, &model_snapshot);
//! log::debug!("{}", report);
//! ```

mod hybrid;
mod icp;
mod icp_common;
mod sac_ia;

#[cfg(test)]
pub(crate) mod test_utils;

pub use hybrid::{RegistrationConfig, RegistrationEngine, RegistrationReport, StageOutcome};
pub use icp::{IcpConfig, PointToPointIcp};
pub use icp_common::{Correspondence, correspondence_mse, find_correspondences, mse_to_score};
pub use sac_ia::{SacIaConfig, SacIaMatcher};

use nalgebra::Isometry3;

use crate::core::types::PointCloud3D;

/// Result of a registration operation.
#[derive(Debug, Clone)]
pub struct RegistrationResult {
    /// Estimated transform mapping source into the target frame.
    pub transform: Isometry3<f32>,

    /// Match quality score (0.0 = bad, 1.0 = perfect).
    pub score: f32,

    /// Whether the algorithm converged successfully.
    pub converged: bool,

    /// Number of iterations performed.
    pub iterations: u32,

    /// Mean squared error of final correspondences.
    pub mse: f32,
}

impl Default for RegistrationResult {
    fn default() -> Self {
        Self {
            transform: Isometry3::identity(),
            score: 0.0,
            converged: false,
            iterations: 0,
            mse: f32::MAX,
        }
    }
}

impl RegistrationResult {
    /// Create a failed result with identity transform.
    pub fn failed() -> Self {
        Self::default()
    }

    /// Create a successful result.
    pub fn success(transform: Isometry3<f32>, score: f32, iterations: u32, mse: f32) -> Self {
        Self {
            transform,
            score,
            converged: true,
            iterations,
            mse,
        }
    }

    /// True if the result carries a usable transform.
    pub fn has_transform(&self) -> bool {
        self.iterations > 0 && self.mse.is_finite() && self.mse < f32::MAX
    }
}

/// Trait for cloud registration algorithms.
pub trait CloudMatcher: Send + Sync {
    /// Align source cloud to target cloud.
    ///
    /// # Arguments
    ///
    /// * `source` - The cloud to be transformed
    /// * `target` - The reference cloud
    /// * `initial_guess` - Initial transform estimate (source frame → target frame)
    fn align(
        &self,
        source: &PointCloud3D,
        target: &PointCloud3D,
        initial_guess: &Isometry3<f32>,
    ) -> RegistrationResult;

    /// Name of this matcher for diagnostics.
    fn name(&self) -> &'static str;
}
