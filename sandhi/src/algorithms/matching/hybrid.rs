//! Coarse-then-fine registration engine.
//!
//! Combines:
//! 1. A coarse matcher for handling large initial offsets (SAC-IA)
//! 2. A fine matcher for accurate refinement (ICP)
//!
//! The combined transform is applied to the candidate cloud in place.

use std::fmt;

use nalgebra::Isometry3;

use super::{
    CloudMatcher, IcpConfig, PointToPointIcp, RegistrationResult, SacIaConfig, SacIaMatcher,
};
use crate::core::math::transform_magnitude;
use crate::core::types::PointCloud3D;

/// Configuration for the registration engine.
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    /// Iteration cap applied to both stages.
    ///
    /// Default: 10
    pub max_iterations: u32,

    /// A stage is skipped when either cloud has fewer points than this.
    ///
    /// Default: 10
    pub min_points: usize,

    /// Coarse stage settings (its `max_iterations` is overridden).
    pub coarse: SacIaConfig,

    /// Fine stage settings (its `max_iterations` is overridden).
    pub fine: IcpConfig,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            min_points: 10,
            coarse: SacIaConfig::default(),
            fine: IcpConfig::default(),
        }
    }
}

/// What happened in one registration stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageOutcome {
    /// Converged; the transform was applied.
    Applied { mse: f32, iterations: u32 },
    /// Hit the iteration cap; the best transform seen was still applied.
    NotConverged { mse: f32, iterations: u32 },
    /// Stage ran but produced no usable transform.
    Failed,
    /// Stage did not run.
    Skipped(&'static str),
}

impl StageOutcome {
    fn from_result(result: &RegistrationResult) -> Self {
        if !result.has_transform() {
            StageOutcome::Failed
        } else if result.converged {
            StageOutcome::Applied {
                mse: result.mse,
                iterations: result.iterations,
            }
        } else {
            StageOutcome::NotConverged {
                mse: result.mse,
                iterations: result.iterations,
            }
        }
    }

    /// True if this stage contributed to the final transform.
    pub fn contributed(&self) -> bool {
        matches!(
            self,
            StageOutcome::Applied { .. } | StageOutcome::NotConverged { .. }
        )
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageOutcome::Applied { mse, iterations } => {
                write!(f, "applied (mse {:.5}, {} iters)", mse, iterations)
            }
            StageOutcome::NotConverged { mse, iterations } => {
                write!(f, "not converged (mse {:.5}, {} iters)", mse, iterations)
            }
            StageOutcome::Failed => write!(f, "failed"),
            StageOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

/// Result of registering one candidate cloud.
#[derive(Debug, Clone)]
pub struct RegistrationReport {
    pub coarse: StageOutcome,
    pub fine: StageOutcome,
    /// Transform applied to the candidate (identity if nothing ran).
    pub transform: Isometry3<f32>,
}

impl Default for RegistrationReport {
    fn default() -> Self {
        Self {
            coarse: StageOutcome::Skipped("not run"),
            fine: StageOutcome::Skipped("not run"),
            transform: Isometry3::identity(),
        }
    }
}

impl fmt::Display for RegistrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (t, r) = transform_magnitude(&self.transform);
        write!(
            f,
            "coarse {}, fine {}, moved {:.3}m / {:.2}°",
            self.coarse,
            self.fine,
            t,
            r.to_degrees()
        )
    }
}

/// Coarse-then-fine registration of a candidate cloud onto a target.
///
/// # Type Parameters
///
/// * `C` - Coarse matcher type (e.g., `SacIaMatcher`)
/// * `F` - Fine matcher type (e.g., `PointToPointIcp`)
#[derive(Debug)]
pub struct RegistrationEngine<C: CloudMatcher, F: CloudMatcher> {
    coarse: C,
    fine: F,
    min_points: usize,
}

impl RegistrationEngine<SacIaMatcher, PointToPointIcp> {
    /// Build the default SAC-IA + ICP engine.
    pub fn from_config(config: &RegistrationConfig) -> Self {
        let coarse = SacIaConfig {
            max_iterations: config.max_iterations,
            ..config.coarse.clone()
        };
        let fine = IcpConfig {
            max_iterations: config.max_iterations,
            ..config.fine.clone()
        };
        Self::new(
            SacIaMatcher::new(coarse),
            PointToPointIcp::new(fine),
            config.min_points,
        )
    }
}

impl<C: CloudMatcher, F: CloudMatcher> RegistrationEngine<C, F> {
    /// Create a new engine.
    ///
    /// # Arguments
    ///
    /// * `coarse` - Matcher for large initial offsets
    /// * `fine` - Matcher for accurate refinement
    /// * `min_points` - Minimum cloud size for a stage to run
    pub fn new(coarse: C, fine: F, min_points: usize) -> Self {
        Self {
            coarse,
            fine,
            min_points,
        }
    }

    /// Align `candidate` onto `target` and transform it in place.
    ///
    /// Never fails: stages that cannot run are skipped, and the candidate is
    /// left with whatever transform the remaining stages produced.
    pub fn register(
        &self,
        candidate: &mut PointCloud3D,
        target: &PointCloud3D,
    ) -> RegistrationReport {
        let mut report = RegistrationReport::default();

        if candidate.len() < self.min_points || target.len() < self.min_points {
            report.coarse = StageOutcome::Skipped("too few points");
            report.fine = StageOutcome::Skipped("too few points");
            log::debug!(
                "Registration skipped: candidate {} / target {} points (min {})",
                candidate.len(),
                target.len(),
                self.min_points
            );
            return report;
        }

        let mut estimate = Isometry3::identity();

        let coarse = self.coarse.align(candidate, target, &estimate);
        report.coarse = StageOutcome::from_result(&coarse);
        if report.coarse.contributed() {
            estimate = coarse.transform;
        }

        let fine = self.fine.align(candidate, target, &estimate);
        report.fine = StageOutcome::from_result(&fine);
        if report.fine.contributed() {
            estimate = fine.transform;
        }

        if report.coarse.contributed() || report.fine.contributed() {
            candidate.transform_in_place(&estimate);
        }
        report.transform = estimate;

        log::debug!(
            "{} + {}: {}",
            self.coarse.name(),
            self.fine.name(),
            report
        );
        report
    }
}
