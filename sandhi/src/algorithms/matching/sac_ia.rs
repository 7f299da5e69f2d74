//! Sample-Consensus Initial Alignment (SAC-IA).
//!
//! Coarse, feature-driven registration that tolerates large initial offsets.
//!
//! # Algorithm
//!
//! ```text
//! 1. Estimate normals and FPFH descriptors on source and target
//! 2. Score the initial guess (identity hypothesis)
//! 3. For each iteration:
//!    a. Sample N source points at least d_min apart
//!    b. For each, pick one of the k most similar target descriptors
//!    c. Solve the rigid transform from the N pairs (Kabsch)
//!    d. Score: mean over source of min(d²/τ², 1) to the nearest target
//!    e. Keep the hypothesis if its error is lower
//! 4. Return the best hypothesis (never worse than the initial guess)
//! ```

use nalgebra::Isometry3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::icp_common::mse_to_score;
use super::{CloudMatcher, RegistrationResult};
use crate::algorithms::features::{
    FpfhConfig, FpfhEstimator, FpfhSignature, NormalEstimator, NormalEstimatorConfig,
};
use crate::core::kdtree::PointIndex;
use crate::core::math::{estimate_rigid_transform, transform_point};
use crate::core::types::{Point3D, PointCloud3D};

/// Configuration for SAC-IA.
#[derive(Debug, Clone)]
pub struct SacIaConfig {
    /// Hypotheses to evaluate.
    pub max_iterations: u32,

    /// Points per hypothesis (minimum 3).
    pub samples: usize,

    /// Minimum pairwise distance between sampled source points.
    pub min_sample_distance: f32,

    /// Candidate pool size: each sample is matched to one of this many
    /// most similar target descriptors.
    pub correspondence_randomness: usize,

    /// Truncation distance τ for the hypothesis error.
    pub max_correspondence_distance: f32,

    /// Normal estimation settings.
    pub normals: NormalEstimatorConfig,

    /// Descriptor settings.
    pub features: FpfhConfig,

    /// RNG seed; the same inputs always give the same alignment.
    pub seed: u64,
}

impl Default for SacIaConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            samples: 3,
            min_sample_distance: 0.25,
            correspondence_randomness: 10,
            max_correspondence_distance: 0.5,
            normals: NormalEstimatorConfig::default(),
            features: FpfhConfig::default(),
            seed: 0x5AC1A,
        }
    }
}

/// SAC-IA coarse matcher.
#[derive(Debug, Clone, Default)]
pub struct SacIaMatcher {
    config: SacIaConfig,
}

/// Sample draws tolerated per sampled point before giving up on a hypothesis.
const MAX_SAMPLE_ATTEMPTS: usize = 100;

impl SacIaMatcher {
    pub fn new(config: SacIaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SacIaConfig {
        &self.config
    }

    fn describe(&self, cloud: &PointCloud3D) -> Vec<FpfhSignature> {
        let index = PointIndex::build(cloud);
        let normals = NormalEstimator::new(self.config.normals).estimate_with_index(cloud, &index);
        FpfhEstimator::new(self.config.features).compute_with_index(cloud, &normals, &index)
    }

    /// Mean truncated error and truncated MSE of `points` against the target.
    fn hypothesis_error(&self, points: &[Point3D], target_index: &PointIndex) -> (f32, f32) {
        if points.is_empty() {
            return (1.0, f32::MAX);
        }
        let tau2 = self.config.max_correspondence_distance.powi(2).max(f32::MIN_POSITIVE);
        let mut error = 0.0f64;
        let mut mse = 0.0f64;
        for p in points {
            let d2 = target_index.nearest(p).map_or(tau2, |(_, d2)| d2.min(tau2));
            error += (d2 / tau2) as f64;
            mse += d2 as f64;
        }
        let n = points.len() as f64;
        ((error / n) as f32, (mse / n) as f32)
    }

    /// Draw `samples` distinct feature-bearing source indices, pairwise at
    /// least `min_sample_distance` apart.
    fn select_samples(
        &self,
        source: &PointCloud3D,
        candidates: &[usize],
        rng: &mut StdRng,
    ) -> Option<Vec<usize>> {
        let min_d2 = self.config.min_sample_distance.powi(2);
        let wanted = self.config.samples.max(3);
        let mut chosen: Vec<usize> = Vec::with_capacity(wanted);

        let mut attempts = 0usize;
        while chosen.len() < wanted {
            if attempts >= MAX_SAMPLE_ATTEMPTS * wanted {
                return None;
            }
            attempts += 1;

            let idx = candidates[rng.random_range(0..candidates.len())];
            let p = &source.points[idx];
            let spread = chosen
                .iter()
                .all(|&c| c != idx && source.points[c].distance_squared(p) >= min_d2);
            if spread {
                chosen.push(idx);
            }
        }
        Some(chosen)
    }

    /// The `k` target indices whose descriptors are closest to `query`.
    fn most_similar(
        &self,
        query: &FpfhSignature,
        target_features: &[FpfhSignature],
        target_candidates: &[usize],
    ) -> Vec<usize> {
        let k = self.config.correspondence_randomness.max(1).min(target_candidates.len());
        let mut scored: Vec<(f32, usize)> = target_candidates
            .iter()
            .map(|&t| (query.distance_squared(&target_features[t]), t))
            .collect();
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, |a, b| a.0.total_cmp(&b.0));
            scored.truncate(k);
        }
        scored.into_iter().map(|(_, t)| t).collect()
    }
}

impl CloudMatcher for SacIaMatcher {
    fn align(
        &self,
        source: &PointCloud3D,
        target: &PointCloud3D,
        initial_guess: &Isometry3<f32>,
    ) -> RegistrationResult {
        let wanted = self.config.samples.max(3);
        if source.len() < wanted || target.len() < wanted {
            return RegistrationResult::failed();
        }

        let moved = source.transformed(initial_guess);
        let source_features = self.describe(&moved);
        let target_features = self.describe(target);

        let valid = |f: &[FpfhSignature]| -> Vec<usize> {
            f.iter()
                .enumerate()
                .filter(|(_, s)| !s.is_empty())
                .map(|(i, _)| i)
                .collect()
        };
        let source_candidates = valid(&source_features);
        let target_candidates = valid(&target_features);
        if source_candidates.len() < wanted || target_candidates.is_empty() {
            log::debug!(
                "SAC-IA: not enough descriptors (source {}, target {})",
                source_candidates.len(),
                target_candidates.len()
            );
            return RegistrationResult::failed();
        }

        let target_index = PointIndex::build(target);
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        // The initial guess is the baseline hypothesis
        let (base_error, base_mse) = self.hypothesis_error(&moved.points, &target_index);
        let mut best = (Isometry3::identity(), base_error, base_mse);
        let mut accepted = 0u32;

        for _ in 0..self.config.max_iterations {
            let Some(sample) = self.select_samples(&moved, &source_candidates, &mut rng) else {
                continue;
            };

            let mut src = Vec::with_capacity(sample.len());
            let mut dst = Vec::with_capacity(sample.len());
            for &s in &sample {
                let pool =
                    self.most_similar(&source_features[s], &target_features, &target_candidates);
                let t = pool[rng.random_range(0..pool.len())];
                src.push(moved.points[s]);
                dst.push(target.points[t]);
            }

            let Some(hypothesis) = estimate_rigid_transform(&src, &dst) else {
                continue;
            };

            let candidate: Vec<Point3D> = moved
                .iter()
                .map(|p| transform_point(&hypothesis, p))
                .collect();
            let (error, mse) = self.hypothesis_error(&candidate, &target_index);
            if error < best.1 {
                best = (hypothesis, error, mse);
                accepted += 1;
            }
        }

        log::debug!(
            "SAC-IA: error {:.4} -> {:.4} ({} improving hypotheses)",
            base_error,
            best.1,
            accepted
        );

        let (hypothesis, _, mse) = best;
        RegistrationResult::success(
            hypothesis * initial_guess,
            mse_to_score(mse),
            self.config.max_iterations,
            mse,
        )
    }

    fn name(&self) -> &'static str {
        "SacIa"
    }
}
