//! RANSAC plane fitting.
//!
//! Samples minimal 3-point sets, builds a plane hypothesis from each, and
//! keeps the hypothesis with the most points within the distance threshold.
//! The iteration count adapts to the best inlier ratio seen so far.

use nalgebra::Vector3;
use rand::Rng;

use crate::core::types::{Point3D, PointCloud3D};
use crate::error::{Result, StitchError};

/// Plane `n · p + d = 0` with unit normal `n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneModel {
    pub normal: Vector3<f32>,
    pub d: f32,
}

impl PlaneModel {
    /// Plane through three points, `None` if they are (nearly) collinear.
    pub fn from_points(a: &Point3D, b: &Point3D, c: &Point3D) -> Option<Self> {
        let ab = b.to_vector() - a.to_vector();
        let ac = c.to_vector() - a.to_vector();
        let n = ab.cross(&ac);
        let norm = n.norm();
        if !norm.is_finite() || norm < 1e-9 {
            return None;
        }
        let normal = n / norm;
        Some(Self {
            normal,
            d: -normal.dot(&a.to_vector()),
        })
    }

    /// Absolute point-to-plane distance.
    #[inline]
    pub fn distance(&self, p: &Point3D) -> f32 {
        (self.normal.dot(&p.to_vector()) + self.d).abs()
    }
}

/// Configuration for RANSAC plane fitting.
#[derive(Clone, Debug)]
pub struct RansacPlaneConfig {
    /// Inlier distance threshold.
    /// Points closer than this to the plane are inliers.
    /// Default: 0.1
    pub distance_threshold: f32,

    /// Hard cap on the number of hypotheses.
    /// Default: 1000
    pub max_iterations: usize,

    /// Desired probability of drawing at least one outlier-free sample.
    /// Drives the adaptive iteration count.
    /// Default: 0.99
    pub probability: f64,
}

impl Default for RansacPlaneConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 0.1,
            max_iterations: 1000,
            probability: 0.99,
        }
    }
}

impl RansacPlaneConfig {
    /// Builder-style setter for the inlier threshold.
    pub fn with_distance_threshold(mut self, threshold: f32) -> Self {
        self.distance_threshold = threshold;
        self
    }

    /// Builder-style setter for maximum iterations.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }
}

/// Result of a RANSAC plane fit.
#[derive(Clone, Debug)]
pub struct PlaneFit {
    /// Best plane hypothesis
    pub model: PlaneModel,
    /// Indices of inlier points in the input cloud, ascending
    pub inliers: Vec<usize>,
    /// Hypotheses evaluated
    pub iterations: usize,
}

impl PlaneFit {
    /// Fraction of input points that are inliers.
    pub fn inlier_ratio(&self, total: usize) -> f32 {
        if total == 0 {
            0.0
        } else {
            self.inliers.len() as f32 / total as f32
        }
    }
}

/// RANSAC plane fitter.
#[derive(Clone, Debug, Default)]
pub struct RansacPlaneFitter {
    config: RansacPlaneConfig,
}

impl RansacPlaneFitter {
    pub fn new(config: RansacPlaneConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RansacPlaneConfig {
        &self.config
    }

    /// Fit a plane to `cloud`.
    ///
    /// Fails with `DegenerateGeometry` for fewer than 3 points or when no
    /// non-collinear sample could be drawn.
    pub fn fit<R: Rng + ?Sized>(&self, cloud: &PointCloud3D, rng: &mut R) -> Result<PlaneFit> {
        let n = cloud.len();
        if n < 3 {
            return Err(StitchError::DegenerateGeometry(format!(
                "plane fit needs 3 points, got {}",
                n
            )));
        }

        let threshold = self.config.distance_threshold;
        let mut best: Option<(PlaneModel, usize)> = None;
        let mut required = self.config.max_iterations as f64;
        let mut iterations = 0usize;
        // Bounds the number of collinear draws tolerated in a row
        let mut skipped = 0usize;

        while (iterations as f64) < required && iterations < self.config.max_iterations {
            let [i, j, k] = sample_three(n, rng);
            let Some(model) =
                PlaneModel::from_points(&cloud.points[i], &cloud.points[j], &cloud.points[k])
            else {
                skipped += 1;
                if skipped > self.config.max_iterations * 10 {
                    break;
                }
                continue;
            };
            iterations += 1;

            let count = cloud
                .iter()
                .filter(|p| model.distance(p) <= threshold)
                .count();

            if best.is_none_or(|(_, c)| count > c) {
                best = Some((model, count));
                required = adaptive_iterations(count, n, self.config.probability)
                    .min(self.config.max_iterations as f64);
            }
        }

        let Some((model, _)) = best else {
            return Err(StitchError::DegenerateGeometry(format!(
                "no non-collinear sample in {} points",
                n
            )));
        };

        let inliers = cloud
            .iter()
            .enumerate()
            .filter(|(_, p)| model.distance(p) <= threshold)
            .map(|(i, _)| i)
            .collect();

        Ok(PlaneFit {
            model,
            inliers,
            iterations,
        })
    }
}

/// Three distinct indices in `0..n` (requires `n >= 3`).
fn sample_three<R: Rng + ?Sized>(n: usize, rng: &mut R) -> [usize; 3] {
    let i = rng.random_range(0..n);
    let mut j = rng.random_range(0..n);
    while j == i {
        j = rng.random_range(0..n);
    }
    let mut k = rng.random_range(0..n);
    while k == i || k == j {
        k = rng.random_range(0..n);
    }
    [i, j, k]
}

/// Iterations needed to draw one all-inlier 3-sample with `probability`.
fn adaptive_iterations(inliers: usize, total: usize, probability: f64) -> f64 {
    let w = inliers as f64 / total as f64;
    let p_good = w.powi(3);
    if p_good >= 1.0 - f64::EPSILON {
        return 1.0;
    }
    if p_good <= f64::EPSILON {
        return f64::INFINITY;
    }
    (1.0 - probability).ln() / (1.0 - p_good).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Points on the plane x = 2 with slight jitter, plus scattered noise.
    fn noisy_wall(rng: &mut StdRng, on_plane: usize, noise: usize) -> PointCloud3D {
        let mut cloud = PointCloud3D::new();
        for _ in 0..on_plane {
            cloud.push_xyz(
                2.0 + rng.random_range(-0.01..0.01),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..0.0),
            );
        }
        for _ in 0..noise {
            cloud.push_xyz(
                rng.random_range(-2.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..0.0),
            );
        }
        cloud
    }

    #[test]
    fn test_finds_known_plane() {
        let mut rng = StdRng::seed_from_u64(1);
        let cloud = noisy_wall(&mut rng, 500, 100);
        let fit = RansacPlaneFitter::default().fit(&cloud, &mut rng).unwrap();

        assert_relative_eq!(fit.model.normal.x.abs(), 1.0, epsilon = 0.02);
        assert_relative_eq!(fit.model.d.abs(), 2.0, epsilon = 0.1);
        // All on-plane points are inliers, no noise point is
        assert!(fit.inliers.iter().filter(|&&i| i < 500).count() >= 490);
        assert!(fit.inliers.iter().all(|&i| i < 500));
    }

    #[test]
    fn test_inliers_sorted_ascending() {
        let mut rng = StdRng::seed_from_u64(2);
        let cloud = noisy_wall(&mut rng, 200, 50);
        let fit = RansacPlaneFitter::default().fit(&cloud, &mut rng).unwrap();
        assert!(fit.inliers.windows(2).all(|w| w[0] < w[1]));
        assert!(fit.inlier_ratio(cloud.len()) > 0.7);
    }

    #[test]
    fn test_adaptive_iterations_stop_early() {
        let mut rng = StdRng::seed_from_u64(3);
        let cloud = noisy_wall(&mut rng, 300, 0);
        let fit = RansacPlaneFitter::default().fit(&cloud, &mut rng).unwrap();
        assert!(fit.iterations < 50, "took {} iterations", fit.iterations);
    }

    #[test]
    fn test_too_few_points() {
        let mut rng = StdRng::seed_from_u64(4);
        let cloud = PointCloud3D::from_points(vec![Point3D::new(0.0, 0.0, 0.0); 2]);
        let err = RansacPlaneFitter::default().fit(&cloud, &mut rng).unwrap_err();
        assert!(matches!(err, StitchError::DegenerateGeometry(_)));
    }

    #[test]
    fn test_collinear_points_are_degenerate() {
        let mut rng = StdRng::seed_from_u64(5);
        let cloud: PointCloud3D = (0..10).map(|i| Point3D::new(i as f32, 0.0, 0.0)).collect();
        let fitter = RansacPlaneFitter::new(RansacPlaneConfig::default().with_max_iterations(20));
        assert!(fitter.fit(&cloud, &mut rng).is_err());
    }
}
