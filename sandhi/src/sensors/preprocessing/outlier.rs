//! Statistical outlier removal for point clouds.
//!
//! Removes isolated noise points using the distribution of mean
//! nearest-neighbour distances across the whole cloud.

use crate::core::kdtree::PointIndex;
use crate::core::types::PointCloud3D;
use crate::utils::mean_std_dev;

/// Configuration for statistical outlier filtering.
#[derive(Debug, Clone, Copy)]
pub struct StatisticalOutlierConfig {
    /// Number of nearest neighbours used for each point's mean distance.
    ///
    /// The point itself is not counted.
    /// Default: 50
    pub neighbors: usize,

    /// Standard deviation multiplier for the rejection threshold.
    ///
    /// Points whose mean distance exceeds `μ + std_mul · σ` are removed.
    /// Default: 1.0
    pub std_mul: f32,
}

impl Default for StatisticalOutlierConfig {
    fn default() -> Self {
        Self {
            neighbors: 50,
            std_mul: 1.0,
        }
    }
}

/// Statistical outlier filter.
///
/// For each point, computes the mean distance to its `neighbors` nearest
/// points, then keeps points whose mean distance is at most
/// `μ + std_mul · σ` over all points (σ is the sample deviation).
///
/// This is effective for removing:
/// - Sparse noise returns floating away from surfaces
/// - Mixed-pixel artifacts at depth discontinuities
#[derive(Debug, Clone)]
pub struct StatisticalOutlierFilter {
    config: StatisticalOutlierConfig,
}

impl StatisticalOutlierFilter {
    /// Create a new outlier filter with the given configuration.
    pub fn new(config: StatisticalOutlierConfig) -> Self {
        Self { config }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &StatisticalOutlierConfig {
        &self.config
    }

    /// Indices of the points that survive filtering, in input order.
    pub fn inlier_indices(&self, cloud: &PointCloud3D) -> Vec<usize> {
        let n = cloud.len();
        // Not enough points to estimate a distribution
        if n < 3 || self.config.neighbors == 0 {
            return (0..n).collect();
        }

        let index = PointIndex::build(cloud);
        let k = self.config.neighbors.min(n - 1);

        let mean_distances: Vec<f32> = cloud
            .iter()
            .map(|p| {
                let hits = index.nearest_n(p, k + 1);
                // First hit is the query point itself
                let neighbours = &hits[1.min(hits.len())..];
                if neighbours.is_empty() {
                    return 0.0;
                }
                let sum: f32 = neighbours.iter().map(|&(_, d2)| d2.sqrt()).sum();
                sum / neighbours.len() as f32
            })
            .collect();

        let (mean, std) = mean_std_dev(&mean_distances);
        let threshold = mean + self.config.std_mul as f64 * std;

        mean_distances
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d as f64 <= threshold)
            .map(|(i, _)| i)
            .collect()
    }

    /// Apply outlier filtering, returning a new cloud.
    pub fn apply(&self, cloud: &PointCloud3D) -> PointCloud3D {
        let keep = self.inlier_indices(cloud);
        if keep.len() == cloud.len() {
            return cloud.clone();
        }
        cloud.select(&keep)
    }
}

impl Default for StatisticalOutlierFilter {
    fn default() -> Self {
        Self::new(StatisticalOutlierConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Point3D;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn dense_blob_with_strays() -> PointCloud3D {
        let mut rng = StdRng::seed_from_u64(7);
        let mut cloud = PointCloud3D::new();
        for _ in 0..400 {
            cloud.push_xyz(
                rng.random_range(-0.5..0.5),
                rng.random_range(-0.5..0.5),
                rng.random_range(-0.5..0.5),
            );
        }
        // Isolated strays far from the blob
        cloud.push_xyz(5.0, 5.0, 5.0);
        cloud.push_xyz(-6.0, 4.0, 0.0);
        cloud.push_xyz(0.0, -7.0, 3.0);
        cloud
    }

    #[test]
    fn test_removes_isolated_points() {
        let cloud = dense_blob_with_strays();
        let filter = StatisticalOutlierFilter::new(StatisticalOutlierConfig {
            neighbors: 10,
            std_mul: 1.0,
        });
        let filtered = filter.apply(&cloud);

        for stray in &cloud.points[400..] {
            assert!(!filtered.points.contains(stray), "stray {:?} kept", stray);
        }
        // The bulk of the blob survives
        assert!(filtered.len() > 300);
    }

    #[test]
    fn test_indices_preserve_order() {
        let cloud = dense_blob_with_strays();
        let keep = StatisticalOutlierFilter::default().inlier_indices(&cloud);
        assert!(keep.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_tiny_cloud_untouched() {
        let cloud = PointCloud3D::from_points(vec![
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(10.0, 0.0, 0.0),
        ]);
        assert_eq!(StatisticalOutlierFilter::default().apply(&cloud).len(), 2);
    }

    #[test]
    fn test_neighbors_clamped_to_cloud_size() {
        let mut cloud = PointCloud3D::new();
        for i in 0..8 {
            cloud.push_xyz(i as f32 * 0.1, (i % 3) as f32 * 0.01, 0.0);
        }
        // k = 50 exceeds the cloud size; must not panic
        let filtered = StatisticalOutlierFilter::default().apply(&cloud);
        assert!(!filtered.is_empty());
    }
}
