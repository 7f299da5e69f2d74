//! Surface normal estimation by local PCA.

use nalgebra::{Matrix3, Vector3};

use crate::core::kdtree::PointIndex;
use crate::core::types::{Point3D, PointCloud3D};

/// Configuration for normal estimation.
#[derive(Debug, Clone, Copy)]
pub struct NormalEstimatorConfig {
    /// Neighbourhood size (including the point itself).
    /// Default: 30
    pub neighbors: usize,

    /// Normals are flipped to face this point.
    /// Default: origin (sensor position)
    pub viewpoint: Point3D,
}

impl Default for NormalEstimatorConfig {
    fn default() -> Self {
        Self {
            neighbors: 30,
            viewpoint: Point3D::default(),
        }
    }
}

/// Per-point unit normals; `None` where the neighbourhood is degenerate.
pub type Normals = Vec<Option<Vector3<f32>>>;

/// Estimates normals from the smallest-eigenvalue eigenvector of each
/// point's neighbourhood covariance.
#[derive(Debug, Clone, Default)]
pub struct NormalEstimator {
    config: NormalEstimatorConfig,
}

impl NormalEstimator {
    pub fn new(config: NormalEstimatorConfig) -> Self {
        Self { config }
    }

    /// Estimate normals, building a fresh index over `cloud`.
    pub fn estimate(&self, cloud: &PointCloud3D) -> Normals {
        let index = PointIndex::build(cloud);
        self.estimate_with_index(cloud, &index)
    }

    /// Estimate normals using an existing index over the same cloud.
    pub fn estimate_with_index(&self, cloud: &PointCloud3D, index: &PointIndex) -> Normals {
        let k = self.config.neighbors.max(3);
        cloud
            .iter()
            .map(|p| {
                let neighbours: Vec<Point3D> = index
                    .nearest_n(p, k)
                    .into_iter()
                    .map(|(i, _)| cloud.points[i])
                    .collect();
                self.normal_from_neighbours(p, &neighbours)
            })
            .collect()
    }

    fn normal_from_neighbours(&self, p: &Point3D, neighbours: &[Point3D]) -> Option<Vector3<f32>> {
        if neighbours.len() < 3 {
            return None;
        }

        let n = neighbours.len() as f32;
        let centroid = neighbours
            .iter()
            .fold(Vector3::zeros(), |acc, q| acc + q.to_vector())
            / n;

        let mut cov = Matrix3::<f32>::zeros();
        for q in neighbours {
            let c = q.to_vector() - centroid;
            cov += c * c.transpose();
        }

        let eigen = cov.symmetric_eigen();
        let (min_idx, _) = eigen
            .eigenvalues
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))?;

        // Rank < 2 neighbourhoods (all points on a line) have no defined normal
        let mut sorted: Vec<f32> = eigen.eigenvalues.iter().copied().collect();
        sorted.sort_by(f32::total_cmp);
        if sorted[1] <= f32::EPSILON * sorted[2].max(f32::MIN_POSITIVE) {
            return None;
        }

        let mut normal: Vector3<f32> = eigen.eigenvectors.column(min_idx).into_owned();
        let norm = normal.norm();
        if !norm.is_finite() || norm == 0.0 {
            return None;
        }
        normal /= norm;

        let to_view = self.config.viewpoint.to_vector() - p.to_vector();
        if normal.dot(&to_view) < 0.0 {
            normal = -normal;
        }
        Some(normal)
    }
}
