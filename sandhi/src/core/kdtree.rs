//! k-d tree index over a point cloud.
//!
//! Thin wrapper around [`kiddo`] shared by outlier removal, normal and
//! feature estimation, and ICP. Distances returned by kiddo are squared;
//! the wrapper keeps them squared and leaves `sqrt` to the caller.

use kiddo::SquaredEuclidean;
use kiddo::immutable::float::kdtree::ImmutableKdTree;

use super::types::{Point3D, PointCloud3D};

type Tree = ImmutableKdTree<f32, u64, 3, 32>;

/// Nearest-neighbour index over the points of one cloud.
///
/// Items are the point indices in the source cloud. The tree is built once
/// from the whole slice, so any number of points may share a coordinate.
pub struct PointIndex {
    tree: Option<Tree>,
    len: usize,
}

impl PointIndex {
    /// Build an index from a cloud.
    pub fn build(cloud: &PointCloud3D) -> Self {
        Self::from_points(&cloud.points)
    }

    /// Build an index from a slice of points.
    pub fn from_points(points: &[Point3D]) -> Self {
        if points.is_empty() {
            return Self { tree: None, len: 0 };
        }
        let coords: Vec<[f32; 3]> = points.iter().map(Point3D::to_array).collect();
        Self {
            tree: Some(Tree::new_from_slice(&coords)),
            len: points.len(),
        }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Closest indexed point as `(index, squared_distance)`.
    pub fn nearest(&self, query: &Point3D) -> Option<(usize, f32)> {
        let tree = self.tree.as_ref()?;
        let nn = tree.nearest_one::<SquaredEuclidean>(&query.to_array());
        Some((nn.item as usize, nn.distance))
    }

    /// Up to `k` closest points as `(index, squared_distance)`, nearest first.
    ///
    /// When the query is itself an indexed point it is included at distance 0.
    pub fn nearest_n(&self, query: &Point3D, k: usize) -> Vec<(usize, f32)> {
        let Some(tree) = self.tree.as_ref() else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }
        let k = std::num::NonZeroUsize::new(k.min(self.len)).expect("k and len are non-zero");
        tree.nearest_n::<SquaredEuclidean>(&query.to_array(), k)
            .into_iter()
            .map(|nn| (nn.item as usize, nn.distance))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_cloud() -> PointCloud3D {
        let mut cloud = PointCloud3D::new();
        for i in 0..10 {
            for j in 0..10 {
                // Slight z variation keeps the data non-planar
                cloud.push_xyz(i as f32 * 0.1, j as f32 * 0.1, (i * j) as f32 * 1e-4);
            }
        }
        cloud
    }

    #[test]
    fn test_nearest() {
        let cloud = grid_cloud();
        let index = PointIndex::build(&cloud);
        let (i, d2) = index.nearest(&Point3D::new(0.21, 0.29, 0.0)).unwrap();
        assert_eq!(i, 2 * 10 + 3);
        assert!(d2 < 0.01);
    }

    #[test]
    fn test_nearest_n_sorted_and_includes_self() {
        let cloud = grid_cloud();
        let index = PointIndex::build(&cloud);
        let query = cloud.points[55];
        let hits = index.nearest_n(&query, 5);
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].0, 55);
        assert_eq!(hits[0].1, 0.0);
        for pair in hits.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
    }

    #[test]
    fn test_nearest_n_clamped_to_len() {
        let cloud = PointCloud3D::from_points(vec![
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(1.0, 0.0, 0.0),
        ]);
        let index = PointIndex::build(&cloud);
        assert_eq!(index.nearest_n(&Point3D::default(), 10).len(), 2);
    }

    #[test]
    fn test_empty_index() {
        let index = PointIndex::build(&PointCloud3D::new());
        assert!(index.is_empty());
        assert!(index.nearest(&Point3D::default()).is_none());
        assert!(index.nearest_n(&Point3D::default(), 3).is_empty());
    }

    #[test]
    fn test_exact_planar_input() {
        // 40 x 40 grid on the plane z = -1 with no jitter
        let mut cloud = PointCloud3D::new();
        for i in 0..40 {
            for j in 0..40 {
                cloud.push_xyz(i as f32 * 0.025, j as f32 * 0.025, -1.0);
            }
        }
        let index = PointIndex::build(&cloud);
        assert_eq!(index.len(), 1600);

        let (i, d2) = index.nearest(&Point3D::new(0.5, 0.5, -0.9)).unwrap();
        assert_eq!(i, 20 * 40 + 20);
        assert!((d2 - 0.01).abs() < 1e-5);

        let hits = index.nearest_n(&cloud.points[0], 8);
        assert_eq!(hits.len(), 8);
        assert_eq!(hits[0], (0, 0.0));
    }

    #[test]
    fn test_duplicate_points() {
        let mut points = vec![Point3D::new(4.0, 1.0, 0.5); 2000];
        points.push(Point3D::new(4.0, 2.0, 0.5));
        let index = PointIndex::from_points(&points);

        let (i, d2) = index.nearest(&Point3D::new(4.0, 2.1, 0.5)).unwrap();
        assert_eq!(i, 2000);
        assert!(d2 < 0.011);

        let hits = index.nearest_n(&Point3D::new(4.0, 1.0, 0.5), 30);
        assert_eq!(hits.len(), 30);
        assert!(hits.iter().all(|&(i, d)| i < 2000 && d == 0.0));
    }
}
