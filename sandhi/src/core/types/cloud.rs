//! 3D point cloud container.

use nalgebra::{Isometry3, Point3};
use serde::{Deserialize, Serialize};

use super::point::{Axis, Point3D};

/// Ordered collection of 3D points.
///
/// Pipeline stages take a cloud by value or `&mut` and hand it on; a cloud
/// is never shared between stages. Normals and descriptors are computed into
/// side arrays by the stages that need them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointCloud3D {
    /// Points in insertion order
    pub points: Vec<Point3D>,
}

impl PointCloud3D {
    /// Create an empty point cloud.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a point cloud with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Create from a vector of points.
    pub fn from_points(points: Vec<Point3D>) -> Self {
        Self { points }
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point.
    #[inline]
    pub fn push(&mut self, point: Point3D) {
        self.points.push(point);
    }

    /// Add a point by coordinates.
    #[inline]
    pub fn push_xyz(&mut self, x: f32, y: f32, z: f32) {
        self.points.push(Point3D::new(x, y, z));
    }

    /// Iterate over points.
    pub fn iter(&self) -> std::slice::Iter<'_, Point3D> {
        self.points.iter()
    }

    /// Append all points of `other` (cloud union, duplicates kept).
    pub fn extend_from(&mut self, other: &PointCloud3D) {
        self.points.extend_from_slice(&other.points);
    }

    /// Copy the points at `indices` into a new cloud, in index order.
    ///
    /// Out-of-range indices are ignored.
    pub fn select(&self, indices: &[usize]) -> PointCloud3D {
        let points = indices
            .iter()
            .filter_map(|&i| self.points.get(i).copied())
            .collect();
        PointCloud3D { points }
    }

    /// Drop points with NaN or infinite coordinates.
    ///
    /// Returns the number of points removed.
    pub fn remove_non_finite(&mut self) -> usize {
        let before = self.points.len();
        self.points.retain(Point3D::is_finite);
        before - self.points.len()
    }

    /// Keep only points whose coordinate on `axis` lies in `[min, max]`.
    pub fn filtered_by_axis(&self, axis: Axis, min: f32, max: f32) -> PointCloud3D {
        let points = self
            .points
            .iter()
            .filter(|p| {
                let v = p.coord(axis);
                v >= min && v <= max
            })
            .copied()
            .collect();
        PointCloud3D { points }
    }

    /// Centroid of all points, `None` for an empty cloud.
    pub fn centroid(&self) -> Option<Point3D> {
        if self.points.is_empty() {
            return None;
        }
        // Accumulate in f64 so large clouds keep precision
        let (mut sx, mut sy, mut sz) = (0.0f64, 0.0f64, 0.0f64);
        for p in &self.points {
            sx += p.x as f64;
            sy += p.y as f64;
            sz += p.z as f64;
        }
        let n = self.points.len() as f64;
        Some(Point3D::new(
            (sx / n) as f32,
            (sy / n) as f32,
            (sz / n) as f32,
        ))
    }

    /// Axis-aligned bounds as (min, max), `None` for an empty cloud.
    pub fn bounds(&self) -> Option<(Point3D, Point3D)> {
        let first = *self.points.first()?;
        let mut min = first;
        let mut max = first;
        for p in &self.points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Some((min, max))
    }

    /// Return a copy with every point mapped through `transform`.
    pub fn transformed(&self, transform: &Isometry3<f32>) -> PointCloud3D {
        let mut out = self.clone();
        out.transform_in_place(transform);
        out
    }

    /// Map every point through `transform` in place.
    pub fn transform_in_place(&mut self, transform: &Isometry3<f32>) {
        for p in &mut self.points {
            let q = transform.transform_point(&Point3::new(p.x, p.y, p.z));
            *p = Point3D::new(q.x, q.y, q.z);
        }
    }
}

impl FromIterator<Point3D> for PointCloud3D {
    fn from_iter<I: IntoIterator<Item = Point3D>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PointCloud3D {
    type Item = &'a Point3D;
    type IntoIter = std::slice::Iter<'a, Point3D>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, UnitQuaternion, Vector3};
    use std::f32::consts::FRAC_PI_2;

    fn unit_square() -> PointCloud3D {
        PointCloud3D::from_points(vec![
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(1.0, 0.0, 0.0),
            Point3D::new(1.0, 1.0, 0.0),
            Point3D::new(0.0, 1.0, 0.0),
        ])
    }

    #[test]
    fn test_centroid() {
        let c = unit_square().centroid().unwrap();
        assert_relative_eq!(c.x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(c.y, 0.5, epsilon = 1e-6);
        assert_relative_eq!(c.z, 0.0, epsilon = 1e-6);
        assert!(PointCloud3D::new().centroid().is_none());
    }

    #[test]
    fn test_bounds() {
        let (min, max) = unit_square().bounds().unwrap();
        assert_eq!(min, Point3D::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3D::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_filtered_by_axis_inclusive() {
        let cloud = unit_square();
        let left = cloud.filtered_by_axis(Axis::X, 0.0, 0.0);
        assert_eq!(left.len(), 2);
        let all = cloud.filtered_by_axis(Axis::Z, -1.0, 1.0);
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_select_ignores_out_of_range() {
        let cloud = unit_square();
        let picked = cloud.select(&[2, 0, 99]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.points[0], Point3D::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_remove_non_finite() {
        let mut cloud = unit_square();
        cloud.push_xyz(f32::NAN, 0.0, 0.0);
        cloud.push_xyz(0.0, f32::INFINITY, 0.0);
        assert_eq!(cloud.remove_non_finite(), 2);
        assert_eq!(cloud.len(), 4);
    }

    #[test]
    fn test_transform_rotation_and_translation() {
        let iso = Isometry3::from_parts(
            Translation3::new(1.0, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
        );
        let cloud = PointCloud3D::from_points(vec![Point3D::new(1.0, 0.0, 0.0)]);
        let moved = cloud.transformed(&iso);
        assert_relative_eq!(moved.points[0].x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(moved.points[0].y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(moved.points[0].z, 0.0, epsilon = 1e-6);
    }
}
