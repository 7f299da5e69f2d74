//! Mathematical primitives for rigid 3D registration.

use nalgebra::{Isometry3, Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};

use super::types::Point3D;

/// Least-squares rigid transform mapping `source[i]` onto `target[i]`.
///
/// Kabsch/Umeyama without scale: centre both sets, SVD of the
/// cross-covariance `H = Σ (s - s̄)(t - t̄)ᵀ`, `R = V·diag(1, 1, det(VUᵀ))·Uᵀ`,
/// `t = t̄ - R·s̄`. Accumulates in f64.
///
/// Returns `None` for fewer than 3 pairs, mismatched lengths, or when the
/// SVD does not produce both factors.
pub fn estimate_rigid_transform(source: &[Point3D], target: &[Point3D]) -> Option<Isometry3<f32>> {
    if source.len() != target.len() || source.len() < 3 {
        return None;
    }

    let n = source.len() as f64;
    let to64 = |p: &Point3D| Vector3::new(p.x as f64, p.y as f64, p.z as f64);

    let mut source_centroid = Vector3::<f64>::zeros();
    let mut target_centroid = Vector3::<f64>::zeros();
    for (s, t) in source.iter().zip(target) {
        source_centroid += to64(s);
        target_centroid += to64(t);
    }
    source_centroid /= n;
    target_centroid /= n;

    let mut h = Matrix3::<f64>::zeros();
    for (s, t) in source.iter().zip(target) {
        let sc = to64(s) - source_centroid;
        let tc = to64(t) - target_centroid;
        h += sc * tc.transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u?;
    let v = svd.v_t?.transpose();

    // Reflection guard
    let d = (v * u.transpose()).determinant().signum();
    let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d));
    let r = v * correction * u.transpose();
    let t = target_centroid - r * source_centroid;

    let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(
        r.map(|x| x as f32),
    ));
    Some(Isometry3::from_parts(
        Translation3::new(t.x as f32, t.y as f32, t.z as f32),
        rotation,
    ))
}

/// Translation norm and rotation angle of a transform.
///
/// Used as the convergence measure for iterative registration.
#[inline]
pub fn transform_magnitude(transform: &Isometry3<f32>) -> (f32, f32) {
    (
        transform.translation.vector.norm(),
        transform.rotation.angle(),
    )
}

/// Apply a transform to a single point.
#[inline]
pub fn transform_point(transform: &Isometry3<f32>, p: &Point3D) -> Point3D {
    let q = transform.transform_point(&nalgebra::Point3::new(p.x, p.y, p.z));
    Point3D::new(q.x, q.y, q.z)
}
