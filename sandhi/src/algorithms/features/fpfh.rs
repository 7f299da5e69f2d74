//! Fast Point Feature Histograms (FPFH).
//!
//! 33-bin local shape descriptor: three 11-bin histograms of the Darboux
//! frame angles (α, φ, θ) between a point and its neighbours.
//!
//! ```text
//! SPFH(p)  = histogram of pair features (p, p_k) over the k neighbours
//! FPFH(p)  = SPFH(p) + 1/k · Σ SPFH(p_k) / ω_k      ω_k = |p - p_k|
//! ```
//!
//! Each 11-bin block is normalized to sum to 100.

use nalgebra::Vector3;

use super::normals::Normals;
use crate::core::kdtree::PointIndex;
use crate::core::types::PointCloud3D;

/// Bins per angle.
pub const BINS_PER_FEATURE: usize = 11;
/// Total descriptor length.
pub const FPFH_LEN: usize = 3 * BINS_PER_FEATURE;

/// One FPFH descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpfhSignature {
    pub histogram: [f32; FPFH_LEN],
}

impl Default for FpfhSignature {
    fn default() -> Self {
        Self {
            histogram: [0.0; FPFH_LEN],
        }
    }
}

impl FpfhSignature {
    /// True when no pair feature contributed (missing normal or isolated point).
    pub fn is_empty(&self) -> bool {
        self.histogram.iter().all(|&v| v == 0.0)
    }

    /// Squared L2 distance between descriptors.
    #[inline]
    pub fn distance_squared(&self, other: &FpfhSignature) -> f32 {
        self.histogram
            .iter()
            .zip(other.histogram.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

/// Configuration for FPFH estimation.
#[derive(Debug, Clone, Copy)]
pub struct FpfhConfig {
    /// Neighbourhood size; should exceed the normal neighbourhood.
    /// Default: 60
    pub neighbors: usize,
}

impl Default for FpfhConfig {
    fn default() -> Self {
        Self { neighbors: 60 }
    }
}

/// FPFH estimator.
#[derive(Debug, Clone, Default)]
pub struct FpfhEstimator {
    config: FpfhConfig,
}

/// Darboux pair features `(α, φ, θ)` for a point pair.
///
/// The source of the frame is the point whose normal makes the smaller
/// angle with the connecting line. Returns `None` for coincident points
/// or parallel normal/line.
pub fn pair_features(
    p1: Vector3<f32>,
    n1: Vector3<f32>,
    p2: Vector3<f32>,
    n2: Vector3<f32>,
) -> Option<(f32, f32, f32)> {
    let mut dp = p2 - p1;
    let dist = dp.norm();
    if dist == 0.0 || !dist.is_finite() {
        return None;
    }

    let angle1 = n1.dot(&dp) / dist;
    let angle2 = n2.dot(&dp) / dist;

    let (u, nt, phi) = if angle1.abs().acos() > angle2.abs().acos() {
        dp = -dp;
        (n2, n1, -angle2)
    } else {
        (n1, n2, angle1)
    };

    let v = dp.cross(&u);
    let v_norm = v.norm();
    if v_norm == 0.0 {
        return None;
    }
    let v = v / v_norm;
    let w = u.cross(&v);

    let alpha = v.dot(&nt);
    let theta = w.dot(&nt).atan2(u.dot(&nt));
    Some((alpha, phi, theta))
}

#[inline]
fn bin(value: f32, lo: f32, hi: f32) -> usize {
    let t = (value - lo) / (hi - lo);
    ((t * BINS_PER_FEATURE as f32).floor() as isize).clamp(0, BINS_PER_FEATURE as isize - 1)
        as usize
}

fn normalize_blocks(hist: &mut [f32; FPFH_LEN]) {
    for block in hist.chunks_mut(BINS_PER_FEATURE) {
        let sum: f32 = block.iter().sum();
        if sum > 0.0 {
            let scale = 100.0 / sum;
            block.iter_mut().for_each(|v| *v *= scale);
        }
    }
}

impl FpfhEstimator {
    pub fn new(config: FpfhConfig) -> Self {
        Self { config }
    }

    /// Compute descriptors for every point; empty signatures where no
    /// normal is available.
    pub fn compute(&self, cloud: &PointCloud3D, normals: &Normals) -> Vec<FpfhSignature> {
        let index = PointIndex::build(cloud);
        self.compute_with_index(cloud, normals, &index)
    }

    /// Same as [`compute`](Self::compute) with an existing index over `cloud`.
    pub fn compute_with_index(
        &self,
        cloud: &PointCloud3D,
        normals: &Normals,
        index: &PointIndex,
    ) -> Vec<FpfhSignature> {
        let k = self.config.neighbors.max(2);
        let neighbourhoods: Vec<Vec<(usize, f32)>> = cloud
            .iter()
            .map(|p| index.nearest_n(p, k + 1))
            .collect();

        // Simplified histograms
        let spfh: Vec<[f32; FPFH_LEN]> = (0..cloud.len())
            .map(|i| self.spfh(cloud, normals, i, &neighbourhoods[i]))
            .collect();

        (0..cloud.len())
            .map(|i| {
                if normals[i].is_none() {
                    return FpfhSignature::default();
                }
                let mut hist = spfh[i];
                let mut weighted = [0.0f32; FPFH_LEN];
                let mut used = 0usize;
                for &(j, d2) in &neighbourhoods[i] {
                    if j == i || d2 <= 0.0 || normals[j].is_none() {
                        continue;
                    }
                    let w = 1.0 / d2.sqrt();
                    for (acc, v) in weighted.iter_mut().zip(spfh[j].iter()) {
                        *acc += v * w;
                    }
                    used += 1;
                }
                if used > 0 {
                    let inv = 1.0 / used as f32;
                    for (h, v) in hist.iter_mut().zip(weighted.iter()) {
                        *h += v * inv;
                    }
                }
                normalize_blocks(&mut hist);
                FpfhSignature { histogram: hist }
            })
            .collect()
    }

    fn spfh(
        &self,
        cloud: &PointCloud3D,
        normals: &Normals,
        i: usize,
        neighbourhood: &[(usize, f32)],
    ) -> [f32; FPFH_LEN] {
        let mut hist = [0.0f32; FPFH_LEN];
        let Some(ni) = normals[i] else {
            return hist;
        };
        let pi = cloud.points[i].to_vector();

        for &(j, _) in neighbourhood {
            if j == i {
                continue;
            }
            let Some(nj) = normals[j] else {
                continue;
            };
            let Some((alpha, phi, theta)) = pair_features(pi, ni, cloud.points[j].to_vector(), nj)
            else {
                continue;
            };
            hist[bin(alpha, -1.0, 1.0)] += 1.0;
            hist[BINS_PER_FEATURE + bin(phi, -1.0, 1.0)] += 1.0;
            hist[2 * BINS_PER_FEATURE + bin(theta, -std::f32::consts::PI, std::f32::consts::PI)] +=
                1.0;
        }
        normalize_blocks(&mut hist);
        hist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::features::NormalEstimator;
    use crate::core::types::Point3D;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sphere(n: usize, seed: u64) -> PointCloud3D {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let v = Vector3::new(
                    rng.random_range(-1.0f32..1.0),
                    rng.random_range(-1.0f32..1.0),
                    rng.random_range(-1.0f32..1.0),
                )
                .normalize();
                Point3D::new(v.x, v.y, v.z - 3.0)
            })
            .collect()
    }

    #[test]
    fn test_pair_features_coplanar_normals() {
        let n = Vector3::new(0.0, 0.0, 1.0);
        let (alpha, phi, theta) =
            pair_features(Vector3::zeros(), n, Vector3::new(1.0, 0.0, 0.0), n).unwrap();
        assert_relative_eq!(alpha, 0.0, epsilon = 1e-6);
        assert_relative_eq!(phi, 0.0, epsilon = 1e-6);
        assert_relative_eq!(theta, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pair_features_coincident_points() {
        let n = Vector3::new(0.0, 0.0, 1.0);
        assert!(pair_features(Vector3::zeros(), n, Vector3::zeros(), n).is_none());
    }

    #[test]
    fn test_blocks_sum_to_100() {
        let cloud = sphere(400, 3);
        let normals = NormalEstimator::default().estimate(&cloud);
        let feats = FpfhEstimator::default().compute(&cloud, &normals);
        assert_eq!(feats.len(), cloud.len());

        let f = feats.iter().find(|f| !f.is_empty()).unwrap();
        for block in f.histogram.chunks(BINS_PER_FEATURE) {
            assert_relative_eq!(block.iter().sum::<f32>(), 100.0, epsilon = 1e-2);
        }
    }

    #[test]
    fn test_similar_geometry_similar_descriptor() {
        // Same sphere sampled twice: descriptors of a curved surface are
        // closer to each other than to those of a flat patch
        let a = sphere(400, 4);
        let b = sphere(400, 5);
        let mut rng = StdRng::seed_from_u64(6);
        let flat: PointCloud3D = (0..400)
            .map(|_| {
                Point3D::new(
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    -3.0 + rng.random_range(-0.001..0.001),
                )
            })
            .collect();

        let est = NormalEstimator::default();
        let fpfh = FpfhEstimator::default();
        let mean = |c: &PointCloud3D| {
            let feats = fpfh.compute(c, &est.estimate(c));
            let mut m = [0.0f32; FPFH_LEN];
            let valid: Vec<_> = feats.iter().filter(|f| !f.is_empty()).collect();
            for f in &valid {
                for (acc, v) in m.iter_mut().zip(f.histogram.iter()) {
                    *acc += v / valid.len() as f32;
                }
            }
            FpfhSignature { histogram: m }
        };

        let (ma, mb, mf) = (mean(&a), mean(&b), mean(&flat));
        assert!(ma.distance_squared(&mb) < ma.distance_squared(&mf));
    }
}
