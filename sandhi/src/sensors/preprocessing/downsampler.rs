//! Voxel-grid downsampling for point clouds.
//!
//! Reduces point count by replacing every occupied voxel with the centroid
//! of the points that fall into it.

use std::collections::HashMap;

use crate::core::types::{Point3D, PointCloud3D};

/// Configuration for voxel downsampling.
#[derive(Debug, Clone, Copy)]
pub struct VoxelDownsamplerConfig {
    /// Edge length of the cubic voxel.
    ///
    /// A non-positive or non-finite value disables downsampling.
    /// Default: 0.1
    pub leaf_size: f32,
}

impl Default for VoxelDownsamplerConfig {
    fn default() -> Self {
        Self { leaf_size: 0.1 }
    }
}

/// Voxel-grid downsampler.
///
/// Voxel keys are `floor(coord / leaf_size)` per axis. Output points are
/// emitted in ascending key order so results are deterministic regardless
/// of input order.
#[derive(Debug, Clone)]
pub struct VoxelDownsampler {
    config: VoxelDownsamplerConfig,
}

type VoxelKey = (i64, i64, i64);

impl VoxelDownsampler {
    /// Create a new downsampler with the given configuration.
    pub fn new(config: VoxelDownsamplerConfig) -> Self {
        Self { config }
    }

    /// Downsampler with a given leaf size.
    pub fn with_leaf_size(leaf_size: f32) -> Self {
        Self::new(VoxelDownsamplerConfig { leaf_size })
    }

    /// Get the current configuration.
    pub fn config(&self) -> &VoxelDownsamplerConfig {
        &self.config
    }

    #[inline]
    fn key(&self, p: &Point3D) -> VoxelKey {
        let inv = 1.0 / self.config.leaf_size as f64;
        (
            (p.x as f64 * inv).floor() as i64,
            (p.y as f64 * inv).floor() as i64,
            (p.z as f64 * inv).floor() as i64,
        )
    }

    /// Apply voxel downsampling, returning a new cloud.
    pub fn apply(&self, cloud: &PointCloud3D) -> PointCloud3D {
        let leaf = self.config.leaf_size;
        if cloud.is_empty() || !leaf.is_finite() || leaf <= 0.0 {
            return cloud.clone();
        }

        // Per voxel: running f64 sums and count
        let mut voxels: HashMap<VoxelKey, ([f64; 3], u32)> = HashMap::new();
        for p in cloud.iter() {
            if !p.is_finite() {
                continue;
            }
            let entry = voxels.entry(self.key(p)).or_insert(([0.0; 3], 0));
            entry.0[0] += p.x as f64;
            entry.0[1] += p.y as f64;
            entry.0[2] += p.z as f64;
            entry.1 += 1;
        }

        let mut cells: Vec<(VoxelKey, ([f64; 3], u32))> = voxels.into_iter().collect();
        cells.sort_unstable_by_key(|(key, _)| *key);

        cells
            .into_iter()
            .map(|(_, (sum, count))| {
                let n = count as f64;
                Point3D::new(
                    (sum[0] / n) as f32,
                    (sum[1] / n) as f32,
                    (sum[2] / n) as f32,
                )
            })
            .collect()
    }

    /// Downsample in place.
    pub fn apply_in_place(&self, cloud: &mut PointCloud3D) {
        *cloud = self.apply(cloud);
    }
}

impl Default for VoxelDownsampler {
    fn default() -> Self {
        Self::new(VoxelDownsamplerConfig::default())
    }
}
