//! Shared test utilities for registration algorithms.
//!
//! Contains helper functions for creating test point clouds used across
//! multiple matcher test suites.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::types::{Point3D, PointCloud3D};

/// Create a box-shaped room: four walls plus a floor.
///
/// Walls at x = ±2.0 and y = ±1.5, floor at z = -2.5, open top.
/// Adds slight jitter to avoid degenerate k-d tree buckets on flat walls.
///
/// # Arguments
///
/// * `n` - Total points distributed over the five surfaces
/// * `seed` - RNG seed
pub fn create_room(n: usize, seed: u64) -> PointCloud3D {
    let mut rng = StdRng::seed_from_u64(seed);
    let per_surface = n / 5;
    let mut cloud = PointCloud3D::with_capacity(n);
    let jitter = |rng: &mut StdRng| -> f32 { rng.random_range(-0.002..0.002) };

    for _ in 0..per_surface {
        let y = rng.random_range(-1.5..1.5);
        let z = rng.random_range(-2.5..0.0);
        let j = jitter(&mut rng);
        cloud.push(Point3D::new(-2.0 + j, y, z));
    }
    for _ in 0..per_surface {
        let y = rng.random_range(-1.5..1.5);
        let z = rng.random_range(-2.5..0.0);
        let j = jitter(&mut rng);
        cloud.push(Point3D::new(2.0 + j, y, z));
    }
    for _ in 0..per_surface {
        let x = rng.random_range(-2.0..2.0);
        let z = rng.random_range(-2.5..0.0);
        let j = jitter(&mut rng);
        cloud.push(Point3D::new(x, -1.5 + j, z));
    }
    for _ in 0..per_surface {
        let x = rng.random_range(-2.0..2.0);
        let z = rng.random_range(-2.5..0.0);
        let j = jitter(&mut rng);
        cloud.push(Point3D::new(x, 1.5 + j, z));
    }
    for _ in 0..per_surface {
        let x = rng.random_range(-2.0..2.0);
        let y = rng.random_range(-1.5..1.5);
        let j = jitter(&mut rng);
        cloud.push(Point3D::new(x, y, -2.5 + j));
    }
    cloud
}

/// Add a few box-shaped furniture blocks inside the room.
///
/// Breaks the room's mirror symmetry so feature matching has distinctive
/// structure to lock onto.
pub fn add_furniture(cloud: &mut PointCloud3D, n: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    // (min corner, max corner)
    let blocks = [
        ([-1.8f32, -1.3f32, -2.5f32], [-1.0f32, -0.6f32, -1.7f32]),
        ([0.8, 0.4, -2.5], [1.8, 1.4, -2.0]),
    ];
    for i in 0..n {
        let (lo, hi) = blocks[i % blocks.len()];
        // Pick a face, then a point on it
        let face = rng.random_range(0..5);
        let mut p = [
            rng.random_range(lo[0]..hi[0]),
            rng.random_range(lo[1]..hi[1]),
            rng.random_range(lo[2]..hi[2]),
        ];
        match face {
            0 => p[0] = lo[0],
            1 => p[0] = hi[0],
            2 => p[1] = lo[1],
            3 => p[1] = hi[1],
            _ => p[2] = hi[2],
        }
        let j = rng.random_range(-0.002..0.002);
        cloud.push(Point3D::new(p[0] + j, p[1] - j, p[2] + j));
    }
}
