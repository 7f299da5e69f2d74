//! Shared utilities for registration algorithms.
//!
//! Contains functionality used by both SAC-IA and ICP:
//! - Nearest-neighbour correspondence search with trimming
//! - MSE to score conversion

use crate::core::kdtree::PointIndex;
use crate::core::types::Point3D;

/// A source/target point pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    pub source: usize,
    pub target: usize,
    pub distance_squared: f32,
}

/// Find nearest-neighbour correspondences for already-transformed source
/// points.
///
/// Pairs farther than `max_distance` are rejected; then the worst
/// `outlier_ratio` fraction is trimmed, never below `min_keep` pairs.
/// Result is sorted by ascending distance.
pub fn find_correspondences(
    source: &[Point3D],
    target_index: &PointIndex,
    max_distance: f32,
    outlier_ratio: f32,
    min_keep: usize,
) -> Vec<Correspondence> {
    let max_dist_sq = max_distance * max_distance;
    let mut correspondences: Vec<Correspondence> = source
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            let (j, d2) = target_index.nearest(p)?;
            (d2 <= max_dist_sq).then_some(Correspondence {
                source: i,
                target: j,
                distance_squared: d2,
            })
        })
        .collect();

    correspondences.sort_by(|a, b| a.distance_squared.total_cmp(&b.distance_squared));

    if outlier_ratio > 0.0 && !correspondences.is_empty() {
        let keep = ((1.0 - outlier_ratio) * correspondences.len() as f32) as usize;
        correspondences.truncate(keep.max(min_keep));
    }

    correspondences
}

/// Mean squared distance of a correspondence set, `f32::MAX` when empty.
pub fn correspondence_mse(correspondences: &[Correspondence]) -> f32 {
    if correspondences.is_empty() {
        return f32::MAX;
    }
    correspondences
        .iter()
        .map(|c| c.distance_squared)
        .sum::<f32>()
        / correspondences.len() as f32
}

/// Convert MSE to a 0-1 score.
///
/// Uses linear decay based on RMSE (root mean squared error):
/// - Score 1.0 at RMSE = 0
/// - Score 0.5 at RMSE = 10cm
/// - Score 0.0 at RMSE ≥ 20cm
#[inline]
pub fn mse_to_score(mse: f32) -> f32 {
    let rmse = mse.sqrt();
    (1.0 - rmse * 5.0).clamp(0.0, 1.0)
}
