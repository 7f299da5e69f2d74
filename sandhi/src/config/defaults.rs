//! Default value functions for serde deserialization.

use crate::core::types::Axis;

pub fn enabled() -> bool {
    true
}

pub fn extension() -> String {
    "pcd".to_string()
}

pub fn output_name() -> String {
    "filtered.pcd".to_string()
}

pub fn header_rows() -> usize {
    1
}

pub fn range_axis() -> Axis {
    Axis::Z
}

pub fn range_min() -> f32 {
    -5.0
}

pub fn leaf_size() -> f32 {
    0.1
}

pub fn post_outlier_neighbors() -> usize {
    100
}

pub fn unit() -> f32 {
    1.0
}

pub fn lateral_bounds() -> [f32; 6] {
    [-5.0, 0.0, 5.0, -5.0, 0.0, 5.0]
}

pub fn min_points() -> usize {
    5
}

pub fn segmenter_outlier_neighbors() -> usize {
    50
}

pub fn band_count() -> usize {
    5
}

pub fn distance_threshold() -> f32 {
    0.1
}

pub fn ransac_max_iterations() -> usize {
    1000
}

pub fn segmenter_seed() -> u64 {
    0x5A4D_4849
}

pub fn registration_iterations() -> u32 {
    10
}

pub fn registration_min_points() -> usize {
    10
}

pub fn samples() -> usize {
    3
}

pub fn min_sample_distance() -> f32 {
    0.25
}

pub fn correspondence_randomness() -> usize {
    10
}

pub fn max_correspondence_distance() -> f32 {
    0.5
}

pub fn normal_neighbors() -> usize {
    30
}

pub fn feature_neighbors() -> usize {
    60
}

pub fn outlier_ratio() -> f32 {
    0.1
}

pub fn epsilon() -> f32 {
    0.001
}

pub fn registration_seed() -> u64 {
    0x5AC1A
}

pub fn seed_outlier_std_mul() -> f32 {
    2.0
}

pub fn workers() -> usize {
    4
}
