//! Geometry algorithms layer.
//!
//! This layer contains the algorithmic building blocks for stitching.
//!
//! # Contents
//!
//! - [`features`]: Surface normals and FPFH descriptors
//! - [`matching`]: Cloud registration (SAC-IA, ICP, coarse-then-fine engine)
//! - [`segmentation`]: RANSAC plane fitting and wall segmentation

pub mod features;
pub mod matching;
pub mod segmentation;
