//! Core foundation layer.
//!
//! This is the bottom layer of the stitching stack with no internal
//! dependencies. All other layers depend on core.
//!
//! # Contents
//!
//! - [`types`]: Core data types (points, clouds, pose priors, frames)
//! - [`math`]: Rigid transform estimation
//! - [`kdtree`]: Nearest-neighbour index over a cloud

pub mod kdtree;
pub mod math;
pub mod types;
