//! Sensor processing layer.
//!
//! This layer cleans raw frame clouds before segmentation and registration.
//!
//! # Contents
//!
//! - [`preprocessing`]: Range gating, outlier removal, voxel downsampling

pub mod preprocessing;
