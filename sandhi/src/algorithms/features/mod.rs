//! Local geometric features for coarse registration.
//!
//! # Contents
//!
//! - [`NormalEstimator`]: PCA surface normals oriented toward a viewpoint
//! - [`FpfhEstimator`]: 33-bin Fast Point Feature Histograms

mod fpfh;
mod normals;

pub use fpfh::{BINS_PER_FEATURE, FPFH_LEN, FpfhConfig, FpfhEstimator, FpfhSignature, pair_features};
pub use normals::{NormalEstimator, NormalEstimatorConfig, Normals};
