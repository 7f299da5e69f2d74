//! Utility functions shared across layers.
//!
//! - Statistical helpers (mean_std_dev)

mod stats;

pub use stats::mean_std_dev;
