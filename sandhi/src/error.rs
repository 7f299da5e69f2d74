//! Error types for sandhi

use std::path::PathBuf;

use crate::config::ConfigLoadError;
use crate::core::types::FrameIndex;
use crate::io::pcd::PcdError;
use crate::io::transforms::TransformFileError;

/// Result type alias
pub type Result<T> = std::result::Result<T, StitchError>;

/// Stitching pipeline error types
///
/// Setup errors (arguments, pose priors, config, frame discovery) are fatal.
/// `FrameRead` and `DegenerateGeometry` are per-frame and never abort a batch.
#[derive(Debug, thiserror::Error)]
pub enum StitchError {
    /// Missing or conflicting command-line input
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Zero frame files left after filtering
    #[error("No eligible frames found in {}", .0.display())]
    NoEligibleFrames(PathBuf),

    /// Two frame files map to the same frame index
    #[error("Duplicate frame index {index}: {} and {}", .first.display(), .second.display())]
    DuplicateFrameIndex {
        /// Shared index
        index: FrameIndex,
        /// File seen first
        first: PathBuf,
        /// Conflicting file
        second: PathBuf,
    },

    /// Pose-prior file problem (malformed row, row/frame mismatch)
    #[error("Pose priors: {0}")]
    TransformFile(#[from] TransformFileError),

    /// One frame file could not be read
    #[error("Failed to read frame {}: {source}", .path.display())]
    FrameRead {
        /// Frame file path
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: PcdError,
    },

    /// Too few points for a geometric operation
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Point cloud file error outside frame loading
    #[error("PCD error: {0}")]
    Pcd(#[from] PcdError),

    /// Configuration file error
    #[error("Config error: {0}")]
    Config(#[from] ConfigLoadError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StitchError {
    /// True for errors that only affect a single frame.
    pub fn is_per_frame(&self) -> bool {
        matches!(
            self,
            StitchError::FrameRead { .. } | StitchError::DegenerateGeometry(_)
        )
    }
}
