//! Frame discovery and loading.
//!
//! Frames are `.pcd` files whose stem ends in a decimal index
//! (`scanD10.pcd` → 10). They are processed in ascending index order, and
//! the same index keys the pose-prior lookup.

use std::path::Path;

use super::pcd::load_pcd;
use crate::core::types::{FrameDescriptor, PointCloud3D};
use crate::error::{Result, StitchError};

/// Which directory entries count as frames.
#[derive(Debug, Clone)]
pub struct FrameDiscoveryConfig {
    /// File extension, matched case-insensitively.
    /// Default: "pcd"
    pub extension: String,

    /// Output file name, never treated as an input frame.
    /// Default: "filtered.pcd"
    pub output_name: String,
}

impl Default for FrameDiscoveryConfig {
    fn default() -> Self {
        Self {
            extension: "pcd".to_string(),
            output_name: "filtered.pcd".to_string(),
        }
    }
}

impl FrameDiscoveryConfig {
    fn accepts(&self, path: &Path) -> bool {
        let name_ok = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n != self.output_name);
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension));
        name_ok && ext_ok
    }
}

/// Sort frames by index and reject duplicate indices.
pub fn order_frames(mut frames: Vec<FrameDescriptor>) -> Result<Vec<FrameDescriptor>> {
    frames.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.path.cmp(&b.path)));
    if let Some(pair) = frames.windows(2).find(|w| w[0].index == w[1].index) {
        return Err(StitchError::DuplicateFrameIndex {
            index: pair[0].index,
            first: pair[0].path.clone(),
            second: pair[1].path.clone(),
        });
    }
    Ok(frames)
}

/// List the frame files in `dir`, in ascending index order.
///
/// Files without a trailing index are skipped with a warning.
pub fn discover_frames(dir: &Path, config: &FrameDiscoveryConfig) -> Result<Vec<FrameDescriptor>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || !config.accepts(&path) {
            continue;
        }
        match FrameDescriptor::from_path(&path) {
            Some(frame) => frames.push(frame),
            None => log::warn!("Skipping {}: no frame index in name", path.display()),
        }
    }

    if frames.is_empty() {
        return Err(StitchError::NoEligibleFrames(dir.to_path_buf()));
    }
    order_frames(frames)
}

/// A single frame given directly on the command line.
///
/// A name without a trailing index gets index 0.
pub fn single_frame(path: &Path, config: &FrameDiscoveryConfig) -> Result<Vec<FrameDescriptor>> {
    if !path.is_file() || !config.accepts(path) {
        return Err(StitchError::NoEligibleFrames(path.to_path_buf()));
    }
    let frame =
        FrameDescriptor::from_path(path).unwrap_or_else(|| FrameDescriptor::new(path, 0));
    Ok(vec![frame])
}

/// Source of frame clouds.
pub trait FrameLoader: Send + Sync {
    /// Load one frame. Failures are per-frame (`FrameRead`).
    fn load(&self, frame: &FrameDescriptor) -> Result<PointCloud3D>;
}

/// Loads frames from PCD files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcdFrameLoader;

impl FrameLoader for PcdFrameLoader {
    fn load(&self, frame: &FrameDescriptor) -> Result<PointCloud3D> {
        load_pcd(&frame.path).map_err(|source| StitchError::FrameRead {
            path: frame.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_numeric_not_lexicographic_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["scanD2.pcd", "scanD10.pcd", "scanD1.pcd"] {
            touch(dir.path(), name);
        }

        let frames = discover_frames(dir.path(), &FrameDiscoveryConfig::default()).unwrap();
        let names: Vec<String> = frames.iter().map(|f| f.display_name()).collect();
        assert_eq!(names, ["scanD1.pcd", "scanD2.pcd", "scanD10.pcd"]);
        assert_eq!(
            frames.iter().map(|f| f.index).collect::<Vec<_>>(),
            [1, 2, 10]
        );
    }

    #[test]
    fn test_filters_output_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "scanD1.pcd");
        touch(dir.path(), "filtered.pcd");
        touch(dir.path(), "notes7.txt");
        touch(dir.path(), "readme.pcd");
        fs::create_dir(dir.path().join("sub3.pcd")).unwrap();

        let frames = discover_frames(dir.path(), &FrameDiscoveryConfig::default()).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].index, 1);
    }

    #[test]
    fn test_no_eligible_frames() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "filtered.pcd");
        assert!(matches!(
            discover_frames(dir.path(), &FrameDiscoveryConfig::default()),
            Err(StitchError::NoEligibleFrames(_))
        ));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "scanA3.pcd");
        touch(dir.path(), "scanB003.pcd");
        assert!(matches!(
            discover_frames(dir.path(), &FrameDiscoveryConfig::default()),
            Err(StitchError::DuplicateFrameIndex { index: 3, .. })
        ));
    }

    #[test]
    fn test_single_frame_without_index() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "room.pcd");
        let frames =
            single_frame(&dir.path().join("room.pcd"), &FrameDiscoveryConfig::default()).unwrap();
        assert_eq!(frames[0].index, 0);
    }

    #[test]
    fn test_loader_reports_frame_read() {
        let frame = FrameDescriptor::new("/nonexistent/scanD1.pcd", 1);
        let err = PcdFrameLoader.load(&frame).unwrap_err();
        assert!(err.is_per_frame());
    }
}
