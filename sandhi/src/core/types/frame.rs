//! Frame descriptors and the frame-index rule.

use std::fmt;
use std::path::{Path, PathBuf};

/// Numeric frame index, used both for ordering and for pose-prior lookup.
pub type FrameIndex = u32;

/// One input frame: its source path and derived index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub path: PathBuf,
    pub index: FrameIndex,
}

impl FrameDescriptor {
    pub fn new(path: impl Into<PathBuf>, index: FrameIndex) -> Self {
        Self {
            path: path.into(),
            index,
        }
    }

    /// Build a descriptor from a path, deriving the index from its file stem.
    ///
    /// Returns `None` when the stem has no trailing digits.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let index = parse_frame_index(&path)?;
        Some(Self { path, index })
    }

    /// File name for log messages.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl fmt::Display for FrameDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.index, self.display_name())
    }
}

/// Extract the trailing run of ASCII digits from the file stem.
///
/// `scanD10.pcd` → 10, `frame_007.pcd` → 7, `scan.pcd` → `None`.
/// Values that overflow [`FrameIndex`] also yield `None`.
pub fn parse_frame_index(path: &Path) -> Option<FrameIndex> {
    let stem = path.file_stem()?.to_str()?;
    let digits_start = stem
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    stem[digits_start..].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trailing_digits() {
        assert_eq!(parse_frame_index(Path::new("scanD10.pcd")), Some(10));
        assert_eq!(parse_frame_index(Path::new("dir/scanD2.pcd")), Some(2));
        assert_eq!(parse_frame_index(Path::new("frame_007.pcd")), Some(7));
        assert_eq!(parse_frame_index(Path::new("42.pcd")), Some(42));
    }

    #[test]
    fn test_parse_no_digits() {
        assert_eq!(parse_frame_index(Path::new("scan.pcd")), None);
        assert_eq!(parse_frame_index(Path::new("scan3b.pcd")), None);
    }

    #[test]
    fn test_parse_overflow() {
        assert_eq!(parse_frame_index(Path::new("scan99999999999.pcd")), None);
    }

    #[test]
    fn test_descriptor_from_path() {
        let d = FrameDescriptor::from_path("/data/scanD5.pcd").unwrap();
        assert_eq!(d.index, 5);
        assert_eq!(d.display_name(), "scanD5.pcd");
        assert!(FrameDescriptor::from_path("/data/readme.pcd").is_none());
    }
}
