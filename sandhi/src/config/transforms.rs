//! Pose-prior file layout section.

use serde::{Deserialize, Serialize};

use crate::io::{Delimiter, MalformedRowPolicy, RemainderPolicy, TransformFileConfig};

use super::defaults;

/// Pose-prior file settings section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransformsSection {
    /// Lines skipped before data
    #[serde(default = "defaults::header_rows")]
    pub header_rows: usize,

    /// Leading label columns skipped on each row
    #[serde(default)]
    pub skip_columns: usize,

    /// Single character, "tab", or "whitespace"
    #[serde(default)]
    pub delimiter: Delimiter,

    /// Raw rows per frame; derived from the frame count when omitted
    #[serde(default)]
    pub rows_per_frame: Option<usize>,

    /// "abort" or "skip"
    #[serde(default)]
    pub on_malformed: MalformedRowPolicy,

    /// "reject" or "drop"
    #[serde(default)]
    pub remainder: RemainderPolicy,
}

impl Default for TransformsSection {
    fn default() -> Self {
        Self {
            header_rows: defaults::header_rows(),
            skip_columns: 0,
            delimiter: Delimiter::default(),
            rows_per_frame: None,
            on_malformed: MalformedRowPolicy::default(),
            remainder: RemainderPolicy::default(),
        }
    }
}

impl TransformsSection {
    /// Convert to TransformFileConfig
    pub fn to_transform_config(&self) -> TransformFileConfig {
        TransformFileConfig {
            header_rows: self.header_rows,
            skip_columns: self.skip_columns,
            delimiter: self.delimiter,
            rows_per_frame: self.rows_per_frame,
            on_malformed: self.on_malformed,
            remainder: self.remainder,
        }
    }
}
