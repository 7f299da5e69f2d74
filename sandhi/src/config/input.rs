//! Input and output settings section.

use serde::{Deserialize, Serialize};

use crate::io::{FrameDiscoveryConfig, PcdEncoding};

use super::defaults;

/// Input/output settings section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputSection {
    /// Frame file extension (case-insensitive)
    #[serde(default = "defaults::extension")]
    pub extension: String,

    /// Output file name written next to the input
    #[serde(default = "defaults::output_name")]
    pub output_name: String,

    /// Write binary instead of ASCII PCD
    #[serde(default)]
    pub binary_output: bool,
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            extension: defaults::extension(),
            output_name: defaults::output_name(),
            binary_output: false,
        }
    }
}

impl InputSection {
    /// Convert to FrameDiscoveryConfig
    pub fn to_discovery_config(&self) -> FrameDiscoveryConfig {
        FrameDiscoveryConfig {
            extension: self.extension.trim_start_matches('.').to_string(),
            output_name: self.output_name.clone(),
        }
    }

    pub fn encoding(&self) -> PcdEncoding {
        if self.binary_output {
            PcdEncoding::Binary
        } else {
            PcdEncoding::Ascii
        }
    }
}
