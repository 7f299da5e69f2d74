//! Main SandhiConfig and conversion methods.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{BatchConfig, PipelineMode};

use super::error::ConfigLoadError;
use super::input::InputSection;
use super::model::{ModelSection, SchedulerSection};
use super::preprocess::{PreprocessSection, SegmenterSection};
use super::registration::RegistrationSection;
use super::transforms::TransformsSection;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "sandhi.toml";

/// Full sandhi configuration loaded from TOML
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct SandhiConfig {
    /// Frame discovery and output
    #[serde(default)]
    pub input: InputSection,

    /// Pose-prior file layout
    #[serde(default)]
    pub transforms: TransformsSection,

    /// Per-frame preprocessing
    #[serde(default)]
    pub preprocess: PreprocessSection,

    /// Wall segmentation
    #[serde(default)]
    pub segmenter: SegmenterSection,

    /// Coarse+fine registration (stitch mode)
    #[serde(default)]
    pub registration: RegistrationSection,

    /// Merged model and mode
    #[serde(default)]
    pub model: ModelSection,

    /// Worker pool
    #[serde(default)]
    pub scheduler: SchedulerSection,
}

impl SandhiConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigLoadError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&contents)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `sandhi.toml` from the working directory, else defaults
    pub fn load_default() -> Result<Self, ConfigLoadError> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// `--config` path if given, else [`load_default`](Self::load_default)
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::load_default(),
        }
    }

    /// Parse and validate a TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigLoadError> {
        let config: Self =
            basic_toml::from_str(toml).map_err(|e| ConfigLoadError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let invalid = |msg: String| Err(ConfigLoadError::Invalid(msg));

        if self.scheduler.workers == 0 {
            return invalid("scheduler.workers must be at least 1".into());
        }
        if self.scheduler.queue_capacity == Some(0) {
            return invalid("scheduler.queue_capacity must be at least 1".into());
        }
        if let Some(secs) = self.scheduler.frame_timeout_secs
            && !(secs.is_finite() && secs > 0.0)
        {
            return invalid(format!("scheduler.frame_timeout_secs must be positive, got {}", secs));
        }
        for (name, leaf) in [
            ("model.merge_leaf_size", self.model.merge_leaf_size),
            ("model.final_leaf_size", self.model.final_leaf_size),
            ("preprocess.post_leaf_size", self.preprocess.post_leaf_size),
        ] {
            if !(leaf.is_finite() && leaf > 0.0) {
                return invalid(format!("{} must be positive, got {}", name, leaf));
            }
        }
        if self.preprocess.range_min > self.preprocess.range_max {
            return invalid(format!(
                "preprocess.range_min ({}) exceeds range_max ({})",
                self.preprocess.range_min, self.preprocess.range_max
            ));
        }
        let b = &self.segmenter.lateral_bounds;
        if !(b[0] <= b[1] && b[1] <= b[2] && b[3] <= b[4] && b[4] <= b[5]) {
            return invalid(format!("segmenter.lateral_bounds not ordered: {:?}", b));
        }
        if self.segmenter.band_width <= 0.0 {
            return invalid("segmenter.band_width must be positive".into());
        }
        if self.transforms.rows_per_frame == Some(0) {
            return invalid("transforms.rows_per_frame must be at least 1".into());
        }
        if !(0.0..1.0).contains(&self.registration.outlier_ratio) {
            return invalid("registration.outlier_ratio must be in [0, 1)".into());
        }
        Ok(())
    }

    /// Build the batch pipeline configuration
    pub fn to_batch_config(&self) -> BatchConfig {
        let mode = self.model.mode;
        BatchConfig {
            mode,
            discovery: self.input.to_discovery_config(),
            transforms: self.transforms.to_transform_config(),
            preprocess: self.preprocess.to_preprocessor_config(&self.segmenter, mode),
            registration: self.registration.to_registration_config(),
            model: self.model.to_model_config(),
            scheduler: self.scheduler.to_scheduler_config(),
            output_encoding: self.input.encoding(),
        }
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, mode: Option<PipelineMode>, workers: Option<usize>) -> Self {
        if let Some(mode) = mode {
            self.model.mode = mode;
        }
        if let Some(workers) = workers {
            self.scheduler.workers = workers.max(1);
        }
        self
    }
}
