//! Batch pipeline - one complete stitching run.
//!
//! ```text
//! discover frames → load pose priors → build model ─┬─ stitch:   seed from first frame
//!                                                   └─ cleanup:  start empty
//!               → BatchScheduler (absorb remaining frames in parallel)
//!               → final downsample → write PCD → BatchSummary
//! ```
//!
//! The two modes share every stage. Cleanup uses absolute pose priors and no
//! registration; stitch expresses priors relative to the first frame and
//! registers every later frame against the growing model.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::preprocessor::{FramePreprocessor, PreprocessorConfig};
use super::stitched_model::{StitchedModel, StitchedModelConfig};
use super::timing::TimeBreakdown;
use crate::algorithms::matching::RegistrationConfig;
use crate::core::types::FrameDescriptor;
use crate::error::Result;
use crate::io::{
    FrameDiscoveryConfig, FrameLoader, PcdEncoding, PcdFrameLoader, PosePriors,
    TransformFileConfig, TransformRecordStore, discover_frames, save_pcd, single_frame,
};
use crate::threads::{BatchScheduler, FrameOutcome, FrameReport, SchedulerConfig};

/// Pipeline variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Parallel preprocess + merge, absolute priors, no registration.
    #[default]
    Cleanup,
    /// Seeded model, relative priors, coarse+fine registration.
    Stitch,
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineMode::Cleanup => write!(f, "cleanup"),
            PipelineMode::Stitch => write!(f, "stitch"),
        }
    }
}

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Every eligible file in a directory.
    Directory(PathBuf),
    /// One frame file.
    File(PathBuf),
}

impl InputSource {
    /// Default output location: `output_name` next to the input.
    pub fn default_output(&self, output_name: &str) -> PathBuf {
        match self {
            InputSource::Directory(dir) => dir.join(output_name),
            InputSource::File(file) => file
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(output_name),
        }
    }
}

/// Everything one run needs.
#[derive(Debug, Clone, Default)]
pub struct BatchConfig {
    pub mode: PipelineMode,
    pub discovery: FrameDiscoveryConfig,
    pub transforms: TransformFileConfig,
    pub preprocess: PreprocessorConfig,
    /// Used only in stitch mode.
    pub registration: RegistrationConfig,
    pub model: StitchedModelConfig,
    pub scheduler: SchedulerConfig,
    pub output_encoding: PcdEncoding,
}

impl BatchConfig {
    /// Defaults for `mode`; stitch mode enables the pre-registration post-filters.
    pub fn for_mode(mode: PipelineMode) -> Self {
        let preprocess = match mode {
            PipelineMode::Cleanup => PreprocessorConfig::default(),
            PipelineMode::Stitch => PreprocessorConfig::stitching(),
        };
        Self {
            mode,
            preprocess,
            ..Self::default()
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub mode: PipelineMode,
    pub output_path: PathBuf,
    pub output_points: usize,
    /// One report per frame, ascending frame index.
    pub reports: Vec<FrameReport>,
    pub timing: TimeBreakdown,
}

impl BatchSummary {
    pub fn frames(&self) -> usize {
        self.reports.len()
    }

    pub fn merged(&self) -> usize {
        self.count(|o| matches!(o, FrameOutcome::Merged(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FrameOutcome::Skipped(_)))
    }

    pub fn timed_out(&self) -> usize {
        self.count(|o| matches!(o, FrameOutcome::TimedOut))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FrameOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&FrameOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Batch summary ({} mode):", self.mode)?;
        writeln!(f, "  Frames:     {}", self.frames())?;
        writeln!(f, "  Merged:     {}", self.merged())?;
        writeln!(f, "  Skipped:    {}", self.skipped())?;
        writeln!(f, "  Timed out:  {}", self.timed_out())?;
        if self.failed() > 0 {
            writeln!(f, "  Failed:     {}", self.failed())?;
        }
        writeln!(f, "  Output:     {} ({} points)", self.output_path.display(), self.output_points)?;
        write!(f, "{}", self.timing)
    }
}

/// Runs the full stitching pipeline.
pub struct BatchPipeline {
    config: BatchConfig,
    loader: Arc<dyn FrameLoader>,
}

impl BatchPipeline {
    /// Pipeline reading frames from PCD files.
    pub fn new(config: BatchConfig) -> Self {
        Self::with_loader(config, Arc::new(PcdFrameLoader))
    }

    pub fn with_loader(config: BatchConfig, loader: Arc<dyn FrameLoader>) -> Self {
        Self { config, loader }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Discover the input frames in processing order.
    pub fn frames(&self, input: &InputSource) -> Result<Vec<FrameDescriptor>> {
        match input {
            InputSource::Directory(dir) => discover_frames(dir, &self.config.discovery),
            InputSource::File(file) => single_frame(file, &self.config.discovery),
        }
    }

    /// Load pose priors for `frames`; all-zero priors without a file.
    ///
    /// In stitch mode the priors are made relative to the first frame.
    pub fn priors(&self, frames: &[FrameDescriptor], transform_file: Option<&Path>) -> Result<PosePriors> {
        let priors = match transform_file {
            Some(path) => {
                let priors =
                    TransformRecordStore::new(self.config.transforms.clone()).load_file(path, frames)?;
                log::info!("Loaded {} pose priors from {}", priors.len(), path.display());
                priors
            }
            None => PosePriors::zero(frames),
        };
        Ok(match self.config.mode {
            PipelineMode::Stitch => priors.relative_to_first(),
            PipelineMode::Cleanup => priors,
        })
    }

    /// Run the batch and write the merged cloud.
    ///
    /// Setup errors (no frames, bad pose priors, output write) are returned;
    /// per-frame failures only show up in the summary's reports.
    pub fn run(
        &self,
        input: &InputSource,
        transform_file: Option<&Path>,
        output: Option<&Path>,
    ) -> Result<BatchSummary> {
        let start = Instant::now();
        let mode = self.config.mode;

        let frames = self.frames(input)?;
        log::info!(
            "Found {} frames (mode: {}, workers: {})",
            frames.len(),
            mode,
            self.config.scheduler.workers
        );
        let priors = self.priors(&frames, transform_file)?;

        let preprocessor = FramePreprocessor::new(self.config.preprocess.clone(), priors);
        let registration = match mode {
            PipelineMode::Stitch => Some(&self.config.registration),
            PipelineMode::Cleanup => None,
        };
        let model = Arc::new(StitchedModel::new(
            self.config.model.clone(),
            preprocessor,
            registration,
        ));
        let setup = start.elapsed();
        model.record_timing(|t| t.setup += setup);

        let mut reports = Vec::with_capacity(frames.len());
        let remaining = match mode {
            PipelineMode::Stitch => match frames.split_first() {
                Some((first, rest)) => {
                    reports.push(self.seed(&model, first));
                    rest
                }
                None => &frames[..],
            },
            PipelineMode::Cleanup => &frames[..],
        };

        let scheduler = BatchScheduler::new(self.config.scheduler.clone());
        reports.extend(scheduler.run(remaining, &model, Arc::clone(&self.loader)));
        reports.sort_by_key(|r| r.index);

        let cloud = model.finalize();
        if cloud.is_empty() {
            log::warn!("Merged cloud is empty");
        }

        let output_path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| input.default_output(&self.config.discovery.output_name));
        let write_start = Instant::now();
        save_pcd(&cloud, &output_path, self.config.output_encoding)?;
        let write = write_start.elapsed();
        log::info!("Wrote {} points to {}", cloud.len(), output_path.display());

        let mut timing = model.timing();
        timing.write += write;
        timing.total = start.elapsed();

        let summary = BatchSummary {
            mode,
            output_path,
            output_points: cloud.len(),
            reports,
            timing,
        };
        log::info!("{}", summary);
        Ok(summary)
    }

    /// Load the first frame and seed the model with it.
    fn seed(&self, model: &StitchedModel, frame: &FrameDescriptor) -> FrameReport {
        let start = Instant::now();
        let outcome = match self.loader.load(frame) {
            Ok(raw) => {
                let load = start.elapsed();
                model.record_timing(|t| t.load += load);
                let summary = model.seed(raw, frame.index);
                log::info!("Seeded model from {}: {} points", frame, summary.model_points);
                FrameOutcome::Merged(summary)
            }
            Err(e) => {
                // The next merged frame starts the model instead
                log::warn!("Skipping seed frame {}: {}", frame, e);
                FrameOutcome::Skipped(e.to_string())
            }
        };
        FrameReport {
            index: frame.index,
            path: frame.path.clone(),
            outcome,
            elapsed: start.elapsed(),
        }
    }
}

impl fmt::Debug for BatchPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
