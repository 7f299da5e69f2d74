//! The running merged cloud.
//!
//! One [`StitchedModel`] exists per run and is shared by every worker
//! through an `Arc`. Absorbing a frame runs in four steps:
//!
//! ```text
//! preprocess ──► snapshot (lock, clone) ──► register vs snapshot ──► lock: append + downsample
//! ```
//!
//! Only the snapshot clone and the append/downsample hold the lock; the
//! expensive preprocessing and registration run in parallel. Registration
//! targets the model as it was when the snapshot was taken.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::preprocessor::FramePreprocessor;
use super::timing::TimeBreakdown;
use crate::algorithms::matching::{
    PointToPointIcp, RegistrationConfig, RegistrationEngine, RegistrationReport, SacIaMatcher,
};
use crate::core::types::{FrameIndex, PointCloud3D};
use crate::sensors::preprocessing::{
    StatisticalOutlierConfig, StatisticalOutlierFilter, VoxelDownsampler,
};
use crate::threads::MergeGate;

/// Configuration for the stitched model.
#[derive(Debug, Clone)]
pub struct StitchedModelConfig {
    /// Leaf size for the downsample after every merge; `None` disables it.
    ///
    /// Default: Some(0.1)
    pub merge_leaf_size: Option<f32>,

    /// Leaf size for the final downsample.
    ///
    /// Default: 0.1
    pub final_leaf_size: f32,

    /// Outlier removal applied to the seed frame.
    ///
    /// Default: 100 neighbours, 2.0 σ
    pub seed_outlier: StatisticalOutlierConfig,
}

impl Default for StitchedModelConfig {
    fn default() -> Self {
        Self {
            merge_leaf_size: Some(0.1),
            final_leaf_size: 0.1,
            seed_outlier: StatisticalOutlierConfig {
                neighbors: 100,
                std_mul: 2.0,
            },
        }
    }
}

/// What absorbing one frame did.
#[derive(Debug, Clone)]
pub struct MergeSummary {
    pub frame: FrameIndex,
    /// Points in the raw frame
    pub input_points: usize,
    /// Points appended after preprocessing
    pub merged_points: usize,
    /// Model size after the merge (and its downsample)
    pub model_points: usize,
    /// `None` when registration is disabled
    pub registration: Option<RegistrationReport>,
}

type Engine = RegistrationEngine<SacIaMatcher, PointToPointIcp>;

/// Shared merged cloud with serialized merges.
#[derive(Debug)]
pub struct StitchedModel {
    config: StitchedModelConfig,
    preprocessor: FramePreprocessor,
    registration: Option<Engine>,
    cloud: Mutex<PointCloud3D>,
    timing: Mutex<TimeBreakdown>,
}

impl StitchedModel {
    /// Create an empty model.
    ///
    /// # Arguments
    ///
    /// * `config` - Merge and finalize settings
    /// * `preprocessor` - Per-frame pipeline (holds the pose priors)
    /// * `registration` - Enables coarse+fine registration when `Some`
    pub fn new(
        config: StitchedModelConfig,
        preprocessor: FramePreprocessor,
        registration: Option<&RegistrationConfig>,
    ) -> Self {
        Self {
            config,
            preprocessor,
            registration: registration.map(RegistrationEngine::from_config),
            cloud: Mutex::new(PointCloud3D::new()),
            timing: Mutex::new(TimeBreakdown::default()),
        }
    }

    pub fn config(&self) -> &StitchedModelConfig {
        &self.config
    }

    pub fn preprocessor(&self) -> &FramePreprocessor {
        &self.preprocessor
    }

    pub fn registration_enabled(&self) -> bool {
        self.registration.is_some()
    }

    /// Current number of merged points.
    pub fn len(&self) -> usize {
        self.cloud.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cloud.lock().is_empty()
    }

    /// Copy of the current merged cloud.
    pub fn snapshot(&self) -> PointCloud3D {
        self.cloud.lock().clone()
    }

    /// Stage timings recorded so far.
    pub fn timing(&self) -> TimeBreakdown {
        *self.timing.lock()
    }

    /// Add externally measured time (frame loading, setup, output).
    pub fn record_timing(&self, f: impl FnOnce(&mut TimeBreakdown)) {
        f(&mut *self.timing.lock());
    }

    /// Start the model from the first frame.
    ///
    /// Applies the frame's pose prior, the depth gate, outlier removal
    /// (`seed_outlier`) and a downsample; no segmentation or registration.
    pub fn seed(&self, mut raw: PointCloud3D, frame_index: FrameIndex) -> MergeSummary {
        let start = Instant::now();
        let input_points = raw.len();

        self.preprocessor.correct_pose(&mut raw, frame_index);
        let gated = self.preprocessor.range_filter().apply(&raw);
        let cleaned = StatisticalOutlierFilter::new(self.config.seed_outlier).apply(&gated);
        let leaf = self
            .config
            .merge_leaf_size
            .unwrap_or(self.config.final_leaf_size);
        let seed = VoxelDownsampler::with_leaf_size(leaf).apply(&cleaned);
        let preprocess = start.elapsed();

        log::debug!(
            "Seed frame {}: {} -> {} points",
            frame_index,
            input_points,
            seed.len()
        );
        self.record_timing(|t| t.preprocess += preprocess);
        self.merge(frame_index, input_points, seed, None)
    }

    /// Preprocess, register and merge one frame.
    pub fn absorb_frame(&self, raw: PointCloud3D, frame_index: FrameIndex) -> MergeSummary {
        let input_points = raw.len();
        let candidate = self.preprocess(raw, frame_index);
        let (candidate, registration) = self.register(candidate, frame_index);
        self.merge(frame_index, input_points, candidate, registration)
    }

    /// Like [`absorb_frame`](Self::absorb_frame), but only merges if `gate`
    /// has not been cancelled. Returns `None` for an abandoned frame.
    ///
    /// The gate is checked after preprocessing so a cancelled frame skips
    /// registration.
    pub fn absorb_frame_gated(
        &self,
        raw: PointCloud3D,
        frame_index: FrameIndex,
        gate: &MergeGate,
    ) -> Option<MergeSummary> {
        let input_points = raw.len();
        let candidate = self.preprocess(raw, frame_index);
        if gate.is_cancelled() {
            log::debug!("Frame {}: cancelled before registration", frame_index);
            return None;
        }
        let (candidate, registration) = self.register(candidate, frame_index);
        if !gate.try_begin_merge() {
            log::debug!("Frame {}: cancelled before merge", frame_index);
            return None;
        }
        Some(self.merge(frame_index, input_points, candidate, registration))
    }

    fn preprocess(&self, raw: PointCloud3D, frame_index: FrameIndex) -> PointCloud3D {
        let start = Instant::now();
        let candidate = self.preprocessor.preprocess(raw, frame_index);
        let preprocess = start.elapsed();
        self.record_timing(|t| t.preprocess += preprocess);
        candidate
    }

    /// Align against a snapshot of the model, outside the lock.
    fn register(
        &self,
        mut candidate: PointCloud3D,
        frame_index: FrameIndex,
    ) -> (PointCloud3D, Option<RegistrationReport>) {
        let mut registration_time = Duration::ZERO;
        let report = self.registration.as_ref().map(|engine| {
            let start = Instant::now();
            let target = self.snapshot();
            let report = engine.register(&mut candidate, &target);
            registration_time = start.elapsed();
            log::debug!("Frame {}: {}", frame_index, report);
            report
        });

        self.record_timing(|t| t.registration += registration_time);
        (candidate, report)
    }

    /// Append under the lock and re-downsample.
    fn merge(
        &self,
        frame_index: FrameIndex,
        input_points: usize,
        candidate: PointCloud3D,
        registration: Option<RegistrationReport>,
    ) -> MergeSummary {
        let start = Instant::now();
        let merged_points = candidate.len();
        let model_points = {
            let mut cloud = self.cloud.lock();
            cloud.extend_from(&candidate);
            if let Some(leaf) = self.config.merge_leaf_size {
                VoxelDownsampler::with_leaf_size(leaf).apply_in_place(&mut cloud);
            }
            cloud.len()
        };
        let merge = start.elapsed();
        self.record_timing(|t| t.merge += merge);

        MergeSummary {
            frame: frame_index,
            input_points,
            merged_points,
            model_points,
            registration,
        }
    }

    /// Final downsample; hands the merged cloud out and leaves the model empty.
    pub fn finalize(&self) -> PointCloud3D {
        let start = Instant::now();
        let cloud = std::mem::take(&mut *self.cloud.lock());
        let before = cloud.len();
        let out = VoxelDownsampler::with_leaf_size(self.config.final_leaf_size).apply(&cloud);
        let finalize = start.elapsed();
        self.record_timing(|t| t.finalize += finalize);

        log::info!(
            "Final downsample ({}): {} -> {} points",
            self.config.final_leaf_size,
            before,
            out.len()
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::preprocessor::PreprocessorConfig;
    use crate::io::PosePriors;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;
    use std::thread;

    /// Jittered 1×1 horizontal plane at z ≈ -1.05, starting at `offset_x`.
    fn plane(offset_x: f32, n: usize) -> PointCloud3D {
        let mut rng = StdRng::seed_from_u64(n as u64 + offset_x.to_bits() as u64);
        let side = (n as f32).sqrt() as usize;
        let mut cloud = PointCloud3D::with_capacity(n);
        for i in 0..side {
            for j in 0..side {
                cloud.push_xyz(
                    offset_x + i as f32 / side as f32 + rng.random_range(-0.002..0.002),
                    j as f32 / side as f32 + rng.random_range(-0.002..0.002),
                    -1.05 + rng.random_range(-0.002..0.002),
                );
            }
        }
        cloud
    }

    fn cleanup_model() -> StitchedModel {
        let pre = FramePreprocessor::new(
            PreprocessorConfig {
                walls: None,
                ..PreprocessorConfig::default()
            },
            PosePriors::new(),
        );
        StitchedModel::new(StitchedModelConfig::default(), pre, None)
    }

    #[test]
    fn test_absorb_merges_and_downsamples() {
        let model = cleanup_model();
        let summary = model.absorb_frame(plane(0.0, 900), 1);
        assert_eq!(summary.input_points, 900);
        assert_eq!(summary.merged_points, 900);
        assert!(summary.registration.is_none());
        // 1×1 plane at 0.1 leaf → about 10×10 voxels
        assert!(summary.model_points >= 100 && summary.model_points <= 121);

        // Same frame again lands in the same voxels
        let again = model.absorb_frame(plane(0.0, 900), 2);
        assert_eq!(again.model_points, summary.model_points);
    }

    #[test]
    fn test_gated_absorb_respects_cancel() {
        let model = cleanup_model();
        let gate = MergeGate::new();
        assert!(gate.try_cancel());
        assert!(model.absorb_frame_gated(plane(0.0, 400), 1, &gate).is_none());
        assert!(model.is_empty());

        let open = MergeGate::new();
        assert!(model.absorb_frame_gated(plane(0.0, 400), 1, &open).is_some());
        assert!(!model.is_empty());
    }

    #[test]
    fn test_concurrent_absorb() {
        let model = Arc::new(cleanup_model());
        let handles: Vec<_> = (0..4)
            .map(|k| {
                let model = Arc::clone(&model);
                thread::spawn(move || model.absorb_frame(plane(k as f32 * 2.0, 900), k))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // Four disjoint planes
        let n = model.len();
        assert!(n >= 400 && n <= 484, "{}", n);
    }

    #[test]
    fn test_seed_and_finalize() {
        let model = cleanup_model();
        let summary = model.seed(plane(0.0, 2500), 0);
        assert!(summary.model_points > 0);
        let out = model.finalize();
        assert_eq!(out.len(), summary.model_points);
        assert!(model.is_empty());
    }
}
