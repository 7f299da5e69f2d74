//! Batch Scheduler - parallel frame absorption.
//!
//! Frames are pushed, in ascending index order, onto a bounded task queue
//! served by a fixed set of long-lived worker threads (`stitch-0`,
//! `stitch-1`, ...). Each worker loads one frame, absorbs it into the shared
//! [`StitchedModel`] and sends a [`FrameReport`] back on a results channel.
//!
//! ```text
//!                 ┌──► stitch-0 ──┐
//! frames ─► queue ├──► stitch-1 ──┼──► results ─► reports (by index)
//!                 └──► stitch-N ──┘
//!                         │
//!                         ▼
//!                 Arc<StitchedModel>
//! ```
//!
//! With a per-frame timeout each frame runs on a helper thread. On expiry
//! the worker cancels the frame's [`MergeGate`]; if the helper already
//! claimed the merge, the worker waits for it instead. A cancelled helper
//! stops at its next stage boundary (after load, after preprocessing) and
//! the worker joins it before taking another frame, so at most `workers`
//! frames are ever in flight.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::gate::MergeGate;
use crate::core::types::{FrameDescriptor, FrameIndex};
use crate::engine::{MergeSummary, StitchedModel};
use crate::io::FrameLoader;

/// Configuration for the batch scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum concurrent workers.
    /// Default: 4
    pub workers: usize,

    /// Task queue capacity; `None` uses twice the worker count.
    pub queue_capacity: Option<usize>,

    /// Per-frame time limit; `None` waits indefinitely.
    pub frame_timeout: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: None,
            frame_timeout: None,
        }
    }
}

/// How one frame ended.
#[derive(Debug, Clone)]
pub enum FrameOutcome {
    /// Absorbed into the model.
    Merged(MergeSummary),
    /// Frame could not be read; the batch continued.
    Skipped(String),
    /// Abandoned by the per-frame timeout; never merged.
    TimedOut,
    /// Worker or helper thread died.
    Failed(String),
}

impl FrameOutcome {
    pub fn is_merged(&self) -> bool {
        matches!(self, FrameOutcome::Merged(_))
    }
}

impl fmt::Display for FrameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameOutcome::Merged(s) => write!(
                f,
                "merged {} of {} points (model {})",
                s.merged_points, s.input_points, s.model_points
            ),
            FrameOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            FrameOutcome::TimedOut => write!(f, "timed out"),
            FrameOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Result of processing one frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub index: FrameIndex,
    pub path: PathBuf,
    pub outcome: FrameOutcome,
    pub elapsed: Duration,
}

/// Shared state handed to every worker.
struct WorkerContext {
    model: Arc<StitchedModel>,
    loader: Arc<dyn FrameLoader>,
    timeout: Option<Duration>,
    completed: AtomicUsize,
    total: usize,
}

/// Fixed-size worker pool over a bounded task queue.
#[derive(Debug, Clone, Default)]
pub struct BatchScheduler {
    config: SchedulerConfig,
}

impl BatchScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Absorb every frame into `model`.
    ///
    /// Blocks until all frames are processed. Reports are returned in
    /// ascending frame-index order, one per frame.
    pub fn run(
        &self,
        frames: &[FrameDescriptor],
        model: &Arc<StitchedModel>,
        loader: Arc<dyn FrameLoader>,
    ) -> Vec<FrameReport> {
        if frames.is_empty() {
            return Vec::new();
        }

        let workers = self.config.workers.max(1).min(frames.len());
        let capacity = self.config.queue_capacity.unwrap_or(workers * 2).max(1);
        let (task_tx, task_rx) = crossbeam_channel::bounded::<FrameDescriptor>(capacity);
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<FrameReport>();

        let context = Arc::new(WorkerContext {
            model: Arc::clone(model),
            loader,
            timeout: self.config.frame_timeout,
            completed: AtomicUsize::new(0),
            total: frames.len(),
        });

        log::info!(
            "Processing {} frames with {} workers (queue {})",
            frames.len(),
            workers,
            capacity
        );

        let handles: Vec<JoinHandle<()>> = (0..workers)
            .filter_map(|i| {
                let rx = task_rx.clone();
                let tx = result_tx.clone();
                let ctx = Arc::clone(&context);
                thread::Builder::new()
                    .name(format!("stitch-{}", i))
                    .spawn(move || worker_loop(rx, tx, ctx))
                    .map_err(|e| log::error!("Failed to spawn worker stitch-{}: {}", i, e))
                    .ok()
            })
            .collect();
        drop(task_rx);

        if handles.is_empty() {
            log::warn!("No worker threads available; processing frames inline");
            for frame in frames {
                let report = process_frame(frame, &context);
                let _ = result_tx.send(report);
            }
        } else {
            for frame in frames {
                if task_tx.send(frame.clone()).is_err() {
                    log::error!("All workers exited; {} not queued", frame);
                    break;
                }
            }
        }
        drop(task_tx);
        drop(result_tx);

        for (i, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() {
                log::error!("Worker stitch-{} panicked", i);
            }
        }

        let mut reports: Vec<FrameReport> = result_rx.iter().collect();
        for frame in frames {
            if !reports.iter().any(|r| r.index == frame.index) {
                reports.push(FrameReport {
                    index: frame.index,
                    path: frame.path.clone(),
                    outcome: FrameOutcome::Failed("no report (worker died)".to_string()),
                    elapsed: Duration::ZERO,
                });
            }
        }
        reports.sort_by_key(|r| r.index);
        reports
    }
}

fn worker_loop(tasks: Receiver<FrameDescriptor>, results: Sender<FrameReport>, ctx: Arc<WorkerContext>) {
    for frame in tasks.iter() {
        let report = process_frame(&frame, &ctx);
        if results.send(report).is_err() {
            break;
        }
    }
}

fn process_frame(frame: &FrameDescriptor, ctx: &Arc<WorkerContext>) -> FrameReport {
    let start = Instant::now();
    let outcome = match ctx.timeout {
        Some(limit) => run_with_timeout(frame, ctx, limit),
        None => run_frame(frame, ctx, None),
    };

    let done = ctx.completed.fetch_add(1, Ordering::Relaxed) + 1;
    log::info!("Processed {}/{}: {} {}", done, ctx.total, frame, outcome);

    FrameReport {
        index: frame.index,
        path: frame.path.clone(),
        outcome,
        elapsed: start.elapsed(),
    }
}

fn run_frame(frame: &FrameDescriptor, ctx: &WorkerContext, gate: Option<&MergeGate>) -> FrameOutcome {
    let start = Instant::now();
    let raw = match ctx.loader.load(frame) {
        Ok(cloud) => cloud,
        Err(e) => {
            log::warn!("Skipping frame {}: {}", frame, e);
            return FrameOutcome::Skipped(e.to_string());
        }
    };
    let load = start.elapsed();
    ctx.model.record_timing(|t| t.load += load);

    if gate.is_some_and(MergeGate::is_cancelled) {
        log::debug!("Frame {}: cancelled after load", frame);
        return FrameOutcome::TimedOut;
    }

    match gate {
        None => FrameOutcome::Merged(ctx.model.absorb_frame(raw, frame.index)),
        Some(gate) => match ctx.model.absorb_frame_gated(raw, frame.index, gate) {
            Some(summary) => FrameOutcome::Merged(summary),
            None => FrameOutcome::TimedOut,
        },
    }
}

fn run_with_timeout(frame: &FrameDescriptor, ctx: &Arc<WorkerContext>, limit: Duration) -> FrameOutcome {
    let gate = Arc::new(MergeGate::new());
    let (tx, rx) = crossbeam_channel::bounded::<FrameOutcome>(1);

    let spawned = {
        let frame = frame.clone();
        let ctx = Arc::clone(ctx);
        let gate = Arc::clone(&gate);
        thread::Builder::new()
            .name(format!("stitch-frame-{}", frame.index))
            .spawn(move || {
                let outcome = run_frame(&frame, &ctx, Some(&gate));
                // Receiver is gone once the worker gave up on this frame
                let _ = tx.send(outcome);
            })
    };
    let helper = match spawned {
        Ok(handle) => handle,
        Err(e) => {
            log::warn!("No helper thread for {} ({}); running without timeout", frame, e);
            return run_frame(frame, ctx, None);
        }
    };

    let outcome = match rx.recv_timeout(limit) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => {
            if gate.try_cancel() {
                log::warn!("Frame {} timed out after {:.1}s", frame, limit.as_secs_f64());
                FrameOutcome::TimedOut
            } else {
                log::debug!("Frame {} past its limit but already merging; waiting", frame);
                rx.recv()
                    .unwrap_or_else(|_| FrameOutcome::Failed("helper thread exited".to_string()))
            }
        }
        Err(RecvTimeoutError::Disconnected) => {
            FrameOutcome::Failed("helper thread exited".to_string())
        }
    };

    if helper.join().is_err() {
        log::error!("Helper thread for {} panicked", frame);
        if !matches!(outcome, FrameOutcome::TimedOut) {
            return FrameOutcome::Failed("helper thread panicked".to_string());
        }
    }
    outcome
}
