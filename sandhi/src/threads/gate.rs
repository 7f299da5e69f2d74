//! Per-frame merge gate.
//!
//! Decides, exactly once, whether a frame merges into the model or is
//! abandoned by a timeout. The worker and the merging thread race on a
//! single compare-and-swap; whoever wins decides the frame's fate.

use std::sync::atomic::{AtomicU8, Ordering};

const PENDING: u8 = 0;
const MERGING: u8 = 1;
const CANCELLED: u8 = 2;

/// Observable state of a [`MergeGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Neither merged nor cancelled yet.
    Pending,
    /// A merge has been claimed; the frame will land in the model.
    Merging,
    /// The frame was abandoned; it must never merge.
    Cancelled,
}

/// One-shot merge/cancel decision shared between a worker and its helper.
#[derive(Debug, Default)]
pub struct MergeGate {
    state: AtomicU8,
}

impl MergeGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the merge. Returns false if the frame was already cancelled.
    pub fn try_begin_merge(&self) -> bool {
        self.state
            .compare_exchange(PENDING, MERGING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Abandon the frame. Returns false if a merge was already claimed.
    pub fn try_cancel(&self) -> bool {
        self.state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// True once the frame has been abandoned.
    pub fn is_cancelled(&self) -> bool {
        self.state() == GateState::Cancelled
    }

    pub fn state(&self) -> GateState {
        match self.state.load(Ordering::Acquire) {
            PENDING => GateState::Pending,
            MERGING => GateState::Merging,
            _ => GateState::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_merge_then_cancel() {
        let gate = MergeGate::new();
        assert_eq!(gate.state(), GateState::Pending);
        assert!(gate.try_begin_merge());
        assert!(!gate.try_cancel());
        assert_eq!(gate.state(), GateState::Merging);
    }

    #[test]
    fn test_cancel_then_merge() {
        let gate = MergeGate::new();
        assert!(gate.try_cancel());
        assert!(!gate.try_begin_merge());
        assert_eq!(gate.state(), GateState::Cancelled);
        assert!(gate.is_cancelled());
    }

    #[test]
    fn test_exactly_one_winner_under_contention() {
        for _ in 0..100 {
            let gate = Arc::new(MergeGate::new());
            let g1 = Arc::clone(&gate);
            let g2 = Arc::clone(&gate);
            let merger = thread::spawn(move || g1.try_begin_merge());
            let canceller = thread::spawn(move || g2.try_cancel());
            let merged = merger.join().unwrap();
            let cancelled = canceller.join().unwrap();
            assert!(merged ^ cancelled);
        }
    }
}
