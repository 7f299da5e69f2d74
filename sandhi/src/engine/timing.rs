//! Stage timing for one stitching run.

use std::fmt;
use std::time::Duration;

/// Time spent per pipeline stage.
///
/// Per-frame stages (`load` through `merge`) are summed over all workers,
/// so with several workers they can exceed `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeBreakdown {
    /// Frame discovery and pose-prior loading.
    pub setup: Duration,

    /// Reading frame files.
    pub load: Duration,

    /// Pose correction, range filter, segmentation, post-filters.
    pub preprocess: Duration,

    /// Coarse and fine registration.
    pub registration: Duration,

    /// Append and per-merge downsample (under the model lock).
    pub merge: Duration,

    /// Final downsample.
    pub finalize: Duration,

    /// Writing the output file.
    pub write: Duration,

    /// Wall-clock time of the whole run.
    pub total: Duration,
}

impl TimeBreakdown {
    /// Accumulate per-frame stage times from `other`.
    pub fn accumulate(&mut self, other: &TimeBreakdown) {
        self.setup += other.setup;
        self.load += other.load;
        self.preprocess += other.preprocess;
        self.registration += other.registration;
        self.merge += other.merge;
        self.finalize += other.finalize;
        self.write += other.write;
        self.total += other.total;
    }
}

impl fmt::Display for TimeBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Time breakdown:")?;
        writeln!(f, "  Setup:        {:>8.3}s", self.setup.as_secs_f64())?;
        writeln!(f, "  Load:         {:>8.3}s", self.load.as_secs_f64())?;
        writeln!(f, "  Preprocess:   {:>8.3}s", self.preprocess.as_secs_f64())?;
        writeln!(f, "  Registration: {:>8.3}s", self.registration.as_secs_f64())?;
        writeln!(f, "  Merge:        {:>8.3}s", self.merge.as_secs_f64())?;
        writeln!(f, "  Finalize:     {:>8.3}s", self.finalize.as_secs_f64())?;
        writeln!(f, "  Write:        {:>8.3}s", self.write.as_secs_f64())?;
        write!(f, "  Total:        {:>8.3}s", self.total.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate() {
        let mut a = TimeBreakdown {
            load: Duration::from_millis(10),
            ..Default::default()
        };
        let b = TimeBreakdown {
            load: Duration::from_millis(5),
            merge: Duration::from_millis(2),
            ..Default::default()
        };
        a.accumulate(&b);
        assert_eq!(a.load, Duration::from_millis(15));
        assert_eq!(a.merge, Duration::from_millis(2));
        assert!(a.to_string().contains("Registration"));
    }
}
