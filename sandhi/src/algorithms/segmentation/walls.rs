//! Planar wall segmentation.
//!
//! Partitions one frame's cloud into four lateral regions (x-low, x-high,
//! y-low, y-high), cleans each region with statistical outlier removal,
//! splits it into depth bands along z, and keeps only the RANSAC plane
//! inliers of every band. Everything off the walls is discarded.
//!
//! ```text
//!             y-high
//!        ┌──────────────┐
//!        │              │
//! x-low  │    sensor    │  x-high      each region × each z band
//!        │              │              → RANSAC plane → inliers
//!        └──────────────┘
//!             y-low
//! ```

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::plane::{RansacPlaneConfig, RansacPlaneFitter};
use crate::core::types::{Axis, PointCloud3D};
use crate::sensors::preprocessing::{
    CloudFilter, StatisticalOutlierConfig, StatisticalOutlierFilter,
};

/// Lateral region bounds `{min_x, mid_x, max_x, min_y, mid_y, max_y}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LateralBounds {
    pub min_x: f32,
    pub mid_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub mid_y: f32,
    pub max_y: f32,
}

impl LateralBounds {
    /// Build from the six-value layout used in configuration files.
    pub fn from_array(b: [f32; 6]) -> Self {
        Self {
            min_x: b[0],
            mid_x: b[1],
            max_x: b[2],
            min_y: b[3],
            mid_y: b[4],
            max_y: b[5],
        }
    }

    /// The four regions as `(region, axis, min, max)`, inclusive bounds.
    pub fn regions(&self) -> [(WallRegion, Axis, f32, f32); 4] {
        [
            (WallRegion::XLow, Axis::X, self.min_x, self.mid_x),
            (WallRegion::XHigh, Axis::X, self.mid_x, self.max_x),
            (WallRegion::YLow, Axis::Y, self.min_y, self.mid_y),
            (WallRegion::YHigh, Axis::Y, self.mid_y, self.max_y),
        ]
    }
}

impl Default for LateralBounds {
    fn default() -> Self {
        Self::from_array([-5.0, 0.0, 5.0, -5.0, 0.0, 5.0])
    }
}

/// One of the four lateral regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallRegion {
    XLow,
    XHigh,
    YLow,
    YHigh,
}

impl std::fmt::Display for WallRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WallRegion::XLow => "x-low",
            WallRegion::XHigh => "x-high",
            WallRegion::YLow => "y-low",
            WallRegion::YHigh => "y-high",
        };
        f.write_str(name)
    }
}

/// Configuration for wall segmentation.
#[derive(Debug, Clone)]
pub struct WallSegmenterConfig {
    /// Lateral region bounds.
    pub bounds: LateralBounds,

    /// Regions and bands with fewer points are skipped.
    /// Default: 5
    pub min_points: usize,

    /// Per-region outlier removal.
    /// Default: k = 50, std_mul = 1.0
    pub outlier: StatisticalOutlierConfig,

    /// Upper z limit of the first band.
    /// Default: 0.0
    pub band_top: f32,

    /// Band thickness along z.
    /// Default: 1.0
    pub band_width: f32,

    /// Number of bands below `band_top`.
    /// Default: 5
    pub band_count: usize,

    /// Per-band plane fit (distance threshold default 0.1).
    pub ransac: RansacPlaneConfig,

    /// RNG seed for plane sampling.
    pub seed: u64,
}

impl Default for WallSegmenterConfig {
    fn default() -> Self {
        Self {
            bounds: LateralBounds::default(),
            min_points: 5,
            outlier: StatisticalOutlierConfig {
                neighbors: 50,
                std_mul: 1.0,
            },
            band_top: 0.0,
            band_width: 1.0,
            band_count: 5,
            ransac: RansacPlaneConfig::default(),
            seed: 0x5A4D_4849,
        }
    }
}

/// Counters from one segmentation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentationStats {
    pub input_points: usize,
    pub output_points: usize,
    /// Regions that reached band splitting
    pub regions_processed: usize,
    /// Regions below `min_points`
    pub regions_skipped: usize,
    /// Bands with an accepted plane
    pub bands_fitted: usize,
    /// Bands below `min_points`
    pub bands_skipped: usize,
    /// Bands where the plane fit was degenerate
    pub bands_failed: usize,
}

/// Wall segmenter.
///
/// Degenerate regions and bands are skipped (debug log + counter), never
/// reported as errors. Region bounds overlap at the mid values and band
/// bounds overlap at band edges, so a point on a shared boundary can be
/// emitted twice.
#[derive(Debug, Clone, Default)]
pub struct WallSegmenter {
    config: WallSegmenterConfig,
}

impl WallSegmenter {
    pub fn new(config: WallSegmenterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WallSegmenterConfig {
        &self.config
    }

    /// z range of band `j`: `[top - (j+1)·w, top - j·w]`.
    #[inline]
    pub fn band_limits(&self, j: usize) -> (f32, f32) {
        let w = self.config.band_width;
        let top = self.config.band_top;
        (top - (j + 1) as f32 * w, top - j as f32 * w)
    }

    /// Segment a cloud, returning the concatenated wall inliers.
    pub fn segment(&self, cloud: &PointCloud3D) -> PointCloud3D {
        self.segment_with_stats(cloud).0
    }

    /// Segment a cloud and report per-pass counters.
    pub fn segment_with_stats(&self, cloud: &PointCloud3D) -> (PointCloud3D, SegmentationStats) {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let outlier = StatisticalOutlierFilter::new(self.config.outlier);
        let fitter = RansacPlaneFitter::new(self.config.ransac.clone());

        let mut stats = SegmentationStats {
            input_points: cloud.len(),
            ..Default::default()
        };
        let mut result = PointCloud3D::new();

        for (region, axis, min, max) in self.config.bounds.regions() {
            let sub = cloud.filtered_by_axis(axis, min, max);
            if sub.len() < self.config.min_points {
                log::debug!(
                    "Region {} skipped: {} points < {}",
                    region,
                    sub.len(),
                    self.config.min_points
                );
                stats.regions_skipped += 1;
                continue;
            }
            stats.regions_processed += 1;

            let sub = outlier.apply(&sub);

            for j in 0..self.config.band_count {
                let (lo, hi) = self.band_limits(j);
                let band = sub.filtered_by_axis(Axis::Z, lo, hi);
                if band.len() < self.config.min_points {
                    stats.bands_skipped += 1;
                    continue;
                }

                match fitter.fit(&band, &mut rng) {
                    Ok(fit) => {
                        log::debug!(
                            "Region {} band [{:.2}, {:.2}]: {}/{} inliers",
                            region,
                            lo,
                            hi,
                            fit.inliers.len(),
                            band.len()
                        );
                        stats.bands_fitted += 1;
                        result.extend_from(&band.select(&fit.inliers));
                    }
                    Err(e) => {
                        log::debug!("Region {} band [{:.2}, {:.2}] skipped: {}", region, lo, hi, e);
                        stats.bands_failed += 1;
                    }
                }
            }
        }

        stats.output_points = result.len();
        (result, stats)
    }
}

impl CloudFilter for WallSegmenter {
    fn filter(&self, cloud: &PointCloud3D) -> PointCloud3D {
        self.segment(cloud)
    }

    fn name(&self) -> &'static str {
        "WallSegmenter"
    }
}
