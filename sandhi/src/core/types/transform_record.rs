//! Per-frame pose prior record.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Rigid-body pose correction for one frame plus a scalar confidence.
///
/// Angles are radians, offsets are in cloud units. Column order in pose-prior
/// files is `rotx, roty, rotz, dx, dy, dz[, confidence]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformRecord {
    pub dx: f32,
    pub dy: f32,
    pub dz: f32,
    pub rotx: f32,
    pub roty: f32,
    pub rotz: f32,
    /// 0.0 = no information, 1.0 = neutral
    pub confidence: f32,
}

impl TransformRecord {
    /// Neutral confidence used when a row carries no confidence column.
    pub const NEUTRAL_CONFIDENCE: f32 = 1.0;

    /// All-zero record with zero confidence (no prior available).
    pub fn zero() -> Self {
        Self::default()
    }

    /// Build from the positional column layout `rotx, roty, rotz, dx, dy, dz`.
    pub fn from_columns(cols: [f32; 6], confidence: f32) -> Self {
        Self {
            rotx: cols[0],
            roty: cols[1],
            rotz: cols[2],
            dx: cols[3],
            dy: cols[4],
            dz: cols[5],
            confidence,
        }
    }

    /// Field-wise mean of a group of records.
    ///
    /// Returns `None` for an empty slice.
    pub fn mean(records: &[TransformRecord]) -> Option<TransformRecord> {
        if records.is_empty() {
            return None;
        }
        let mut acc = [0.0f64; 7];
        for r in records {
            acc[0] += r.dx as f64;
            acc[1] += r.dy as f64;
            acc[2] += r.dz as f64;
            acc[3] += r.rotx as f64;
            acc[4] += r.roty as f64;
            acc[5] += r.rotz as f64;
            acc[6] += r.confidence as f64;
        }
        let n = records.len() as f64;
        Some(TransformRecord {
            dx: (acc[0] / n) as f32,
            dy: (acc[1] / n) as f32,
            dz: (acc[2] / n) as f32,
            rotx: (acc[3] / n) as f32,
            roty: (acc[4] / n) as f32,
            rotz: (acc[5] / n) as f32,
            confidence: (acc[6] / n) as f32,
        })
    }

    /// Express this record relative to `base` (field-wise difference).
    ///
    /// Confidence is kept from `self`.
    pub fn relative_to(&self, base: &TransformRecord) -> TransformRecord {
        TransformRecord {
            dx: self.dx - base.dx,
            dy: self.dy - base.dy,
            dz: self.dz - base.dz,
            rotx: self.rotx - base.rotx,
            roty: self.roty - base.roty,
            rotz: self.rotz - base.rotz,
            confidence: self.confidence,
        }
    }

    /// True if every offset and angle is exactly zero.
    pub fn is_identity(&self) -> bool {
        self.dx == 0.0
            && self.dy == 0.0
            && self.dz == 0.0
            && self.rotx == 0.0
            && self.roty == 0.0
            && self.rotz == 0.0
    }

    /// Correction that undoes this prior.
    ///
    /// `T(-d) · Rx(-rotx) · Ry(-roty) · Rz(-rotz)`: a point is rotated about
    /// z first, then y, then x, and finally translated by the negated offset.
    pub fn inverse_isometry(&self) -> Isometry3<f32> {
        let rx = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -self.rotx);
        let ry = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -self.roty);
        let rz = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -self.rotz);
        Isometry3::from_parts(
            Translation3::new(-self.dx, -self.dy, -self.dz),
            rx * ry * rz,
        )
    }
}
