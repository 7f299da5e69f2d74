//! Core data types for scan stitching.
//!
//! - [`Point3D`]: 3D point, [`Axis`] selector
//! - [`PointCloud3D`]: ordered point collection, moved between stages
//! - [`TransformRecord`]: per-frame pose prior with confidence
//! - [`FrameDescriptor`]: input path plus derived [`FrameIndex`]

mod cloud;
mod frame;
mod point;
mod transform_record;

pub use cloud::PointCloud3D;
pub use frame::{FrameDescriptor, FrameIndex, parse_frame_index};
pub use point::{Axis, Point3D};
pub use transform_record::TransformRecord;
