//! I/O layer.
//!
//! This layer handles files on disk.
//!
//! # Contents
//!
//! - [`pcd`]: PCD point cloud reading and writing
//! - [`transforms`]: Pose-prior measurement files
//! - [`frames`]: Frame discovery, ordering and loading

pub mod frames;
pub mod pcd;
pub mod transforms;

pub use frames::{
    FrameDiscoveryConfig, FrameLoader, PcdFrameLoader, discover_frames, order_frames, single_frame,
};
pub use pcd::{PcdEncoding, PcdError, load_pcd, save_pcd};
pub use transforms::{
    Delimiter, MalformedRowPolicy, PosePriors, RemainderPolicy, TransformFileConfig,
    TransformFileError, TransformRecordStore,
};
