//! End-to-end pipeline tests.
//!
//! Frames are written as PCD files into a temporary directory, optionally
//! with a pose-prior file, and the full batch pipeline runs over them.

use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use sandhi::core::types::PointCloud3D;
use sandhi::engine::{BatchConfig, BatchPipeline, InputSource, PipelineMode};
use sandhi::error::StitchError;
use sandhi::io::{PcdEncoding, TransformFileError, load_pcd, save_pcd};

/// Flat 1×1 plane of `n` jittered points over `[x0, x0+1) × [0, 1)` at z ≈ -1.05.
fn flat_plane(x0: f32, n: usize, seed: u64) -> PointCloud3D {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            sandhi::Point3D::new(
                x0 + rng.random_range(0.0..0.999),
                rng.random_range(0.0..0.999),
                -1.05 + rng.random_range(-0.005..0.005),
            )
        })
        .collect()
}

/// Flat 1×1 plane of 40 × 25 = 1000 grid points at z = -1 exactly.
fn exact_plane() -> PointCloud3D {
    let mut cloud = PointCloud3D::new();
    for i in 0..40 {
        for j in 0..25 {
            cloud.push_xyz((i as f32 + 0.5) / 40.0, (j as f32 + 0.5) / 25.0, -1.0);
        }
    }
    cloud
}

/// Three identical exact planes with one exact prior row each (dx = 0, -1, -2).
fn exact_scene() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let mut transforms = String::from("rotx;roty;rotz;dx;dy;dz\n");
    for k in 0..3 {
        write_frame(dir.path(), &format!("scanD{}.pcd", k + 1), &exact_plane());
        transforms.push_str(&format!("0;0;0;{};0;0\n", -k));
    }
    fs::write(dir.path().join("transforms.csv"), transforms).unwrap();
    dir
}

fn write_frame(dir: &Path, name: &str, cloud: &PointCloud3D) {
    save_pcd(cloud, &dir.join(name), PcdEncoding::Binary).unwrap();
}

fn cleanup_config() -> BatchConfig {
    let mut config = BatchConfig::for_mode(PipelineMode::Cleanup);
    config.preprocess.walls = None;
    config.scheduler.workers = 2;
    config
}

/// Three frames captured at x = 0, -1, -2 (pose dx); corrected they tile
/// `[0, 3) × [0, 1)`. Two raw rows per frame, averaged.
fn tiled_scene() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    // Numeric order scanD1 < scanD2 < scanD10, not lexicographic
    for (k, name) in ["scanD1.pcd", "scanD2.pcd", "scanD10.pcd"].iter().enumerate() {
        write_frame(dir.path(), name, &flat_plane(0.0, 1000, k as u64 + 1));
    }

    let mut transforms = String::from("rotx;roty;rotz;dx;dy;dz;confidence\n");
    for k in 0..3 {
        let dx = -(k as f32);
        transforms.push_str(&format!("0;0;0;{};0;0;0.9\n", dx - 0.01));
        transforms.push_str(&format!("0;0;0;{};0;0;0.9\n", dx + 0.01));
    }
    fs::write(dir.path().join("transforms.csv"), transforms).unwrap();
    dir
}

#[test]
fn test_cleanup_three_tiled_frames() {
    let dir = tiled_scene();
    let pipeline = BatchPipeline::new(cleanup_config());
    let input = InputSource::Directory(dir.path().to_path_buf());

    let summary = pipeline
        .run(&input, Some(&dir.path().join("transforms.csv")), None)
        .unwrap();

    assert_eq!(summary.frames(), 3);
    assert_eq!(summary.merged(), 3);
    assert_eq!(
        summary.reports.iter().map(|r| r.index).collect::<Vec<_>>(),
        [1, 2, 10]
    );

    let output = dir.path().join("filtered.pcd");
    assert_eq!(summary.output_path, output);
    let cloud = load_pcd(&output).unwrap();
    assert_eq!(cloud.len(), summary.output_points);

    // 3 × (10 × 10) voxels at leaf 0.1
    let expected = 300.0;
    let n = cloud.len() as f32;
    assert!((n - expected).abs() <= 0.1 * expected, "{} points", n);

    let c = cloud.centroid().unwrap();
    assert_relative_eq!(c.x, 1.5, epsilon = 0.05);
    assert_relative_eq!(c.y, 0.5, epsilon = 0.05);
    assert_relative_eq!(c.z, -1.05, epsilon = 0.05);
}

#[test]
fn test_cleanup_exact_planes() {
    let dir = exact_scene();
    let summary = BatchPipeline::new(cleanup_config())
        .run(
            &InputSource::Directory(dir.path().to_path_buf()),
            Some(&dir.path().join("transforms.csv")),
            None,
        )
        .unwrap();

    assert_eq!(summary.merged(), 3);
    let cloud = load_pcd(&summary.output_path).unwrap();
    let n = cloud.len() as f32;
    assert!((n - 300.0).abs() <= 30.0, "{} points", n);

    let c = cloud.centroid().unwrap();
    assert_relative_eq!(c.x, 1.5, epsilon = 0.05);
    assert_relative_eq!(c.y, 0.5, epsilon = 0.05);
    assert_relative_eq!(c.z, -1.0, epsilon = 0.05);
}

#[test]
fn test_exact_planes_with_default_walls_and_stitching() {
    let dir = exact_scene();
    let input = InputSource::Directory(dir.path().to_path_buf());
    let transforms = dir.path().join("transforms.csv");

    // Wall segmentation may discard the whole floor; it must not panic
    let mut walls = BatchConfig::for_mode(PipelineMode::Cleanup);
    walls.scheduler.workers = 2;
    let summary = BatchPipeline::new(walls)
        .run(&input, Some(&transforms), None)
        .unwrap();
    assert_eq!(summary.frames(), 3);

    let mut stitch = BatchConfig::for_mode(PipelineMode::Stitch);
    stitch.preprocess.walls = None;
    stitch.scheduler.workers = 2;
    let output = dir.path().join("stitched.pcd");
    let summary = BatchPipeline::new(stitch)
        .run(&input, Some(&transforms), Some(&output))
        .unwrap();
    assert_eq!(summary.merged(), 3);
    assert!(!load_pcd(&output).unwrap().is_empty());
}

#[test]
fn test_rerun_ignores_previous_output() {
    let dir = tiled_scene();
    let pipeline = BatchPipeline::new(cleanup_config());
    let input = InputSource::Directory(dir.path().to_path_buf());
    let transforms = dir.path().join("transforms.csv");

    let first = pipeline.run(&input, Some(&transforms), None).unwrap();
    let second = pipeline.run(&input, Some(&transforms), None).unwrap();
    assert_eq!(second.frames(), 3);
    assert_eq!(first.output_points, second.output_points);
}

#[test]
fn test_stitch_mode_overlapping_frames() {
    let dir = tempfile::tempdir().unwrap();
    // Same patch seen from x = 0, -0.3, -0.6
    let mut transforms = String::from("rotx;roty;rotz;dx;dy;dz\n");
    for k in 0..3u32 {
        let shift = 0.3 * k as f32;
        write_frame(
            dir.path(),
            &format!("scanD{}.pcd", k + 1),
            &flat_plane(shift, 1000, 40 + k as u64),
        );
        transforms.push_str(&format!("0;0;0;{};0;0\n", shift));
    }
    fs::write(dir.path().join("transforms.csv"), transforms).unwrap();

    let mut config = BatchConfig::for_mode(PipelineMode::Stitch);
    config.preprocess.walls = None;
    config.scheduler.workers = 2;
    let output = dir.path().join("stitched.pcd");

    let summary = BatchPipeline::new(config)
        .run(
            &InputSource::Directory(dir.path().to_path_buf()),
            Some(&dir.path().join("transforms.csv")),
            Some(&output),
        )
        .unwrap();

    assert_eq!(summary.merged(), 3);
    // Later frames were registered; the seed frame was not
    let registered = summary
        .reports
        .iter()
        .filter_map(|r| match &r.outcome {
            sandhi::FrameOutcome::Merged(m) => m.registration.as_ref(),
            _ => None,
        })
        .count();
    assert_eq!(registered, 2);

    let cloud = load_pcd(&output).unwrap();
    // Relative priors put every frame back onto the first: one 1×1 patch
    assert!(cloud.len() >= 80 && cloud.len() <= 121, "{}", cloud.len());
    let c = cloud.centroid().unwrap();
    assert_relative_eq!(c.x, 0.5, epsilon = 0.05);
    assert_relative_eq!(c.y, 0.5, epsilon = 0.05);
    assert_relative_eq!(c.z, -1.05, epsilon = 0.05);
}

#[test]
fn test_unreadable_frame_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), "scanD1.pcd", &flat_plane(0.0, 500, 7));
    write_frame(dir.path(), "scanD3.pcd", &flat_plane(2.0, 500, 8));
    fs::write(dir.path().join("scanD2.pcd"), "not a point cloud\n").unwrap();

    let summary = BatchPipeline::new(cleanup_config())
        .run(&InputSource::Directory(dir.path().to_path_buf()), None, None)
        .unwrap();

    assert_eq!(summary.frames(), 3);
    assert_eq!(summary.merged(), 2);
    assert_eq!(summary.skipped(), 1);
    assert!(matches!(
        summary.reports[1].outcome,
        sandhi::FrameOutcome::Skipped(_)
    ));
    assert!(summary.output_points > 0);
}

#[test]
fn test_single_file_input() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), "scanD4.pcd", &flat_plane(0.0, 1000, 3));

    let summary = BatchPipeline::new(cleanup_config())
        .run(&InputSource::File(dir.path().join("scanD4.pcd")), None, None)
        .unwrap();

    assert_eq!(summary.merged(), 1);
    assert_eq!(summary.output_path, dir.path().join("filtered.pcd"));
    let n = summary.output_points as f32;
    assert!((n - 100.0).abs() <= 10.0, "{}", n);
}

#[test]
fn test_empty_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), "nothing here").unwrap();

    let err = BatchPipeline::new(cleanup_config())
        .run(&InputSource::Directory(dir.path().to_path_buf()), None, None)
        .unwrap_err();
    assert!(matches!(err, StitchError::NoEligibleFrames(_)));
    assert!(!dir.path().join("filtered.pcd").exists());
}

#[test]
fn test_too_few_pose_records_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    for k in 1..=3 {
        write_frame(dir.path(), &format!("scanD{}.pcd", k), &flat_plane(0.0, 100, k));
    }
    // Two records for three frames
    fs::write(
        dir.path().join("transforms.csv"),
        "header\n0;0;0;0;0;0\n0;0;0;1;0;0\n",
    )
    .unwrap();

    let mut config = cleanup_config();
    config.transforms.rows_per_frame = Some(1);
    let err = BatchPipeline::new(config)
        .run(
            &InputSource::Directory(dir.path().to_path_buf()),
            Some(&dir.path().join("transforms.csv")),
            None,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        StitchError::TransformFile(TransformFileError::FrameCountMismatch { .. })
    ));
}

#[test]
fn test_malformed_pose_row_reports_line() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), "scanD1.pcd", &flat_plane(0.0, 100, 1));
    fs::write(dir.path().join("transforms.csv"), "header\n0;0;0;x;0;0\n").unwrap();

    let err = BatchPipeline::new(cleanup_config())
        .run(
            &InputSource::Directory(dir.path().to_path_buf()),
            Some(&dir.path().join("transforms.csv")),
            None,
        )
        .unwrap_err();
    match err {
        StitchError::TransformFile(TransformFileError::MalformedInput { line, .. }) => {
            assert_eq!(line, 2)
        }
        other => panic!("unexpected error: {}", other),
    }
}
