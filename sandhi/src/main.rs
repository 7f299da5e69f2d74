//! Sandhi - offline multi-scan point cloud stitching
//!
//! Merges a directory (or a single file) of PCD scans into one denoised,
//! downsampled cloud:
//! - **Cleanup mode**: pose-prior correction, wall segmentation, parallel merge
//! - **Stitch mode**: additionally registers every frame (SAC-IA + ICP)
//!   against the growing model
//!
//! # Usage
//!
//! ```bash
//! # Clean up and merge a directory of scans
//! sandhi -d scans/
//!
//! # Stitch with pose priors and a custom config
//! sandhi -d scans/ -t transforms.csv --mode stitch -c sandhi.toml
//!
//! # Single file, explicit output
//! sandhi -f scans/scanD3.pcd -o cleaned.pcd
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};

use sandhi::config::SandhiConfig;
use sandhi::engine::{BatchPipeline, InputSource, PipelineMode};
use sandhi::error::{Result, StitchError};

#[derive(Parser, Debug)]
#[command(name = "sandhi")]
#[command(about = "Stitch multiple point cloud scans into one model")]
#[command(group(ArgGroup::new("input").required(true).args(["file", "directory"])))]
struct Args {
    /// Single PCD frame
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Directory of PCD frames (`scanD1.pcd`, `scanD2.pcd`, ...)
    #[arg(short, long)]
    directory: Option<PathBuf>,

    /// Pose-prior file (rotx, roty, rotz, dx, dy, dz[, confidence] per row)
    #[arg(short, long)]
    transforms: Option<PathBuf>,

    /// TOML config file (default: ./sandhi.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pipeline mode (overrides the config file)
    #[arg(long, value_enum)]
    mode: Option<PipelineMode>,

    /// Worker threads (overrides the config file)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Output file (default: filtered.pcd next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Args {
    fn input(&self) -> Result<InputSource> {
        match (&self.file, &self.directory) {
            (Some(file), None) => Ok(InputSource::File(file.clone())),
            (None, Some(dir)) => Ok(InputSource::Directory(dir.clone())),
            _ => Err(StitchError::InvalidArguments(
                "exactly one of -f <file> or -d <directory> is required".to_string(),
            )),
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let input = args.input()?;
    if args.workers == Some(0) {
        return Err(StitchError::InvalidArguments(
            "--workers must be at least 1".to_string(),
        ));
    }

    let config =
        SandhiConfig::resolve(args.config.as_deref())?.with_overrides(args.mode, args.workers);
    let pipeline = BatchPipeline::new(config.to_batch_config());

    let summary = pipeline.run(&input, args.transforms.as_deref(), args.output.as_deref())?;
    if summary.merged() == 0 {
        log::warn!("No frame was merged; output is empty");
    }
    Ok(())
}
