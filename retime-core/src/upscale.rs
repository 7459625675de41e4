//! Video upscaling pipeline.
//!
//! A much simpler sibling of the interpolation pipeline: extract frames,
//! run an external super-resolution executor over the whole directory, and
//! reassemble at the source frame rate. Shares the frame store, external
//! layer, and cleanup guarantees.

use crate::config::CoreConfig;
use crate::error::{empty_store_error, CoreError, CoreResult};
use crate::external::ffmpeg::extract_frames;
use crate::external::ffmpeg_executor::FfmpegSpawner;
use crate::external::ffprobe_executor::FfprobeExecutor;
use crate::frames::FrameStore;
use crate::pipeline::ScratchDirs;
use crate::reconstruct::{reconstruct_video, unique_output_path, OutputFormat};
use crate::util::command::run_command;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Supported ncnn upscaling executables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpscaleModel {
    RealSr,
    Waifu2x,
}

impl UpscaleModel {
    pub fn executable_name(&self) -> &'static str {
        match self {
            UpscaleModel::RealSr => "realsr-ncnn-vulkan",
            UpscaleModel::Waifu2x => "waifu2x-ncnn-vulkan",
        }
    }
}

/// A super-resolution executor with a directory-in/directory-out contract.
pub trait Upscaler {
    fn upscale(&self, input_dir: &Path, output_dir: &Path) -> CoreResult<()>;
}

/// Production upscaler shelling out to a ncnn executable.
#[derive(Debug, Clone)]
pub struct NcnnUpscaler {
    executable: PathBuf,
    scale: u32,
    gpu_id: Option<u32>,
}

impl NcnnUpscaler {
    pub fn new(model: UpscaleModel, scale: u32, gpu_id: Option<u32>) -> Self {
        Self {
            executable: PathBuf::from(model.executable_name()),
            scale,
            gpu_id,
        }
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }
}

impl Upscaler for NcnnUpscaler {
    fn upscale(&self, input_dir: &Path, output_dir: &Path) -> CoreResult<()> {
        std::fs::create_dir_all(output_dir)?;

        let mut cmd = Command::new(&self.executable);
        cmd.arg("-i").arg(input_dir);
        cmd.arg("-o").arg(output_dir);
        cmd.args(["-s", &self.scale.to_string()]);
        cmd.args(["-f", "png"]);
        if let Some(g) = self.gpu_id {
            cmd.args(["-g", &g.to_string()]);
        }

        run_command(&mut cmd, "upscaler")?;
        Ok(())
    }
}

/// One upscaling job.
#[derive(Debug, Clone)]
pub struct UpscaleJob {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Output container override; derived from the output extension when
    /// unset.
    pub output_format: Option<OutputFormat>,
}

const EXTRACT_DIR: &str = "upscale_frames";
const UPSCALED_DIR: &str = "upscaled_frames";

/// Runs one upscale job end to end and returns the path the video was
/// written to. Scratch directories are removed on every exit path.
pub fn run_upscale_job<S, P, U>(
    config: &CoreConfig,
    job: &UpscaleJob,
    spawner: &S,
    prober: &P,
    upscaler: &U,
) -> CoreResult<PathBuf>
where
    S: FfmpegSpawner,
    P: FfprobeExecutor,
    U: Upscaler,
{
    config.validate()?;
    if !job.input.is_file() {
        return Err(CoreError::InvalidInput(format!(
            "Input video not found: {}",
            job.input.display()
        )));
    }

    log::info!(
        "Starting upscale job: {} -> {}",
        job.input.display(),
        job.output.display()
    );

    let dirs = ScratchDirs::create(&config.temp_root, &[EXTRACT_DIR, UPSCALED_DIR])?;
    let result = execute(job, spawner, prober, upscaler, &dirs);
    dirs.cleanup();
    match &result {
        Ok(path) => log::info!("Upscale complete: {}", path.display()),
        Err(e) => log::error!("Upscale aborted: {e}"),
    }
    result
}

fn execute<S, P, U>(
    job: &UpscaleJob,
    spawner: &S,
    prober: &P,
    upscaler: &U,
    dirs: &ScratchDirs,
) -> CoreResult<PathBuf>
where
    S: FfmpegSpawner,
    P: FfprobeExecutor,
    U: Upscaler,
{
    let extracted = FrameStore::new(dirs.dir(EXTRACT_DIR));
    extract_frames(spawner, &job.input, extracted.path())?;
    if extracted.is_empty()? {
        return Err(empty_store_error(extracted.path()));
    }

    let upscaled = FrameStore::new(dirs.dir(UPSCALED_DIR));
    log::info!("Upscaling {} frames", extracted.count()?);
    upscaler.upscale(extracted.path(), upscaled.path())?;
    if upscaled.is_empty()? {
        return Err(empty_store_error(upscaled.path()));
    }

    let fps = prober.average_frame_rate(&job.input)?;
    let output = unique_output_path(&job.output);
    let format = job
        .output_format
        .unwrap_or_else(|| OutputFormat::from_path(&output));
    reconstruct_video(spawner, &upscaled, &job.input, &output, fps, format)?;

    Ok(output)
}
