//! The interpolation pipeline orchestrator.
//!
//! Sequences extraction, duplicate handling, the two dispatcher runs, and
//! reconstruction for one job, owning every temporary directory involved.
//! Cleanup is unconditional: scratch directories are pre-cleared before any
//! stage runs (so a previous failed run never leaks stale frames into this
//! one) and removed on every exit path, error or not.

use crate::config::CoreConfig;
use crate::dedup::remove_duplicates;
use crate::detection::detect_duplication_rate;
use crate::error::{empty_store_error, CoreError, CoreResult};
use crate::external::ffmpeg::extract_frames;
use crate::external::ffmpeg_executor::FfmpegSpawner;
use crate::external::ffprobe_executor::FfprobeExecutor;
use crate::frames::FrameStore;
use crate::interpolation::{interpolate_to_count, Engine, FrameInterpolator, InterpolationParams};
use crate::reconstruct::{reconstruct_video, unique_output_path, OutputFormat};
use std::cell::Cell;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// One retiming job, immutable for the duration of a pipeline run.
#[derive(Debug, Clone)]
pub struct InterpolationJob {
    /// Source video path.
    pub input: PathBuf,
    /// Requested output path; an existing file there is never overwritten.
    pub output: PathBuf,
    /// Selected interpolation engine.
    pub engine: Engine,
    /// FPS multiplier; may be non-integer. 1.0 skips the final dispatch.
    pub fps_factor: f64,
    /// Whether to detect and remove duplicated source frames first.
    pub remove_duplicates: bool,
    /// Bias spaced trimming away from source-tagged frames.
    pub preserve_original_frames: bool,
    /// Engine tuning flags.
    pub params: InterpolationParams,
    /// Output container override; derived from the output extension when
    /// unset.
    pub output_format: Option<OutputFormat>,
}

/// Pipeline stages, reported on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    DetectDuplicates,
    RemoveDuplicates,
    Restore,
    Interpolate,
    Reconstruct,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "frame extraction",
            Stage::DetectDuplicates => "duplicate detection",
            Stage::RemoveDuplicates => "duplicate removal",
            Stage::Restore => "frame count restoration",
            Stage::Interpolate => "final interpolation",
            Stage::Reconstruct => "video reconstruction",
        };
        f.write_str(name)
    }
}

fn at_stage<T>(stage: Stage, result: CoreResult<T>) -> CoreResult<T> {
    result.map_err(|e| {
        log::error!("Job failed during {stage}: {e}");
        e
    })
}

/// A set of named scratch directories under one root, cleared at creation
/// and removed when the guard goes away. Works like a scoped acquisition:
/// every exit path of the owning function releases the directories.
pub(crate) struct ScratchDirs {
    root: PathBuf,
    names: Vec<&'static str>,
    cleaned: Cell<bool>,
}

impl ScratchDirs {
    pub(crate) fn create(root: &Path, names: &[&'static str]) -> CoreResult<Self> {
        let dirs = Self {
            root: root.to_path_buf(),
            names: names.to_vec(),
            cleaned: Cell::new(false),
        };
        for name in names {
            let dir = dirs.dir(name);
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
                log::debug!("Cleared stale scratch directory {}", dir.display());
            }
            fs::create_dir_all(&dir)?;
        }
        Ok(dirs)
    }

    pub(crate) fn dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Removes every scratch directory. Failures are logged, not
    /// propagated: cleanup must never mask the job's own result.
    pub(crate) fn cleanup(&self) {
        if self.cleaned.replace(true) {
            return;
        }
        for name in &self.names {
            let dir = self.dir(name);
            if !dir.exists() {
                continue;
            }
            match fs::remove_dir_all(&dir) {
                Ok(()) => log::debug!("Removed scratch directory {}", dir.display()),
                Err(e) => log::warn!(
                    "Failed to remove scratch directory {}: {e}",
                    dir.display()
                ),
            }
        }
    }
}

impl Drop for ScratchDirs {
    fn drop(&mut self) {
        self.cleanup();
    }
}

const INPUT_FRAMES_DIR: &str = "input_frames";
const FILTERED_FRAMES_DIR: &str = "filtered_frames";
const RESTORED_FRAMES_DIR: &str = "restored_frames";
const FINAL_FRAMES_DIR: &str = "final_frames";
const PASSES_DIR: &str = "passes";

/// Runs one interpolation job end to end and returns the path the video
/// was actually written to.
///
/// All stages run sequentially; every external invocation blocks until the
/// tool exits, and a non-zero exit aborts the remaining stages. Scratch
/// directories are removed before this function returns, on every path.
pub fn run_interpolation_job<S, P, I>(
    config: &CoreConfig,
    job: &InterpolationJob,
    spawner: &S,
    prober: &P,
    interpolator: &I,
) -> CoreResult<PathBuf>
where
    S: FfmpegSpawner,
    P: FfprobeExecutor,
    I: FrameInterpolator,
{
    config.validate()?;
    if !job.input.is_file() {
        return Err(CoreError::InvalidInput(format!(
            "Input video not found: {}",
            job.input.display()
        )));
    }
    if !job.fps_factor.is_finite() || job.fps_factor <= 0.0 {
        return Err(CoreError::InvalidInput(format!(
            "fps_factor must be positive, got {}",
            job.fps_factor
        )));
    }

    log::info!(
        "Starting interpolation job: {} -> {} (engine {}, factor {})",
        job.input.display(),
        job.output.display(),
        job.engine.model,
        job.fps_factor
    );

    let dirs = ScratchDirs::create(
        &config.temp_root,
        &[
            INPUT_FRAMES_DIR,
            FILTERED_FRAMES_DIR,
            RESTORED_FRAMES_DIR,
            FINAL_FRAMES_DIR,
            PASSES_DIR,
        ],
    )?;

    let result = execute(config, job, spawner, prober, interpolator, &dirs);
    dirs.cleanup();
    match &result {
        Ok(path) => log::info!("Job complete: {}", path.display()),
        Err(e) => log::error!("Job aborted: {e}"),
    }
    result
}

fn execute<S, P, I>(
    config: &CoreConfig,
    job: &InterpolationJob,
    spawner: &S,
    prober: &P,
    interpolator: &I,
    dirs: &ScratchDirs,
) -> CoreResult<PathBuf>
where
    S: FfmpegSpawner,
    P: FfprobeExecutor,
    I: FrameInterpolator,
{
    let input_store = FrameStore::new(dirs.dir(INPUT_FRAMES_DIR));
    at_stage(
        Stage::Extract,
        extract_frames(spawner, &job.input, input_store.path()),
    )?;
    let original_count = input_store.count()?;
    if original_count == 0 {
        return at_stage(Stage::Extract, Err(empty_store_error(input_store.path())));
    }
    log::info!("Extracted {original_count} source frames");

    // Optional decimation branch. Undetermined rates and rates within
    // epsilon of 1.0 both skip it, making the restore stage a pure copy.
    let mut working = input_store;
    let mut duplicates_removed = false;
    if job.remove_duplicates {
        let rate = at_stage(
            Stage::DetectDuplicates,
            detect_duplication_rate(&working, config.diff_threshold),
        )?;
        match rate {
            Some(rate) if rate.is_significant(config.duplication_epsilon) => {
                log::info!("Duplication rate {rate} above threshold; removing duplicates");
                let filtered = FrameStore::new(dirs.dir(FILTERED_FRAMES_DIR));
                at_stage(
                    Stage::RemoveDuplicates,
                    remove_duplicates(&working, &filtered, rate),
                )?;
                working = filtered;
                duplicates_removed = true;
            }
            Some(rate) => {
                log::info!("No significant duplication (rate {rate}); skipping removal");
            }
            None => {
                log::warn!("Duplication rate undetermined; skipping removal");
            }
        }
    }

    // Fill back to the original count so playback duration is unchanged.
    let restored = FrameStore::new(dirs.dir(RESTORED_FRAMES_DIR));
    if duplicates_removed {
        log::info!("Restoring frame count to original {original_count}");
        at_stage(
            Stage::Restore,
            interpolate_to_count(
                interpolator,
                &job.engine,
                &job.params,
                &working,
                &restored,
                original_count,
                job.preserve_original_frames,
                &dirs.dir(PASSES_DIR).join("restore"),
            ),
        )?;
    } else {
        at_stage(Stage::Restore, restored.clear())?;
        at_stage(Stage::Restore, working.copy_into(&restored).map(|_| ()))?;
    }

    // Extend to the requested multiplier.
    let final_store = FrameStore::new(dirs.dir(FINAL_FRAMES_DIR));
    if (job.fps_factor - 1.0).abs() > f64::EPSILON {
        let target_count = (original_count as f64 * job.fps_factor) as u64;
        log::info!(
            "Final interpolation to factor {} => {target_count} frames",
            job.fps_factor
        );
        at_stage(
            Stage::Interpolate,
            interpolate_to_count(
                interpolator,
                &job.engine,
                &job.params,
                &restored,
                &final_store,
                target_count,
                job.preserve_original_frames,
                &dirs.dir(PASSES_DIR).join("final"),
            ),
        )?;
    } else {
        log::info!("fps_factor is 1.0; skipping final interpolation");
        at_stage(Stage::Interpolate, final_store.clear())?;
        at_stage(
            Stage::Interpolate,
            restored.copy_into(&final_store).map(|_| ()),
        )?;
    }

    // Duration is preserved, so output fps = source fps * factor.
    let source_fps = at_stage(Stage::Reconstruct, prober.average_frame_rate(&job.input))?;
    let final_fps = source_fps * job.fps_factor;
    let output = unique_output_path(&job.output);
    let format = job
        .output_format
        .unwrap_or_else(|| OutputFormat::from_path(&output));
    at_stage(
        Stage::Reconstruct,
        reconstruct_video(spawner, &final_store, &job.input, &output, final_fps, format),
    )?;

    Ok(output)
}
