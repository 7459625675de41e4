//! Interpolation engines and the frame-count dispatcher.
//!
//! The dispatcher makes a frame store reach an exact target count using an
//! external interpolation executor. Engines that accept an explicit output
//! count get a single invocation; legacy engines that can only double are
//! driven through repeated doubling passes followed by a spaced trim.

use crate::error::{CoreError, CoreResult};
use crate::frames::FrameStore;
use crate::util::command::run_command;
use std::path::{Path, PathBuf};
use std::process::Command;

/// How an engine can be asked for output frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCapability {
    /// The engine accepts an explicit target frame count per invocation.
    ExplicitCount,
    /// The engine exactly doubles the frame count per invocation.
    DoublingOnly,
}

/// A capability-tagged engine descriptor, selected once per job and passed
/// down instead of scattering model-name checks through the pipeline.
#[derive(Debug, Clone)]
pub struct Engine {
    pub model: String,
    pub capability: EngineCapability,
}

impl Engine {
    /// Models that support `-n <target_frames>` directly.
    const EXPLICIT_COUNT_MODELS: &'static [&'static str] = &["rife-v4", "rife-v4.6"];

    pub fn from_model(model: &str) -> Self {
        let capability = if Self::EXPLICIT_COUNT_MODELS.contains(&model) {
            EngineCapability::ExplicitCount
        } else {
            EngineCapability::DoublingOnly
        };
        Self {
            model: model.to_string(),
            capability,
        }
    }
}

/// Per-engine tuning flags, immutable for the duration of one job.
#[derive(Debug, Clone, Default)]
pub struct InterpolationParams {
    /// RIFE v4.x time step (`-s`).
    pub time_step: Option<f64>,
    /// GPU device index (`-g`).
    pub gpu_id: Option<u32>,
    /// Thread configuration such as `4:4:4` (`-j`).
    pub thread_config: Option<String>,
    /// Test-time augmentation (`-x`).
    pub tta: bool,
    /// Temporal test-time augmentation (`-z`).
    pub temporal_tta: bool,
    /// UHD mode (`-u`).
    pub uhd: bool,
    /// Output pattern format override (`-f`).
    pub pattern_format: Option<String>,
}

/// One invocation of an interpolation executor: a directory of ordered
/// frames in, an interpolated directory of frames out. `target_frames`
/// carries the explicit output count for engines that support it; `None`
/// implies exact doubling.
pub trait FrameInterpolator {
    fn interpolate(
        &self,
        engine: &Engine,
        params: &InterpolationParams,
        input_dir: &Path,
        output_dir: &Path,
        target_frames: Option<u64>,
    ) -> CoreResult<()>;
}

/// Production interpolator shelling out to rife-ncnn-vulkan.
#[derive(Debug, Clone)]
pub struct RifeInterpolator {
    executable: PathBuf,
}

impl RifeInterpolator {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl FrameInterpolator for RifeInterpolator {
    fn interpolate(
        &self,
        engine: &Engine,
        params: &InterpolationParams,
        input_dir: &Path,
        output_dir: &Path,
        target_frames: Option<u64>,
    ) -> CoreResult<()> {
        std::fs::create_dir_all(output_dir)?;

        let mut cmd = Command::new(&self.executable);
        cmd.arg("-i").arg(input_dir);
        cmd.arg("-o").arg(output_dir);
        cmd.arg("-m").arg(&engine.model);
        cmd.args(["-f", "png"]);
        if let Some(n) = target_frames {
            cmd.args(["-n", &n.to_string()]);
            if let Some(s) = params.time_step {
                cmd.args(["-s", &s.to_string()]);
            }
        }
        if let Some(g) = params.gpu_id {
            cmd.args(["-g", &g.to_string()]);
        }
        if let Some(j) = &params.thread_config {
            cmd.args(["-j", j]);
        }
        if params.tta {
            cmd.arg("-x");
        }
        if params.temporal_tta {
            cmd.arg("-z");
        }
        if params.uhd {
            cmd.arg("-u");
        }
        if let Some(f) = &params.pattern_format {
            cmd.args(["-f", f]);
        }

        run_command(&mut cmd, "rife-ncnn-vulkan")?;
        Ok(())
    }
}

/// Brings `input` to exactly `target_count` frames in `output`.
///
/// Dispatch:
/// - already at or above the target: direct copy, then a spaced trim when
///   strictly above — zero executor invocations;
/// - `ExplicitCount` engine: one invocation with the target count;
/// - `DoublingOnly` engine: `ceil(log2(target / current))` doubling passes
///   into fresh directories under `pass_root`, stopping early once the
///   count is reached, then a final copy and spaced trim.
///
/// `preserve_original` biases the trim away from source-tagged frames.
/// Returns the resulting frame count, always exactly `target_count` for a
/// non-empty input.
pub fn interpolate_to_count<I: FrameInterpolator>(
    interpolator: &I,
    engine: &Engine,
    params: &InterpolationParams,
    input: &FrameStore,
    output: &FrameStore,
    target_count: u64,
    preserve_original: bool,
    pass_root: &Path,
) -> CoreResult<u64> {
    if target_count == 0 {
        return Err(CoreError::InvalidTarget(
            "target frame count must be at least 1".to_string(),
        ));
    }
    let current = input.count()?;
    if current == 0 {
        return Err(crate::error::empty_store_error(input.path()));
    }

    if current >= target_count {
        log::info!(
            "Already have {current} frames (target {target_count}); copying{}",
            if current > target_count { " and trimming" } else { "" }
        );
        output.clear()?;
        input.copy_into(output)?;
        output.spaced_removal(target_count, preserve_original)?;
        return output.count();
    }

    match engine.capability {
        EngineCapability::ExplicitCount => {
            log::info!(
                "[{}] Single-pass interpolation {current} -> {target_count} frames",
                engine.model
            );
            output.clear()?;
            interpolator.interpolate(
                engine,
                params,
                input.path(),
                output.path(),
                Some(target_count),
            )?;
            output.spaced_removal(target_count, preserve_original)?;
        }
        EngineCapability::DoublingOnly => {
            let factor = target_count as f64 / current as f64;
            let passes = factor.log2().ceil() as u32;
            log::info!(
                "[{}] Multi-pass doubling: {passes} pass(es) to exceed {target_count} frames",
                engine.model
            );

            let mut source = input.clone();
            for pass in 1..=passes {
                let pass_store = FrameStore::new(pass_root.join(format!("pass_{pass}")));
                pass_store.clear()?;

                log::info!("Pass {pass}/{passes}: doubling {} frames", source.count()?);
                interpolator.interpolate(
                    engine,
                    params,
                    source.path(),
                    pass_store.path(),
                    None,
                )?;

                let new_count = pass_store.count()?;
                source = pass_store;
                if new_count >= target_count {
                    log::info!("Reached {new_count} frames; stopping early");
                    break;
                }
            }

            output.clear()?;
            source.copy_into(output)?;
            output.spaced_removal(target_count, preserve_original)?;
        }
    }

    let final_count = output.count()?;
    log::debug!(
        "Dispatch complete: {} now holds {final_count} frames",
        output.path().display()
    );
    Ok(final_count)
}
