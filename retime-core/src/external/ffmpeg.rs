//! FFmpeg command recipes for the retiming pipeline.
//!
//! Three invocation shapes: raw frame extraction, GIF assembly (palette
//! generation followed by palette-aware encoding), and video assembly with
//! the source file's audio mapped in.

use crate::config::FRAME_PADDING;
use crate::error::{command_failed_error, CoreResult};
use crate::external::ffmpeg_executor::{FfmpegProcess, FfmpegSpawner};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::fs;
use std::path::Path;

/// The `image2` pattern matching this crate's frame naming.
pub fn frame_pattern(dir: &Path) -> String {
    dir.join(format!("frame_%0{FRAME_PADDING}d.png"))
        .to_string_lossy()
        .into_owned()
}

/// Spawns the command, drains its event stream while buffering error-level
/// log lines, and maps a non-zero exit to an `ExternalTool` error carrying
/// that buffer.
fn run_ffmpeg<S: FfmpegSpawner>(spawner: &S, cmd: FfmpegCommand, context: &str) -> CoreResult<()> {
    log::debug!("Running ffmpeg ({context}): {cmd:?}");

    let mut process = spawner.spawn(cmd)?;

    let mut stderr_buffer = String::new();
    process.handle_events(|event| {
        if let FfmpegEvent::Log(level, line) = event {
            match level {
                LogLevel::Error | LogLevel::Fatal => {
                    stderr_buffer.push_str(&line);
                    stderr_buffer.push('\n');
                }
                _ => log::trace!("ffmpeg: {line}"),
            }
        }
        Ok(())
    })?;

    let status = process.wait()?;
    if !status.success() {
        log::error!("ffmpeg ({context}) failed: {status}");
        return Err(command_failed_error(
            &format!("ffmpeg ({context})"),
            status,
            stderr_buffer.trim(),
        ));
    }
    Ok(())
}

/// Extracts one image per decoded video frame into `output_dir`, numbered
/// in decode order. Raw pass-through decoding: no filtering or re-encoding
/// beyond the image writes themselves.
pub fn extract_frames<S: FfmpegSpawner>(
    spawner: &S,
    video: &Path,
    output_dir: &Path,
) -> CoreResult<()> {
    fs::create_dir_all(output_dir)?;

    let mut cmd = FfmpegCommand::new();
    cmd.args(["-thread_queue_size", "1024"]);
    cmd.input(video.to_string_lossy().as_ref());
    cmd.args(["-vsync", "0"]);
    cmd.output(&frame_pattern(output_dir));

    log::info!(
        "Extracting frames from {} to {}",
        video.display(),
        output_dir.display()
    );
    run_ffmpeg(spawner, cmd, "frame extraction")
}

/// Encodes a contiguously numbered frame directory into an animated GIF:
/// a palettegen pass into `palette_path`, then a paletteuse encode looping
/// indefinitely.
pub fn encode_gif<S: FfmpegSpawner>(
    spawner: &S,
    frames_dir: &Path,
    palette_path: &Path,
    frame_rate: f64,
    output: &Path,
) -> CoreResult<()> {
    let pattern = frame_pattern(frames_dir);

    let mut palette_cmd = FfmpegCommand::new();
    palette_cmd.arg("-y");
    palette_cmd.input(&pattern);
    palette_cmd.args(["-vf", "palettegen"]);
    palette_cmd.output(palette_path.to_string_lossy().as_ref());
    run_ffmpeg(spawner, palette_cmd, "palette generation")?;

    let mut cmd = FfmpegCommand::new();
    cmd.arg("-y");
    cmd.args(["-framerate", &frame_rate.to_string()]);
    cmd.input(&pattern);
    cmd.input(palette_path.to_string_lossy().as_ref());
    cmd.args([
        "-lavfi",
        &format!("fps={frame_rate}[x];[x][1:v]paletteuse"),
    ]);
    cmd.args(["-loop", "0"]);
    cmd.output(output.to_string_lossy().as_ref());
    run_ffmpeg(spawner, cmd, "gif encode")
}

/// Encodes a contiguously numbered frame directory into a video container,
/// mapping the frames to the video stream and the source file's audio (if
/// any) to the audio stream. `-shortest` keeps container length pinned to
/// the shorter of the two.
pub fn encode_video<S: FfmpegSpawner>(
    spawner: &S,
    frames_dir: &Path,
    audio_source: &Path,
    frame_rate: f64,
    output: &Path,
) -> CoreResult<()> {
    let mut cmd = FfmpegCommand::new();
    cmd.args(["-framerate", &frame_rate.to_string()]);
    cmd.input(&frame_pattern(frames_dir));
    cmd.input(audio_source.to_string_lossy().as_ref());
    cmd.args(["-map", "0:v:0"]);
    cmd.args(["-map", "1:a:0?"]);
    cmd.args(["-c:v", "libx264"]);
    cmd.args(["-crf", "18"]);
    cmd.args(["-preset", "slow"]);
    cmd.args(["-c:a", "aac"]);
    cmd.args(["-b:a", "192k"]);
    cmd.arg("-shortest");
    cmd.output(output.to_string_lossy().as_ref());
    run_ffmpeg(spawner, cmd, "video encode")
}
