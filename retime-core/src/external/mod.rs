//! Interactions with external CLI tools.
//!
//! Everything that crosses a process boundary lives here: ffmpeg (frame
//! extraction and video reconstruction) behind the spawner trait pair, and
//! ffprobe (media probing) behind an executor trait. The traits exist so
//! the pipeline can be exercised in tests without the real binaries.

use crate::error::{command_start_error, CoreError, CoreResult};
use std::io;
use std::process::{Command, Stdio};

pub mod ffmpeg;
pub mod ffmpeg_executor;
pub mod ffprobe_executor;

pub use ffmpeg::{encode_gif, encode_video, extract_frames};
pub use ffmpeg_executor::{FfmpegProcess, FfmpegSpawner, SidecarProcess, SidecarSpawner};
pub use ffprobe_executor::{CrateFfprobeExecutor, FfprobeExecutor};

/// Checks that a required external command exists and starts.
///
/// Runs `<cmd> -version` and discards the output; only the ability to
/// launch matters here, not the exit status (some ncnn tools exit non-zero
/// on `-version`).
pub fn check_dependency(cmd_name: &str) -> CoreResult<()> {
    let result = Command::new(cmd_name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {cmd_name}");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{cmd_name}' not found");
            Err(CoreError::DependencyNotFound(cmd_name.to_string()))
        }
        Err(e) => {
            log::error!("Failed to start dependency check for '{cmd_name}': {e}");
            Err(command_start_error(cmd_name, e))
        }
    }
}
