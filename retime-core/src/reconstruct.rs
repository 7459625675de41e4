//! Final video assembly from an interpolated frame store.

use crate::error::{CoreError, CoreResult};
use crate::external::ffmpeg::{encode_gif, encode_video};
use crate::external::ffmpeg_executor::FfmpegSpawner;
use crate::frames::{FrameStore, PALETTE_FILE};
use std::path::{Path, PathBuf};

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Video container (libx264 + aac recipe).
    Video,
    /// Animated GIF (palette recipe).
    Gif,
}

impl OutputFormat {
    /// Derives the format from a path's extension; anything that is not
    /// `gif` encodes as video.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gif") => Self::Gif,
            _ => Self::Video,
        }
    }
}

/// Returns `output` unchanged when free, otherwise a timestamp-suffixed
/// alternate so an existing file is never clobbered.
pub fn unique_output_path(output: &Path) -> PathBuf {
    if !output.exists() {
        return output.to_path_buf();
    }
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let candidate = match output.extension().and_then(|e| e.to_str()) {
        Some(ext) => output.with_file_name(format!("{stem}_{timestamp}.{ext}")),
        None => output.with_file_name(format!("{stem}_{timestamp}")),
    };
    log::warn!(
        "Output '{}' exists; writing to '{}' instead",
        output.display(),
        candidate.display()
    );
    candidate
}

/// Rebuilds a video from the final frame store.
///
/// Renumbers the store contiguously so the encode recipes can address
/// frames by a fixed pattern, then runs the format-appropriate recipe. An
/// empty store here means an upstream stage broke its invariant; it is
/// reported as a `Reconstruction` error rather than recovered.
pub fn reconstruct_video<S: FfmpegSpawner>(
    spawner: &S,
    frames: &FrameStore,
    source_video: &Path,
    output: &Path,
    frame_rate: f64,
    format: OutputFormat,
) -> CoreResult<()> {
    if frames.is_empty()? {
        return Err(CoreError::Reconstruction(format!(
            "no frames in {} to reconstruct from",
            frames.path().display()
        )));
    }

    frames.renumber_contiguous()?;

    log::info!(
        "Reconstructing {} at {frame_rate:.3} fps from {}",
        output.display(),
        frames.path().display()
    );
    match format {
        OutputFormat::Gif => {
            let palette = frames.path().join(PALETTE_FILE);
            encode_gif(spawner, frames.path(), &palette, frame_rate, output)
        }
        OutputFormat::Video => {
            encode_video(spawner, frames.path(), source_video, frame_rate, output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn format_follows_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("out.gif")), OutputFormat::Gif);
        assert_eq!(OutputFormat::from_path(Path::new("out.GIF")), OutputFormat::Gif);
        assert_eq!(OutputFormat::from_path(Path::new("out.mp4")), OutputFormat::Video);
        assert_eq!(OutputFormat::from_path(Path::new("out")), OutputFormat::Video);
    }

    #[test]
    fn unique_path_passes_through_when_free() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("clip.mp4");
        assert_eq!(unique_output_path(&target), target);
    }

    #[test]
    fn unique_path_appends_timestamp_when_taken() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("clip.mp4");
        File::create(&target).unwrap();

        let alternate = unique_output_path(&target);
        assert_ne!(alternate, target);
        let name = alternate.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("clip_"));
        assert!(name.ends_with(".mp4"));
    }
}
