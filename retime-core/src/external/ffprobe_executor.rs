//! FFprobe integration for media probing.

use crate::error::{command_failed_error, command_start_error, CoreError, CoreResult};
use ffprobe::{ffprobe, FfProbeError};
use std::path::Path;

/// Frame rate assumed when ffprobe reports something unparsable.
const FALLBACK_FPS: f64 = 30.0;

/// Media probing operations the pipeline needs from ffprobe.
pub trait FfprobeExecutor {
    /// Average frame rate of the first video stream, in frames per second.
    fn average_frame_rate(&self, input: &Path) -> CoreResult<f64>;
}

/// Concrete [`FfprobeExecutor`] using the ffprobe crate.
#[derive(Debug, Clone, Default)]
pub struct CrateFfprobeExecutor;

impl CrateFfprobeExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl FfprobeExecutor for CrateFfprobeExecutor {
    fn average_frame_rate(&self, input: &Path) -> CoreResult<f64> {
        log::debug!(
            "Running ffprobe (via crate) for frame rate on: {}",
            input.display()
        );
        match ffprobe(input) {
            Ok(metadata) => {
                let video_stream = metadata
                    .streams
                    .iter()
                    .find(|s| s.codec_type.as_deref() == Some("video"))
                    .ok_or_else(|| {
                        CoreError::VideoInfo(format!(
                            "No video stream found in {}",
                            input.display()
                        ))
                    })?;

                match parse_frame_rate(&video_stream.avg_frame_rate) {
                    Some(fps) => Ok(fps),
                    None => {
                        log::warn!(
                            "Could not parse frame rate '{}' for {}; defaulting to {FALLBACK_FPS}",
                            video_stream.avg_frame_rate,
                            input.display()
                        );
                        Ok(FALLBACK_FPS)
                    }
                }
            }
            Err(err) => {
                log::error!("ffprobe failed for {}: {err:?}", input.display());
                Err(map_ffprobe_error(err, "frame rate"))
            }
        }
    }
}

/// Parses ffprobe's rational `num/den` frame rate notation (a bare number
/// is accepted too).
fn parse_frame_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let fps = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

fn map_ffprobe_error(err: FfProbeError, context: &str) -> CoreError {
    match err {
        FfProbeError::Io(io_err) => command_start_error(&format!("ffprobe ({context})"), io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            command_failed_error(&format!("ffprobe ({context})"), output.status, stderr)
        }
        FfProbeError::Deserialize(err) => CoreError::FfprobeParse(format!(
            "ffprobe {context} output deserialization: {err}"
        )),
        _ => CoreError::FfprobeParse(format!("Unknown ffprobe error during {context}: {err:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rational_frame_rates() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("30000/1001"), Some(30000.0 / 1001.0));
        assert_eq!(parse_frame_rate("24"), Some(24.0));
    }

    #[test]
    fn rejects_degenerate_frame_rates() {
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate(""), None);
        assert_eq!(parse_frame_rate("abc"), None);
        assert_eq!(parse_frame_rate("-30/1"), None);
    }
}
