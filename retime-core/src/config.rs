//! Configuration structures and constants for the retime-core library.
//!
//! Everything a pipeline run depends on (executable locations, detection
//! thresholds, the temp directory root) is carried explicitly in
//! `CoreConfig` rather than read from ambient global state, so jobs stay
//! independently testable and safe to run from separate processes.

use crate::error::{CoreError, CoreResult};
use std::path::PathBuf;

// Default constants

/// Zero-padding width for frame filenames (`frame_%08d.png`). Wide enough
/// that lexical sort order matches numeric order for any realistic clip.
pub const FRAME_PADDING: usize = 8;

/// Default grayscale mean-absolute-difference threshold (0-255 scale) above
/// which two consecutive frames count as distinct.
pub const DEFAULT_DIFF_THRESHOLD: f64 = 5.0;

/// Duplication rates within this epsilon of 1.0 are treated as "no
/// duplicates" and skip the removal branch entirely.
pub const DEFAULT_DUPLICATION_EPSILON: f64 = 0.01;

/// Filename prefix tagging frames that originate from the source video
/// rather than from interpolation. Spaced removal biases away from these
/// when asked to preserve originals.
pub const ORIGINAL_FRAME_PREFIX: &str = "orig_";

/// Main configuration structure for the retime-core library.
///
/// Typically created by the consumer (e.g. retime-cli) via
/// [`CoreConfigBuilder`] and passed to `run_interpolation_job` /
/// `run_upscale_job`.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Root directory under which each job creates its working directories.
    /// Concurrent jobs must be given distinct roots; the core does no
    /// locking of a shared root.
    pub temp_root: PathBuf,

    /// Path to the rife-ncnn-vulkan executable.
    pub rife_path: PathBuf,

    /// Grayscale difference threshold for duplicate detection.
    pub diff_threshold: f64,

    /// Epsilon above 1.0 below which duplicate removal is skipped.
    pub duplication_epsilon: f64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            temp_root: PathBuf::from("."),
            rife_path: PathBuf::from("rife-ncnn-vulkan"),
            diff_threshold: DEFAULT_DIFF_THRESHOLD,
            duplication_epsilon: DEFAULT_DUPLICATION_EPSILON,
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::new()
    }

    /// Checks the configuration for values the pipeline cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.diff_threshold.is_finite() || self.diff_threshold < 0.0 {
            return Err(CoreError::InvalidInput(format!(
                "diff_threshold must be a non-negative number, got {}",
                self.diff_threshold
            )));
        }
        if !self.duplication_epsilon.is_finite() || self.duplication_epsilon < 0.0 {
            return Err(CoreError::InvalidInput(format!(
                "duplication_epsilon must be a non-negative number, got {}",
                self.duplication_epsilon
            )));
        }
        if self.temp_root.as_os_str().is_empty() {
            return Err(CoreError::PathError(
                "temp_root must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`CoreConfig`].
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: CoreConfig::default(),
        }
    }

    pub fn temp_root(mut self, path: PathBuf) -> Self {
        self.config.temp_root = path;
        self
    }

    pub fn rife_path(mut self, path: PathBuf) -> Self {
        self.config.rife_path = path;
        self
    }

    pub fn diff_threshold(mut self, threshold: f64) -> Self {
        self.config.diff_threshold = threshold;
        self
    }

    pub fn duplication_epsilon(mut self, epsilon: f64) -> Self {
        self.config.duplication_epsilon = epsilon;
        self
    }

    pub fn build(self) -> CoreConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CoreConfig::default().validate().is_ok());
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let config = CoreConfig::builder().diff_threshold(-1.0).build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_sets_fields() {
        let config = CoreConfig::builder()
            .temp_root(PathBuf::from("/tmp/retime"))
            .diff_threshold(12.0)
            .duplication_epsilon(0.05)
            .build();
        assert_eq!(config.temp_root, PathBuf::from("/tmp/retime"));
        assert_eq!(config.diff_threshold, 12.0);
        assert_eq!(config.duplication_epsilon, 0.05);
    }
}
