use std::fmt::Display;
use std::path::Path;
use std::process::ExitStatus;
use thiserror::Error;

/// Custom error types for retime
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame store at '{0}' contains no frames")]
    EmptyStore(String),

    #[error("Invalid target frame count: {0}")]
    InvalidTarget(String),

    #[error("{tool} exited with {status}: {stderr}")]
    ExternalTool {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Failed to start {0}: {1}")]
    CommandStart(String, String),

    #[error("Video reconstruction failed: {0}")]
    Reconstruction(String),

    #[error("Failed to parse ffprobe output: {0}")]
    FfprobeParse(String),

    #[error("Video info error: {0}")]
    VideoInfo(String),

    #[error("Required external tool not found: {0}")]
    DependencyNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid path: {0}")]
    PathError(String),
}

/// Result type for retime operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Builds an `ExternalTool` error from a finished process.
pub fn command_failed_error(
    tool: &str,
    status: ExitStatus,
    stderr: impl Display,
) -> CoreError {
    CoreError::ExternalTool {
        tool: tool.to_string(),
        status: status
            .code()
            .map_or_else(|| "unknown status".to_string(), |c| format!("code {c}")),
        stderr: stderr.to_string(),
    }
}

/// Builds a `CommandStart` error for a process that could not be spawned.
pub fn command_start_error(tool: &str, err: impl Display) -> CoreError {
    CoreError::CommandStart(tool.to_string(), err.to_string())
}

/// Builds an `EmptyStore` error for a frame directory.
pub fn empty_store_error(dir: &Path) -> CoreError {
    CoreError::EmptyStore(dir.display().to_string())
}
