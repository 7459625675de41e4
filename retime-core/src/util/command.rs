//! Blocking execution of external command-line tools.

use crate::error::{command_failed_error, command_start_error, CoreResult};
use log::debug;
use std::process::{Command, Output};

fn format_command(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Runs a command to completion and returns its output.
///
/// A non-zero exit is mapped to an `ExternalTool` error carrying the exit
/// status and captured stderr. There is no timeout; a hang in the external
/// tool hangs the job.
pub fn run_command(cmd: &mut Command, tool: &str) -> CoreResult<Output> {
    debug!("Running {tool}: {}", format_command(cmd));

    let output = cmd
        .output()
        .map_err(|e| command_start_error(tool, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        log::error!(
            "{tool} failed with {}: {}",
            output.status,
            stderr.trim()
        );
        return Err(command_failed_error(tool, output.status, stderr.trim()));
    }

    Ok(output)
}
