//! Subprocess helpers shared by every external tool wrapper.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use crate::core::{PipelineError, PipelineResult};

/// Captured result of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    /// Exit status as text, for diagnostics.
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Turn a failed invocation into a `ToolFailed` error carrying its stderr.
    pub fn into_result(self, tool: &str) -> PipelineResult<ToolOutput> {
        if self.success {
            Ok(self)
        } else {
            Err(PipelineError::ToolFailed {
                tool: tool.to_string(),
                status: self.status,
                stderr: self.stderr,
            })
        }
    }
}

/// Run `program` with `args` to completion and capture its output.
///
/// With `print_cmd` the command line is echoed to stdout before running.
pub fn run_tool(program: &Path, args: &[OsString], print_cmd: bool) -> PipelineResult<ToolOutput> {
    let command_line = format_command_line(program, args);
    log::debug!("Running: {}", command_line);
    if print_cmd {
        println!("{}", command_line);
    }

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| PipelineError::ToolLaunch {
            tool: program.display().to_string(),
            source,
        })?;

    let result = ToolOutput {
        success: output.status.success(),
        status: output.status.to_string(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    if !result.success {
        log::debug!("{} exited with {}", program.display(), result.status);
    }
    Ok(result)
}

fn format_command_line(program: &Path, args: &[OsString]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}
