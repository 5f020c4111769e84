// This module defines error types for isaforge using the thiserror crate for idiomatic
// Rust error handling. PipelineError is the single error enum shared by every stage of
// the build-and-analyze pipeline. Its variants fall into four groups: configuration
// errors (unknown device, missing input, unknown kernel name, missing analyzer),
// external-process errors (a tool could not be launched, exited with failure, or did
// not produce its expected output), parsing errors (malformed ISA, inverted kernel spans,
// unreadable code objects) and I/O errors (file create/write/delete failures). Every
// variant carries enough context (tool name, device, path, captured stderr) to be
// reported on its own. ErrorCategory exposes the grouping so callers can decide which
// failures are fatal for a whole batch and which only affect one target.

//! Error types for the isaforge pipeline.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    ExternalProcess,
    Parsing,
    Io,
}

/// Main error type for the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("unknown device name provided: {device}. Cannot compile for this target")]
    UnknownDevice { device: String },

    #[error("no valid target device was resolved from the requested devices")]
    NoTargets,

    #[error("no input file")]
    NoInputFile,

    #[error("cannot find OpenCL kernel: {name}")]
    UnknownKernel { name: String },

    #[error("no ISA analyzer configured; required for {pass}")]
    MissingAnalyzer { pass: &'static str },

    #[error("failed to launch {tool}: {source}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} failed ({status})\n{stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} did not produce {}", .path.display())]
    MissingOutput { tool: String, path: PathBuf },

    #[error("kernel spans are out of order in the disassembly of {}", .binary.display())]
    SplitIsa { binary: PathBuf },

    #[error("code size unavailable for kernel {kernel}")]
    CodeSizeUnavailable { kernel: String },

    #[error("cannot read code object {}: {reason}", .path.display())]
    CodeObject { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize session metadata: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Wrap an I/O error together with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::UnknownDevice { .. }
            | PipelineError::NoTargets
            | PipelineError::NoInputFile
            | PipelineError::UnknownKernel { .. }
            | PipelineError::MissingAnalyzer { .. } => ErrorCategory::Configuration,
            PipelineError::ToolLaunch { .. }
            | PipelineError::ToolFailed { .. }
            | PipelineError::MissingOutput { .. } => ErrorCategory::ExternalProcess,
            PipelineError::SplitIsa { .. }
            | PipelineError::CodeSizeUnavailable { .. }
            | PipelineError::CodeObject { .. } => ErrorCategory::Parsing,
            PipelineError::Io { .. } | PipelineError::Json(_) => ErrorCategory::Io,
        }
    }
}

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
