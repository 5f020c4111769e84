// This module serves as the hub for isaforge's shared infrastructure. It exports the
// error taxonomy used by every stage, the run configuration types (what to compile,
// with which options, and which artifacts to produce), the output/temporary file naming
// rules, and the Output Metadata Store that the compile orchestrator fills and the
// post-processing passes read. Nothing here talks to external tools or parses ISA.

//! Core isaforge infrastructure.
//!
//! # Key Components
//!
//! ## Errors (`error`)
//! - `PipelineError` with a configuration / external-process / parsing / I/O split
//!
//! ## Configuration (`config`)
//! - `CompileRequest`, `OpenClOptions`, `OutputRequest`, `Workspace`
//!
//! ## Naming (`naming`)
//! - `{base}-{device}[-{kernel}].{ext}` for user artifacts
//! - collision-free temporary names
//!
//! ## Output Metadata Store (`session`)
//! - `(device, kernel) -> OutputRecord` table plus run statistics

pub mod config;
pub mod error;
pub mod naming;
pub mod session;
pub mod test_utils;

pub use config::{CompileRequest, OpenClOptions, OutputRequest, Workspace};

pub use error::{ErrorCategory, PipelineError, PipelineResult};

pub use session::{OutputRecord, OutputStore, RecordKey, SessionStats};
