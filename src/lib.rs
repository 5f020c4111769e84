//! isaforge - multi-target GPU kernel build and ISA analysis.
//!
//! isaforge compiles OpenCL kernel sources for one or more GPU targets with an
//! external LLVM toolchain, disassembles each binary, splits the disassembly
//! into one ISA file per kernel and trims it to the kernel's real code size.
//! Optional passes derive parsed-ISA tables, resource statistics, live
//! register reports, control-flow graphs and code object metadata.
//!
//! # Primary Usage
//!
//! ```ignore
//! use isaforge::{Commander, CompileRequest, TargetResolver};
//! use isaforge::toolchain::{ElfInspector, LightningToolchain, Toolchain, ToolchainPaths};
//!
//! let lightning = LightningToolchain::new(ToolchainPaths::default());
//! let elf = ElfInspector::new();
//! let toolchain = Toolchain {
//!     compiler: &lightning,
//!     disassembler: &lightning,
//!     kernels: &elf,
//!     code_size: &elf,
//!     metadata: &lightning,
//!     analyzer: None,
//! };
//!
//! let request = CompileRequest {
//!     devices: vec!["gfx1030".into(), "gfx906".into()],
//!     sources: vec!["vadd.cl".into()],
//!     ..CompileRequest::default()
//! };
//! let report = Commander::new(toolchain, TargetResolver::builtin()).run(&request)?;
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Errors, configuration, output naming, Output Metadata Store
//! - [`target`] - Device name resolution
//! - [`toolchain`] - External compiler, disassembler and analyzer services
//! - [`isa`] - ISA splitting, reduction and text analysis
//! - [`pipeline`] - Per-target orchestration and post-processing

pub mod core;
pub mod isa;
pub mod pipeline;
pub mod target;
pub mod toolchain;

pub use core::{
    // Configuration
    CompileRequest, OpenClOptions, OutputRequest, Workspace,
    // Errors
    ErrorCategory, PipelineError, PipelineResult,
    // Output Metadata Store
    OutputRecord, OutputStore, RecordKey, SessionStats,
};
pub use pipeline::{CancelToken, Commander, RunReport};
pub use target::{Resolution, TargetResolver};
