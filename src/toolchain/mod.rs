// This module defines the contracts of the external services the pipeline drives, and
// their concrete implementations. The pipeline never implements a compiler or a
// disassembler: it composes options, launches the tool, and consumes exit status,
// stdout and stderr. Each service is its own trait so that tests (and alternative
// toolchains) can substitute any of them independently: Compiler (source to code object,
// plus LLVM IR emission), Disassembler (code object to ISA text), KernelEnumerator
// (ordered kernel names embedded in a code object), CodeSizeQuery (authoritative byte
// size of one kernel), MetadataExtractor (code object notes) and IsaAnalyzer
// (live-register and control-flow analysis of one ISA file). The Lightning toolchain
// wraps clang/llvm-objdump/llvm-readobj subprocesses; ElfInspector reads kernel symbols
// straight from the ELF code object; ExternalAnalyzer wraps an ISA analysis executable.

//! External service contracts and implementations.

pub mod analyzer;
pub mod elf;
pub mod lightning;
pub mod process;

use std::path::{Path, PathBuf};

use crate::core::{OpenClOptions, PipelineResult};

pub use analyzer::ExternalAnalyzer;
pub use elf::ElfInspector;
pub use lightning::{LightningToolchain, ToolchainPaths};
pub use process::ToolOutput;

/// Source-to-binary compiler.
pub trait Compiler {
    /// Compile `sources` for `device` into `output`.
    ///
    /// Returns `Err` only when the tool could not be run; a compile error is an
    /// `Ok` output with `success == false` and the diagnostics in `stderr`.
    fn compile(
        &self,
        device: &str,
        options: &OpenClOptions,
        sources: &[PathBuf],
        output: &Path,
    ) -> PipelineResult<ToolOutput>;

    /// Emit textual LLVM IR for a single source file.
    fn compile_to_llvm_ir(
        &self,
        device: &str,
        options: &OpenClOptions,
        source: &Path,
        output: &Path,
    ) -> PipelineResult<ToolOutput>;
}

/// Binary-to-ISA disassembler. The ISA text is returned in `stdout`.
pub trait Disassembler {
    fn disassemble(&self, binary: &Path, device: &str, line_numbers: bool) -> PipelineResult<ToolOutput>;
}

/// Ordered list of kernel (entry point) names in a binary.
pub trait KernelEnumerator {
    fn kernel_names(&self, binary: &Path) -> PipelineResult<Vec<String>>;
}

/// Authoritative machine-code size of one kernel.
pub trait CodeSizeQuery {
    /// `Ok(None)` when the binary has no size information for `kernel`.
    fn kernel_code_size(&self, binary: &Path, kernel: &str) -> PipelineResult<Option<u64>>;
}

/// Code object metadata dump.
pub trait MetadataExtractor {
    fn extract_metadata(&self, binary: &Path) -> PipelineResult<String>;
}

/// Register class for live-register analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterClass {
    Vgpr,
    Sgpr,
}

/// Node granularity of a control-flow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgGranularity {
    Block,
    Instruction,
}

/// Analysis of one ISA file.
pub trait IsaAnalyzer {
    fn live_registers(&self, isa: &Path, device: &str, class: RegisterClass, output: &Path) -> PipelineResult<()>;

    fn control_flow_graph(
        &self,
        isa: &Path,
        device: &str,
        granularity: CfgGranularity,
        output: &Path,
    ) -> PipelineResult<()>;
}

/// The set of services one run uses.
#[derive(Clone, Copy)]
pub struct Toolchain<'a> {
    pub compiler: &'a dyn Compiler,
    pub disassembler: &'a dyn Disassembler,
    pub kernels: &'a dyn KernelEnumerator,
    pub code_size: &'a dyn CodeSizeQuery,
    pub metadata: &'a dyn MetadataExtractor,
    pub analyzer: Option<&'a dyn IsaAnalyzer>,
}
