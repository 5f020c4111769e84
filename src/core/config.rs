//! Run configuration: what to compile, how, and which artifacts to produce.

use std::path::PathBuf;

/// Per-target compiler option bundle.
#[derive(Debug, Clone, Default)]
pub struct OpenClOptions {
    /// Preprocessor defines, `NAME` or `NAME=VALUE`.
    pub defines: Vec<String>,
    pub include_paths: Vec<PathBuf>,
    /// Raw options forwarded to the compiler, whitespace separated.
    pub extra_options: Option<String>,
    pub optimization_level: Option<u8>,
    /// Emit line-number information into the binary.
    pub line_numbers: bool,
}

/// Requested output artifacts.
///
/// A `None` path means the artifact was not requested. Paths are base names:
/// the device and kernel names are appended when the actual files are created.
#[derive(Debug, Clone, Default)]
pub struct OutputRequest {
    pub binary: Option<PathBuf>,
    pub isa: Option<PathBuf>,
    pub parsed_isa: bool,
    pub statistics: Option<PathBuf>,
    pub livereg: Option<PathBuf>,
    pub livereg_sgpr: Option<PathBuf>,
    pub block_cfg: Option<PathBuf>,
    pub inst_cfg: Option<PathBuf>,
    /// One LLVM IR file per source file, emitted after a successful compile.
    pub llvm_ir: Option<PathBuf>,
    pub metadata: Option<PathBuf>,
    pub session_metadata: Option<PathBuf>,
}

impl OutputRequest {
    /// Whether any requested artifact is derived from the ISA disassembly.
    pub fn needs_isa(&self) -> bool {
        self.isa.is_some()
            || self.parsed_isa
            || self.statistics.is_some()
            || self.livereg.is_some()
            || self.livereg_sgpr.is_some()
            || self.needs_cfg()
    }

    pub fn needs_cfg(&self) -> bool {
        self.block_cfg.is_some() || self.inst_cfg.is_some()
    }
}

/// One build-and-analyze invocation.
#[derive(Debug, Clone, Default)]
pub struct CompileRequest {
    /// Requested device names, as typed by the user. Empty selects the default target.
    pub devices: Vec<String>,
    pub sources: Vec<PathBuf>,
    /// Restrict outputs to a single kernel.
    pub kernel: Option<String>,
    pub options: OpenClOptions,
    pub outputs: OutputRequest,
    /// Relay compiler warnings to the user.
    pub warnings: bool,
}

impl CompileRequest {
    /// Multi-device batches always attempt post-processing.
    pub fn is_multi_device(&self) -> bool {
        self.devices.len() > 1
    }
}

/// Where temporary artifacts are created.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub temp_dir: PathBuf,
}

impl Workspace {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_isa() {
        let mut outputs = OutputRequest::default();
        assert!(!outputs.needs_isa());

        outputs.metadata = Some("md.txt".into());
        outputs.binary = Some("out.bin".into());
        assert!(!outputs.needs_isa());

        outputs.inst_cfg = Some("cfg.dot".into());
        assert!(outputs.needs_isa());
        assert!(outputs.needs_cfg());
    }
}
