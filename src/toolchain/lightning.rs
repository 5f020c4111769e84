//! LLVM "Lightning" toolchain: clang, llvm-objdump and llvm-readobj subprocesses.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::process::{run_tool, ToolOutput};
use super::{Compiler, Disassembler, MetadataExtractor};
use crate::core::{OpenClOptions, PipelineError, PipelineResult};

const CLANG: &str = "clang";
const OBJDUMP: &str = "llvm-objdump";
const READOBJ: &str = "llvm-readobj";

const AMDGPU_TRIPLE: &str = "amdgcn-amd-amdhsa";

/// Banner prefix in `clang --version` output.
pub const COMPILER_VERSION_TOKEN: &str = "clang version ";

/// Location of the toolchain and how to run it.
#[derive(Debug, Clone, Default)]
pub struct ToolchainPaths {
    /// Directory containing the tool executables. `None` searches `PATH`.
    pub bin_dir: Option<PathBuf>,
    /// Extra system include directory for OpenCL headers.
    pub include_dir: Option<PathBuf>,
    /// ISA analyzer executable used by the live-register and CFG passes.
    pub analyzer: Option<PathBuf>,
    /// Echo every command line before running it.
    pub print_commands: bool,
}

/// clang-based compiler, disassembler and metadata extractor.
#[derive(Debug, Clone, Default)]
pub struct LightningToolchain {
    paths: ToolchainPaths,
}

impl LightningToolchain {
    pub fn new(paths: ToolchainPaths) -> Self {
        Self { paths }
    }

    fn tool(&self, name: &str) -> PathBuf {
        let file = format!("{name}{}", std::env::consts::EXE_SUFFIX);
        match &self.paths.bin_dir {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        }
    }

    fn run(&self, name: &str, args: &[OsString]) -> PipelineResult<ToolOutput> {
        run_tool(&self.tool(name), args, self.paths.print_commands)
    }

    /// Compiler version string, e.g. `"17.0.0"`.
    pub fn compiler_version(&self) -> PipelineResult<String> {
        let output = self.run(CLANG, &["--version".into()])?.into_result(CLANG)?;
        parse_compiler_version(&output.stdout).ok_or_else(|| PipelineError::ToolFailed {
            tool: CLANG.to_string(),
            status: output.status,
            stderr: "no version banner in output".to_string(),
        })
    }

    fn compile_args(&self, device: &str, options: &OpenClOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-x".into(),
            "cl".into(),
            "-Xclang".into(),
            "-finclude-default-header".into(),
            "-target".into(),
            AMDGPU_TRIPLE.into(),
            format!("-mcpu={device}").into(),
        ];
        if let Some(dir) = &self.paths.include_dir {
            args.push("-isystem".into());
            args.push(dir.into());
        }
        if let Some(level) = options.optimization_level {
            args.push(format!("-O{level}").into());
        }
        if options.line_numbers {
            args.push("-gline-tables-only".into());
        }
        for define in &options.defines {
            args.push(format!("-D{define}").into());
        }
        for include in &options.include_paths {
            args.push("-I".into());
            args.push(include.into());
        }
        if let Some(extra) = &options.extra_options {
            args.extend(extra.split_whitespace().map(OsString::from));
        }
        args
    }
}

impl Compiler for LightningToolchain {
    fn compile(
        &self,
        device: &str,
        options: &OpenClOptions,
        sources: &[PathBuf],
        output: &Path,
    ) -> PipelineResult<ToolOutput> {
        let mut args = self.compile_args(device, options);
        args.push("-o".into());
        args.push(output.into());
        args.extend(sources.iter().map(OsString::from));
        self.run(CLANG, &args)
    }

    fn compile_to_llvm_ir(
        &self,
        device: &str,
        options: &OpenClOptions,
        source: &Path,
        output: &Path,
    ) -> PipelineResult<ToolOutput> {
        let mut args = self.compile_args(device, options);
        args.push("-emit-llvm".into());
        args.push("-S".into());
        args.push("-o".into());
        args.push(output.into());
        args.push(source.into());
        self.run(CLANG, &args)
    }
}

impl Disassembler for LightningToolchain {
    fn disassemble(&self, binary: &Path, device: &str, line_numbers: bool) -> PipelineResult<ToolOutput> {
        let mut args: Vec<OsString> = vec![
            "--disassemble".into(),
            format!("--triple={AMDGPU_TRIPLE}").into(),
            format!("--mcpu={device}").into(),
        ];
        if line_numbers {
            args.push("--line-numbers".into());
        }
        args.push(binary.into());
        self.run(OBJDUMP, &args)
    }
}

impl MetadataExtractor for LightningToolchain {
    fn extract_metadata(&self, binary: &Path) -> PipelineResult<String> {
        let output = self.run(READOBJ, &["--notes".into(), binary.into()])?.into_result(READOBJ)?;
        Ok(output.stdout)
    }
}

/// Extract the version from a `"clang version <x.y.z> ..."` banner.
///
/// The version ends at the first space or line break after the token.
pub fn parse_compiler_version(text: &str) -> Option<String> {
    let start = text.find(COMPILER_VERSION_TOKEN)? + COMPILER_VERSION_TOKEN.len();
    let rest = &text[start..];
    let end = rest.find([' ', '\n', '\r']).unwrap_or(rest.len());
    let version = &rest[..end];
    (!version.is_empty()).then(|| version.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compiler_version() {
        let banner = "AMD clang version 17.0.0 (https://github.com/RadeonOpenCompute/llvm-project roc-6.0.0)\nTarget: x86_64\n";
        assert_eq!(parse_compiler_version(banner).as_deref(), Some("17.0.0"));
        assert_eq!(parse_compiler_version("clang version 18.1.8\n").as_deref(), Some("18.1.8"));
        assert_eq!(parse_compiler_version("gcc (GCC) 13.2.0"), None);
    }

    #[test]
    fn test_compile_args_compose_options() {
        let toolchain = LightningToolchain::default();
        let options = OpenClOptions {
            defines: vec!["N=4".into(), "DEBUG".into()],
            include_paths: vec!["inc".into()],
            extra_options: Some("-cl-fast-relaxed-math  -cl-std=CL2.0".into()),
            optimization_level: Some(2),
            line_numbers: true,
        };
        let args: Vec<String> = toolchain
            .compile_args("gfx1030", &options)
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.contains(&"-mcpu=gfx1030".to_string()));
        assert!(args.contains(&"-O2".to_string()));
        assert!(args.contains(&"-DN=4".to_string()));
        assert!(args.contains(&"-DDEBUG".to_string()));
        assert!(args.contains(&"-gline-tables-only".to_string()));
        assert!(args.ends_with(&["-cl-fast-relaxed-math".to_string(), "-cl-std=CL2.0".to_string()]));
    }

    #[test]
    fn test_tool_path_uses_bin_dir() {
        let toolchain = LightningToolchain::new(ToolchainPaths {
            bin_dir: Some("/opt/rocm/llvm/bin".into()),
            ..ToolchainPaths::default()
        });
        assert!(toolchain.tool(CLANG).starts_with("/opt/rocm/llvm/bin"));
    }
}
