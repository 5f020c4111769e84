//! isaforge command line.
//!
//! Maps command line options onto a [`CompileRequest`], wires the LLVM
//! toolchain, the ELF inspector and the optional ISA analyzer into a
//! [`Commander`], and turns a batch failure into a non-zero exit code.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use isaforge::target::ExtraTargets;
use isaforge::toolchain::{ElfInspector, ExternalAnalyzer, IsaAnalyzer, LightningToolchain, Toolchain, ToolchainPaths};
use isaforge::{Commander, CompileRequest, OpenClOptions, OutputRequest, PipelineResult, TargetResolver, Workspace};

#[derive(Parser)]
#[command(
    name = "isaforge",
    version,
    about = "Build OpenCL kernels for GPU targets and analyze their ISA"
)]
struct Cli {
    /// OpenCL source files
    sources: Vec<PathBuf>,
    /// Target device, repeatable (default: latest supported target)
    #[arg(short = 'c', long = "asic", value_name = "DEVICE")]
    devices: Vec<String>,
    /// Only produce outputs for this kernel
    #[arg(long, value_name = "NAME")]
    kernel: Option<String>,
    /// Preprocessor define, NAME or NAME=VALUE
    #[arg(short = 'D', value_name = "DEFINE")]
    defines: Vec<String>,
    /// Additional include directory
    #[arg(short = 'I', value_name = "DIR")]
    include_paths: Vec<PathBuf>,
    /// Optimization level
    #[arg(short = 'O', value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(0..=3))]
    optimization: Option<u8>,
    /// Extra options passed to the compiler as-is
    #[arg(long, value_name = "OPTIONS", allow_hyphen_values = true)]
    compiler_options: Option<String>,
    /// Emit line numbers into the binary and the ISA
    #[arg(long)]
    line_numbers: bool,
    /// Per-kernel ISA output base name
    #[arg(long, value_name = "PATH")]
    isa: Option<PathBuf>,
    /// Also write parsed ISA as CSV next to each ISA file
    #[arg(long)]
    parse_isa: bool,
    /// Resource usage statistics base name
    #[arg(long = "analysis", value_name = "PATH")]
    statistics: Option<PathBuf>,
    /// Live VGPR analysis base name
    #[arg(long, value_name = "PATH")]
    livereg: Option<PathBuf>,
    /// Live SGPR analysis base name
    #[arg(long, value_name = "PATH")]
    livereg_sgpr: Option<PathBuf>,
    /// Per-block control flow graph base name
    #[arg(long, value_name = "PATH")]
    cfg: Option<PathBuf>,
    /// Per-instruction control flow graph base name
    #[arg(long = "cfg-i", value_name = "PATH")]
    cfg_instruction: Option<PathBuf>,
    /// LLVM IR base name, one file per source
    #[arg(long = "il", value_name = "PATH")]
    llvm_ir: Option<PathBuf>,
    /// Binary output base name (default: temporary)
    #[arg(long = "bin", value_name = "PATH")]
    binary: Option<PathBuf>,
    /// Code object metadata base name
    #[arg(long, value_name = "PATH")]
    metadata: Option<PathBuf>,
    /// Session metadata JSON file
    #[arg(long, value_name = "PATH")]
    session_metadata: Option<PathBuf>,
    /// Relay compiler warnings
    #[arg(short = 'w', long)]
    warnings: bool,
    /// Directory containing clang, llvm-objdump and llvm-readobj
    #[arg(long, value_name = "DIR")]
    compiler_bin_dir: Option<PathBuf>,
    /// Additional OpenCL system include directory
    #[arg(long, value_name = "DIR")]
    compiler_inc_dir: Option<PathBuf>,
    /// ISA analyzer executable for live register and CFG analysis
    #[arg(long, value_name = "PATH")]
    analyzer: Option<PathBuf>,
    /// Supplemental targets file (default: next to the executable)
    #[arg(long, value_name = "PATH")]
    additional_targets: Option<PathBuf>,
    /// Directory for temporary files
    #[arg(long, value_name = "DIR")]
    temp_dir: Option<PathBuf>,
    /// List supported targets and exit
    #[arg(short = 'l', long)]
    list_targets: bool,
    /// Print the compiler version and exit
    #[arg(long)]
    compiler_version: bool,
    /// Print every command line before running it
    #[arg(long)]
    print_cmd: bool,
}

impl Cli {
    fn toolchain_paths(&self) -> ToolchainPaths {
        ToolchainPaths {
            bin_dir: self.compiler_bin_dir.clone(),
            include_dir: self.compiler_inc_dir.clone(),
            analyzer: self.analyzer.clone(),
            print_commands: self.print_cmd,
        }
    }

    fn request(&self) -> CompileRequest {
        CompileRequest {
            devices: self.devices.clone(),
            sources: self.sources.clone(),
            kernel: self.kernel.clone(),
            options: OpenClOptions {
                defines: self.defines.clone(),
                include_paths: self.include_paths.clone(),
                extra_options: self.compiler_options.clone(),
                optimization_level: self.optimization,
                line_numbers: self.line_numbers,
            },
            outputs: OutputRequest {
                binary: self.binary.clone(),
                isa: self.isa.clone(),
                parsed_isa: self.parse_isa,
                statistics: self.statistics.clone(),
                livereg: self.livereg.clone(),
                livereg_sgpr: self.livereg_sgpr.clone(),
                block_cfg: self.cfg.clone(),
                inst_cfg: self.cfg_instruction.clone(),
                llvm_ir: self.llvm_ir.clone(),
                metadata: self.metadata.clone(),
                session_metadata: self.session_metadata.clone(),
            },
            warnings: self.warnings,
        }
    }

    fn resolver(&self) -> PipelineResult<TargetResolver> {
        let path = self.additional_targets.clone().or_else(ExtraTargets::default_path);
        let extra = match path {
            Some(path) => ExtraTargets::load(&path)?,
            None => ExtraTargets::default(),
        };
        Ok(TargetResolver::builtin().with_extra_targets(extra))
    }
}

fn list_targets(resolver: &TargetResolver) {
    println!("Supported targets:");
    for target in resolver.supported_targets() {
        println!("  {}", target);
    }
    let extra = resolver.extra_targets();
    if !extra.is_empty() {
        println!("Additional targets (unverified, compilation and analysis are not guaranteed):");
        for target in extra.iter() {
            println!("  {}", target);
        }
    }
}

fn run(cli: &Cli) -> PipelineResult<bool> {
    let paths = cli.toolchain_paths();
    let lightning = LightningToolchain::new(paths.clone());

    if cli.compiler_version {
        println!("{}", lightning.compiler_version()?);
        return Ok(true);
    }

    let resolver = cli.resolver()?;
    if cli.list_targets {
        list_targets(&resolver);
        return Ok(true);
    }

    let elf = ElfInspector::new();
    let analyzer = paths
        .analyzer
        .as_ref()
        .map(|program| ExternalAnalyzer::new(program, paths.print_commands));
    let toolchain = Toolchain {
        compiler: &lightning,
        disassembler: &lightning,
        kernels: &elf,
        code_size: &elf,
        metadata: &lightning,
        analyzer: analyzer.as_ref().map(|a| a as &dyn IsaAnalyzer),
    };

    let mut commander = Commander::new(toolchain, resolver);
    if let Some(dir) = &cli.temp_dir {
        commander = commander.with_workspace(Workspace::new(dir));
    }

    let report = commander.run(&cli.request())?;
    Ok(!report.batch_failed())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
