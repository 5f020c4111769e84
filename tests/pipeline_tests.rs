use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use isaforge::core::OpenClOptions;
use isaforge::toolchain::{
    CfgGranularity, CodeSizeQuery, Compiler, Disassembler, IsaAnalyzer, KernelEnumerator, MetadataExtractor,
    RegisterClass, ToolOutput, Toolchain,
};
use isaforge::{
    CancelToken, Commander, CompileRequest, OutputRequest, PipelineError, PipelineResult, RecordKey, TargetResolver,
    Workspace,
};
use tempfile::TempDir;

const DISASSEMBLY: &str = "\nkernels.bin:\tfile format elf64-amdgpu\n\nDisassembly of section .text:\n\n\
0000000000001000 <vadd>:\n\
\ts_load_dwordx2 s[0:1], s[4:5], 0x0 // 000000001000: C0060002 00000000\n\
\tv_add_f32_e32 v0, v1, v2 // 000000001008: 06000501\n\
\ts_endpgm // 00000000100C: BF810000\n\
\ts_nop 0 // 000000001010: BF800000\n\
\n\
0000000000001100 <vmul>:\n\
\tv_mul_f32_e32 v0, v1, v2 // 000000001100: 10000501\n\
\ts_endpgm // 000000001104: BF810000\n";

fn ok(stderr: &str) -> ToolOutput {
    ToolOutput {
        success: true,
        status: "exit status: 0".into(),
        stdout: String::new(),
        stderr: stderr.into(),
    }
}

/// Writes a fake binary unless the device is listed as failing.
#[derive(Default)]
struct MockCompiler {
    failing: Vec<&'static str>,
    failing_ir: bool,
    compiled: RefCell<Vec<String>>,
}

impl Compiler for MockCompiler {
    fn compile(
        &self,
        device: &str,
        _options: &OpenClOptions,
        _sources: &[PathBuf],
        output: &Path,
    ) -> PipelineResult<ToolOutput> {
        self.compiled.borrow_mut().push(device.to_string());
        if self.failing.contains(&device) {
            return Ok(ToolOutput {
                success: false,
                status: "exit status: 1".into(),
                stdout: String::new(),
                stderr: "k.cl:1:1: error: expected identifier".into(),
            });
        }
        fs::write(output, format!("code object for {device}")).unwrap();
        Ok(ok("k.cl:2:3: warning: unused variable 'x'"))
    }

    fn compile_to_llvm_ir(
        &self,
        device: &str,
        _options: &OpenClOptions,
        source: &Path,
        output: &Path,
    ) -> PipelineResult<ToolOutput> {
        if self.failing_ir {
            return Ok(ToolOutput {
                success: false,
                status: "exit status: 1".into(),
                stdout: String::new(),
                stderr: "error: cannot emit IR".into(),
            });
        }
        fs::write(output, format!("; IR of {} for {device}", source.display())).unwrap();
        Ok(ok(""))
    }
}

struct MockDisassembler;

impl Disassembler for MockDisassembler {
    fn disassemble(&self, binary: &Path, _device: &str, _line_numbers: bool) -> PipelineResult<ToolOutput> {
        assert!(binary.exists());
        Ok(ToolOutput {
            stdout: DISASSEMBLY.into(),
            ..ok("")
        })
    }
}

struct MockCodeObject;

impl KernelEnumerator for MockCodeObject {
    fn kernel_names(&self, _binary: &Path) -> PipelineResult<Vec<String>> {
        Ok(vec!["vadd".into(), "vmul".into()])
    }
}

/// Code sizes of the kernels in `DISASSEMBLY`, minus the `missing` ones.
#[derive(Default)]
struct MockCodeSizes {
    missing: Vec<&'static str>,
}

impl CodeSizeQuery for MockCodeSizes {
    fn kernel_code_size(&self, _binary: &Path, kernel: &str) -> PipelineResult<Option<u64>> {
        if self.missing.contains(&kernel) {
            return Ok(None);
        }
        Ok(match kernel {
            "vadd" => Some(16),
            "vmul" => Some(8),
            _ => None,
        })
    }
}

impl MetadataExtractor for MockCodeObject {
    fn extract_metadata(&self, binary: &Path) -> PipelineResult<String> {
        Ok(format!("notes of {}", binary.display()))
    }
}

struct MockAnalyzer;

impl IsaAnalyzer for MockAnalyzer {
    fn live_registers(&self, isa: &Path, _device: &str, class: RegisterClass, output: &Path) -> PipelineResult<()> {
        let isa = fs::read_to_string(isa).map_err(|e| PipelineError::io(isa, e))?;
        fs::write(output, format!("{class:?}\n{isa}")).map_err(|e| PipelineError::io(output, e))
    }

    fn control_flow_graph(
        &self,
        _isa: &Path,
        _device: &str,
        granularity: CfgGranularity,
        output: &Path,
    ) -> PipelineResult<()> {
        fs::write(output, format!("digraph {granularity:?} {{}}")).map_err(|e| PipelineError::io(output, e))
    }
}

struct Fixture {
    work: TempDir,
    out: TempDir,
    compiler: MockCompiler,
    sizes: MockCodeSizes,
}

impl Fixture {
    fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self {
            work: tempfile::tempdir().unwrap(),
            out: tempfile::tempdir().unwrap(),
            compiler: MockCompiler::default(),
            sizes: MockCodeSizes::default(),
        }
    }

    fn failing(mut self, devices: &[&'static str]) -> Self {
        self.compiler.failing = devices.to_vec();
        self
    }

    fn failing_ir(mut self) -> Self {
        self.compiler.failing_ir = true;
        self
    }

    fn without_code_size(mut self, kernels: &[&'static str]) -> Self {
        self.sizes.missing = kernels.to_vec();
        self
    }

    fn out(&self, name: &str) -> PathBuf {
        self.out.path().join(name)
    }

    fn request(&self, devices: &[&str], outputs: OutputRequest) -> CompileRequest {
        CompileRequest {
            devices: devices.iter().map(|d| d.to_string()).collect(),
            sources: vec![self.out("k.cl")],
            outputs,
            warnings: true,
            ..CompileRequest::default()
        }
    }

    fn commander(&self) -> Commander<'_> {
        let toolchain = Toolchain {
            compiler: &self.compiler,
            disassembler: &MockDisassembler,
            kernels: &MockCodeObject,
            code_size: &self.sizes,
            metadata: &MockCodeObject,
            analyzer: Some(&MockAnalyzer as &dyn IsaAnalyzer),
        };
        Commander::new(toolchain, TargetResolver::builtin()).with_workspace(Workspace::new(self.work.path()))
    }

    fn out_files(&self) -> Vec<String> {
        file_names(self.out.path())
    }

    fn work_files(&self) -> Vec<String> {
        file_names(self.work.path())
    }
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_unresolved_device_does_not_block_other_target() {
    let fx = Fixture::new();
    let outputs = OutputRequest {
        isa: Some(fx.out("out.isa")),
        statistics: Some(fx.out("stats.csv")),
        ..OutputRequest::default()
    };
    let report = fx.commander().run(&fx.request(&["gfx906", "nonsense"], outputs)).unwrap();

    assert!(!report.all_succeeded);
    assert!(!report.batch_failed());

    let vadd = report.store.get(&RecordKey::kernel("gfx906", "vadd")).unwrap();
    assert!(vadd.success);
    assert_eq!(vadd.isa_file.as_deref(), Some(fx.out("out-gfx906-vadd.isa").as_path()));

    let rejected = report.store.get(&RecordKey::device("nonsense")).unwrap();
    assert!(!rejected.success);
    assert!(rejected.bin_file.is_none());
    assert!(rejected.isa_file.is_none());

    assert!(fx.out("stats-gfx906-vadd.csv").exists());
    assert!(fx.out("stats-gfx906-vmul.csv").exists());
    assert_eq!(*fx.compiler.compiled.borrow(), vec!["gfx906".to_string()]);
}

#[test]
fn test_kernel_isa_is_reduced_and_split() {
    let fx = Fixture::new();
    let outputs = OutputRequest {
        isa: Some(fx.out("out.isa")),
        parsed_isa: true,
        ..OutputRequest::default()
    };
    let report = fx.commander().run(&fx.request(&["gfx1030"], outputs)).unwrap();
    assert!(report.all_succeeded);

    let vadd = fs::read_to_string(fx.out("out-gfx1030-vadd.isa")).unwrap();
    assert!(vadd.starts_with("; vadd\n; Disassembly for vadd\n"));
    assert!(vadd.contains("\tv_add_f32 v0, v1, v2     // 000000001008: 06000501"));
    assert!(vadd.contains("s_endpgm"));
    assert!(!vadd.contains("s_nop"));
    assert!(!vadd.contains("vmul"));

    let vmul = fs::read_to_string(fx.out("out-gfx1030-vmul.isa")).unwrap();
    assert!(vmul.contains("v_mul_f32 v0, v1, v2"));

    let csv = fs::read_to_string(fx.out("out-gfx1030-vadd.csv")).unwrap();
    assert!(csv.starts_with("Address,Opcode,Operands,Encoding\n"));
    assert!(csv.contains("00000000100C,s_endpgm,,BF810000"));

    assert_eq!(report.store.stats().kernels_split, 2);
    assert_eq!(report.store.stats().kernels_reduced, 2);
}

#[test]
fn test_unknown_kernel_fails_device_without_files() {
    let fx = Fixture::new();
    let outputs = OutputRequest {
        isa: Some(fx.out("out.isa")),
        ..OutputRequest::default()
    };
    let mut request = fx.request(&["gfx906", "gfx1030"], outputs);
    request.kernel = Some("missing".into());
    let report = fx.commander().run(&request).unwrap();

    assert!(!report.all_succeeded);
    for device in ["gfx906", "gfx1030"] {
        let record = report.store.get(&RecordKey::device(device)).unwrap();
        assert!(!record.success);
    }
    assert!(fx.out_files().is_empty());
    assert!(fx.work_files().is_empty());
}

#[test]
fn test_kernel_filter_writes_one_file() {
    let fx = Fixture::new();
    let outputs = OutputRequest {
        isa: Some(fx.out("out.isa")),
        ..OutputRequest::default()
    };
    let mut request = fx.request(&["gfx906"], outputs);
    request.kernel = Some("vmul".into());
    let report = fx.commander().run(&request).unwrap();

    assert!(report.all_succeeded);
    assert_eq!(fx.out_files(), vec!["out-gfx906-vmul.isa".to_string()]);
}

#[test]
fn test_temporary_files_are_removed() {
    let fx = Fixture::new();
    let outputs = OutputRequest {
        livereg: Some(fx.out("live.txt")),
        livereg_sgpr: Some(fx.out("live-sgpr.txt")),
        block_cfg: Some(fx.out("cfg.dot")),
        inst_cfg: Some(fx.out("cfg-i.dot")),
        ..OutputRequest::default()
    };
    let report = fx.commander().run(&fx.request(&["gfx1030"], outputs)).unwrap();

    assert!(report.all_succeeded);
    assert!(fx.work_files().is_empty());
    assert!(report.store.stats().temp_files_removed >= 3);

    let live = fs::read_to_string(fx.out("live-gfx1030-vadd.txt")).unwrap();
    assert!(live.starts_with("Vgpr\n; vadd"));
    let live_sgpr = fs::read_to_string(fx.out("live-sgpr-gfx1030-vmul.txt")).unwrap();
    assert!(live_sgpr.starts_with("Sgpr\n"));
    assert!(fx.out("cfg-gfx1030-vadd.dot").exists());
    assert!(fx.out("cfg-i-gfx1030-vmul.dot").exists());
}

#[test]
fn test_single_failed_device_skips_post_processing() {
    let fx = Fixture::new().failing(&["gfx906"]);
    let outputs = OutputRequest {
        metadata: Some(fx.out("md.txt")),
        ..OutputRequest::default()
    };
    let report = fx.commander().run(&fx.request(&["gfx906"], outputs)).unwrap();

    assert!(report.batch_failed());
    let record = report.store.get(&RecordKey::device("gfx906")).unwrap();
    assert!(!record.success);
    assert!(record.bin_file.is_none());
    assert!(fx.out_files().is_empty());
}

#[test]
fn test_multi_device_batch_runs_post_processing_after_failure() {
    let fx = Fixture::new().failing(&["gfx906"]);
    let outputs = OutputRequest {
        binary: Some(fx.out("prog.bin")),
        metadata: Some(fx.out("md.txt")),
        session_metadata: Some(fx.out("session.json")),
        ..OutputRequest::default()
    };
    let report = fx.commander().run(&fx.request(&["gfx906", "gfx1030"], outputs)).unwrap();

    assert!(!report.all_succeeded);
    assert!(!report.batch_failed());
    assert!(fx.out("prog-gfx1030.bin").exists());
    assert!(!fx.out("prog-gfx906.bin").exists());
    assert!(fx.out("md-gfx1030.txt").exists());
    assert!(!fx.out("md-gfx906.txt").exists());

    let session: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(fx.out("session.json")).unwrap()).unwrap();
    assert_eq!(session["outputs"].as_array().unwrap().len(), 2);
}

#[test]
fn test_llvm_ir_per_source() {
    let fx = Fixture::new();
    let outputs = OutputRequest {
        llvm_ir: Some(fx.out("ir.ll")),
        ..OutputRequest::default()
    };
    let mut request = fx.request(&["gfx906"], outputs);
    request.sources = vec![fx.out("a.cl"), fx.out("b.cl")];
    let report = fx.commander().run(&request).unwrap();

    assert!(report.all_succeeded);
    assert_eq!(fx.out_files(), vec!["ir-gfx906-a.ll".to_string(), "ir-gfx906-b.ll".to_string()]);
}

#[test]
fn test_cancelled_run_compiles_nothing() {
    let fx = Fixture::new();
    let cancel = CancelToken::new();
    cancel.cancel();
    let commander = fx.commander().with_cancel_token(cancel);
    let report = commander.run(&fx.request(&["gfx906", "gfx1030"], OutputRequest::default())).unwrap();

    assert!(!report.all_succeeded);
    assert!(fx.compiler.compiled.borrow().is_empty());
}

#[test]
fn test_no_sources_is_an_error() {
    let fx = Fixture::new();
    let mut request = fx.request(&["gfx906"], OutputRequest::default());
    request.sources.clear();
    assert!(matches!(fx.commander().run(&request), Err(PipelineError::NoInputFile)));
}

#[test]
fn test_no_resolvable_device_is_an_error() {
    let fx = Fixture::new();
    let request = fx.request(&["nonsense"], OutputRequest::default());
    assert!(matches!(fx.commander().run(&request), Err(PipelineError::NoTargets)));
}

#[test]
fn test_failed_ir_dump_still_extracts_isa() {
    let fx = Fixture::new().failing_ir();
    let outputs = OutputRequest {
        isa: Some(fx.out("out.isa")),
        llvm_ir: Some(fx.out("ir.ll")),
        ..OutputRequest::default()
    };
    let report = fx.commander().run(&fx.request(&["gfx906"], outputs)).unwrap();

    assert!(!report.all_succeeded);
    assert!(report.batch_failed());
    assert_eq!(
        fx.out_files(),
        vec!["out-gfx906-vadd.isa".to_string(), "out-gfx906-vmul.isa".to_string()]
    );
    for (_, record) in report.store.iter() {
        assert!(record.bin_file.is_some());
        assert!(record.is_bin_temp);
    }
    assert!(fx.work_files().is_empty());
    assert_eq!(report.store.stats().targets_compiled, 1);
    assert_eq!(report.store.stats().targets_failed, 1);
}

#[test]
fn test_kernel_without_code_size_fails_alone() {
    let fx = Fixture::new().without_code_size(&["vmul"]);
    let outputs = OutputRequest {
        isa: Some(fx.out("out.isa")),
        statistics: Some(fx.out("stats.csv")),
        ..OutputRequest::default()
    };
    let report = fx.commander().run(&fx.request(&["gfx906"], outputs)).unwrap();

    let vmul = report.store.get(&RecordKey::kernel("gfx906", "vmul")).unwrap();
    assert!(!vmul.success);
    assert!(vmul.isa_file.is_none());
    let vadd = report.store.get(&RecordKey::kernel("gfx906", "vadd")).unwrap();
    assert!(vadd.success);

    assert_eq!(
        fx.out_files(),
        vec!["out-gfx906-vadd.isa".to_string(), "stats-gfx906-vadd.csv".to_string()]
    );
    assert!(fx.work_files().is_empty());
}
