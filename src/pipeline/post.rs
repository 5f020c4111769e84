//! Post-processing passes over the Output Metadata Store, and temp-file cleanup.
//!
//! Passes run in a fixed order and each one only if its artifact was
//! requested. A failing pass is logged and the next one still runs. Passes
//! read the store; none of them adds records.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::naming::{output_file_name, EXT_CSV, EXT_DOT, EXT_TEXT};
use crate::core::{CompileRequest, OutputRecord, OutputRequest, OutputStore, PipelineError, PipelineResult, RecordKey};
use crate::isa::csv::isa_to_csv;
use crate::isa::stats::statistics_csv;
use crate::toolchain::{CfgGranularity, IsaAnalyzer, RegisterClass, Toolchain};

/// Read-only view of a finished compile loop.
pub struct PassContext<'r> {
    pub toolchain: &'r Toolchain<'r>,
    pub request: &'r CompileRequest,
    pub store: &'r OutputStore,
}

/// One post-processing step.
pub trait PostPass {
    fn name(&self) -> &'static str;

    fn requested(&self, outputs: &OutputRequest) -> bool;

    fn run(&self, ctx: &PassContext<'_>) -> PipelineResult<()>;
}

/// All passes in execution order.
pub fn passes() -> Vec<Box<dyn PostPass>> {
    vec![
        Box::new(ParsedIsaPass),
        Box::new(StatisticsPass),
        Box::new(LiveRegisterPass(RegisterClass::Vgpr)),
        Box::new(LiveRegisterPass(RegisterClass::Sgpr)),
        Box::new(CfgPass),
        Box::new(MetadataPass),
        Box::new(SessionMetadataPass),
    ]
}

pub(crate) fn run_post_passes(ctx: &PassContext<'_>) {
    for pass in passes() {
        if !pass.requested(&ctx.request.outputs) {
            continue;
        }
        log::debug!("Running {}", pass.name());
        if let Err(e) = pass.run(ctx) {
            log::error!("{} failed: {}", pass.name(), e);
        }
    }
}

/// Remove every temporary file recorded in `store`. Missing files are fine.
pub fn delete_temp_files(store: &mut OutputStore) {
    for path in store.temp_files() {
        match fs::remove_file(&path) {
            Ok(()) => store.stats_mut().record_temp_file_removed(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Cannot remove temporary file {}: {}", path.display(), e),
        }
    }
}

/// Apply `f` to every successful per-kernel ISA record.
///
/// Every kernel is attempted; the first error is returned.
fn for_each_kernel<F>(ctx: &PassContext<'_>, pass: &str, mut f: F) -> PipelineResult<()>
where
    F: FnMut(&str, &str, &OutputRecord, &Path) -> PipelineResult<()>,
{
    let mut first_error = None;
    for (device, kernel, record) in ctx.store.kernel_isa_records() {
        let Some(isa) = record.isa_file.as_deref() else { continue };
        if let Err(e) = f(device, kernel, record, isa) {
            log::error!("{} for {} ({}): {}", pass, kernel, device, e);
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn read_isa(path: &Path) -> PipelineResult<String> {
    fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))
}

fn write_text(path: &Path, text: &str) -> PipelineResult<()> {
    fs::write(path, text).map_err(|e| PipelineError::io(path, e))
}

/// ISA files converted to CSV next to the user's ISA files.
pub struct ParsedIsaPass;

impl PostPass for ParsedIsaPass {
    fn name(&self) -> &'static str {
        "Parsed ISA generation"
    }

    fn requested(&self, outputs: &OutputRequest) -> bool {
        outputs.parsed_isa
    }

    fn run(&self, ctx: &PassContext<'_>) -> PipelineResult<()> {
        for_each_kernel(ctx, self.name(), |_, _, record, isa| {
            if record.is_isa_temp {
                return Ok(());
            }
            write_text(&isa.with_extension(EXT_CSV), &isa_to_csv(&read_isa(isa)?))
        })
    }
}

/// Per-kernel resource usage.
pub struct StatisticsPass;

impl PostPass for StatisticsPass {
    fn name(&self) -> &'static str {
        "Statistics extraction"
    }

    fn requested(&self, outputs: &OutputRequest) -> bool {
        outputs.statistics.is_some()
    }

    fn run(&self, ctx: &PassContext<'_>) -> PipelineResult<()> {
        let Some(base) = &ctx.request.outputs.statistics else { return Ok(()) };
        log::info!("Extracting statistics...");
        for_each_kernel(ctx, self.name(), |device, kernel, record, isa| {
            let code_size = match record.bin_file.as_deref() {
                Some(binary) => ctx.toolchain.code_size.kernel_code_size(binary, kernel)?,
                None => None,
            };
            let csv = statistics_csv(device, kernel, code_size, &read_isa(isa)?);
            write_text(&output_file_name(base, EXT_CSV, device, Some(kernel)), &csv)
        })
    }
}

fn require_analyzer<'r>(ctx: &PassContext<'r>, pass: &'static str) -> PipelineResult<&'r dyn IsaAnalyzer> {
    ctx.toolchain.analyzer.ok_or(PipelineError::MissingAnalyzer { pass })
}

/// Live register analysis through the external analyzer.
pub struct LiveRegisterPass(pub RegisterClass);

impl LiveRegisterPass {
    fn base<'o>(&self, outputs: &'o OutputRequest) -> Option<&'o PathBuf> {
        match self.0 {
            RegisterClass::Vgpr => outputs.livereg.as_ref(),
            RegisterClass::Sgpr => outputs.livereg_sgpr.as_ref(),
        }
    }
}

impl PostPass for LiveRegisterPass {
    fn name(&self) -> &'static str {
        match self.0 {
            RegisterClass::Vgpr => "Live VGPR analysis",
            RegisterClass::Sgpr => "Live SGPR analysis",
        }
    }

    fn requested(&self, outputs: &OutputRequest) -> bool {
        self.base(outputs).is_some()
    }

    fn run(&self, ctx: &PassContext<'_>) -> PipelineResult<()> {
        let Some(base) = self.base(&ctx.request.outputs) else { return Ok(()) };
        let analyzer = require_analyzer(ctx, self.name())?;
        log::info!("Performing live register analysis...");
        for_each_kernel(ctx, self.name(), |device, kernel, _, isa| {
            let output = output_file_name(base, EXT_TEXT, device, Some(kernel));
            analyzer.live_registers(isa, device, self.0, &output)
        })
    }
}

/// Block-level and instruction-level control-flow graphs.
pub struct CfgPass;

impl PostPass for CfgPass {
    fn name(&self) -> &'static str {
        "Control flow graph extraction"
    }

    fn requested(&self, outputs: &OutputRequest) -> bool {
        outputs.needs_cfg()
    }

    fn run(&self, ctx: &PassContext<'_>) -> PipelineResult<()> {
        let analyzer = require_analyzer(ctx, self.name())?;
        let outputs = &ctx.request.outputs;
        let graphs = [
            (outputs.block_cfg.as_ref(), CfgGranularity::Block),
            (outputs.inst_cfg.as_ref(), CfgGranularity::Instruction),
        ];
        log::info!("Extracting control flow graph...");
        for_each_kernel(ctx, self.name(), |device, kernel, _, isa| {
            for (base, granularity) in graphs {
                if let Some(base) = base {
                    let output = output_file_name(base, EXT_DOT, device, Some(kernel));
                    analyzer.control_flow_graph(isa, device, granularity, &output)?;
                }
            }
            Ok(())
        })
    }
}

/// Code object notes, one file per compiled device.
pub struct MetadataPass;

impl PostPass for MetadataPass {
    fn name(&self) -> &'static str {
        "Metadata extraction"
    }

    fn requested(&self, outputs: &OutputRequest) -> bool {
        outputs.metadata.is_some()
    }

    fn run(&self, ctx: &PassContext<'_>) -> PipelineResult<()> {
        let Some(base) = &ctx.request.outputs.metadata else { return Ok(()) };
        let mut first_error = None;
        for (device, binary) in ctx.store.compiled_binaries() {
            let result = ctx
                .toolchain
                .metadata
                .extract_metadata(binary)
                .and_then(|text| write_text(&output_file_name(base, EXT_TEXT, device, None), &text));
            if let Err(e) = result {
                log::error!("{} for {}: {}", self.name(), device, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[derive(Serialize)]
struct SessionMetadata<'s> {
    sources: &'s [PathBuf],
    outputs: Vec<SessionEntry<'s>>,
}

#[derive(Serialize)]
struct SessionEntry<'s> {
    #[serde(flatten)]
    key: &'s RecordKey,
    #[serde(flatten)]
    record: &'s OutputRecord,
}

/// Session document describing every record of the run.
pub fn session_metadata_json(request: &CompileRequest, store: &OutputStore) -> PipelineResult<String> {
    let document = SessionMetadata {
        sources: &request.sources,
        outputs: store.iter().map(|(key, record)| SessionEntry { key, record }).collect(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// JSON session metadata.
pub struct SessionMetadataPass;

impl PostPass for SessionMetadataPass {
    fn name(&self) -> &'static str {
        "Session metadata generation"
    }

    fn requested(&self, outputs: &OutputRequest) -> bool {
        outputs.session_metadata.is_some()
    }

    fn run(&self, ctx: &PassContext<'_>) -> PipelineResult<()> {
        let Some(path) = &ctx.request.outputs.session_metadata else { return Ok(()) };
        write_text(path, &session_metadata_json(ctx.request, ctx.store)?)
    }
}
