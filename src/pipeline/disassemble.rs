//! Binary to per-kernel ISA files.

use std::fs;
use std::path::{Path, PathBuf};

use super::RunContext;
use crate::core::naming::{output_file_name, temp_file_name, EXT_ISA, TEMP_ISA_PREFIX};
use crate::core::{OutputRecord, OutputStore, PipelineError, PipelineResult, RecordKey};
use crate::isa::{reduce_isa, split_isa};

/// Tool name used in diagnostics for disassembler failures.
pub const DISASSEMBLER_TOOL: &str = "disassembler";

/// Disassemble `binary`, split and reduce the ISA, and write one file per kernel.
///
/// With a kernel filter, an unknown kernel fails the device before any file
/// is written, and only the requested kernel's file is produced. A kernel
/// without a code size gets a failed record and no file.
pub(crate) fn disassemble_binary(
    ctx: &RunContext<'_>,
    device: &str,
    compiler_device: &str,
    binary: &Path,
    store: &mut OutputStore,
) -> PipelineResult<()> {
    let request = ctx.request;
    log::info!("Extracting ISA for {}...", device);

    let output = ctx
        .toolchain
        .disassembler
        .disassemble(binary, compiler_device, request.options.line_numbers)?
        .into_result(DISASSEMBLER_TOOL)?;
    let kernel_names = ctx.toolchain.kernels.kernel_names(binary)?;

    if let Some(kernel) = &request.kernel {
        if !kernel_names.contains(kernel) {
            return Err(PipelineError::UnknownKernel { name: kernel.clone() });
        }
    }

    let mut kernels = split_isa(&output.stdout, &kernel_names, binary)?;
    store.stats_mut().record_kernels_split(kernels.len());
    let reduction = reduce_isa(binary, &mut kernels, ctx.toolchain.code_size, store.stats_mut());
    log::debug!(
        "ISA of {} {}",
        binary.display(),
        if reduction.modified { "reduced" } else { "left as disassembled" }
    );

    for (kernel, isa) in &kernels {
        if request.kernel.as_ref().is_some_and(|k| k != kernel) {
            continue;
        }
        if reduction.is_unsized(kernel) {
            store.insert(RecordKey::kernel(device, kernel), OutputRecord::failed());
            continue;
        }
        let (path, is_temp) = isa_path(request.outputs.isa.as_deref(), &ctx.workspace.temp_dir, device, kernel);
        fs::write(&path, isa).map_err(|e| PipelineError::io(&path, e))?;
        log::debug!("Wrote ISA for {}/{} to {}", device, kernel, path.display());
        store.insert(RecordKey::kernel(device, kernel), OutputRecord::isa(path, is_temp));
    }
    log::info!("Extracting ISA for {}... succeeded", device);
    Ok(())
}

/// Destination of one kernel's ISA, and whether it is temporary.
pub fn isa_path(base: Option<&Path>, temp_dir: &Path, device: &str, kernel: &str) -> (PathBuf, bool) {
    match base {
        Some(base) => (output_file_name(base, EXT_ISA, device, Some(kernel)), false),
        None => (temp_file_name(temp_dir, TEMP_ISA_PREFIX, device, Some(kernel), EXT_ISA), true),
    }
}
