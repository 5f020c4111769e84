//! One target: compile, dump IR, relay warnings, hand off to disassembly.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::disassemble::disassemble_binary;
use super::RunContext;
use crate::core::naming::{output_file_name, source_stem, temp_file_name, EXT_BINARY, EXT_LLVM_IR, TEMP_BINARY_PREFIX};
use crate::core::{OutputRecord, OutputStore, PipelineError, PipelineResult, RecordKey};

/// Tool name used in diagnostics for compiler failures.
pub const COMPILER_TOOL: &str = "compiler";

/// Marker of a warning in compiler diagnostics.
pub const COMPILER_WARNING_TOKEN: &str = "warning:";

/// Destination of the binary for `device`, and whether it is temporary.
pub fn binary_path(base: Option<&Path>, temp_dir: &Path, device: &str) -> (PathBuf, bool) {
    match base {
        Some(base) => (output_file_name(base, EXT_BINARY, device, None), false),
        None => (temp_file_name(temp_dir, TEMP_BINARY_PREFIX, device, None, EXT_BINARY), true),
    }
}

/// Compile and process one target, recording the outcome in `store`.
///
/// Returns `false` when the target failed. Failures never propagate: the
/// target gets a failed record and the run moves on. Once the binary exists
/// every record of the target references it, so a temporary binary is always
/// cleaned up.
pub(crate) fn compile_target(ctx: &RunContext<'_>, device: &str, store: &mut OutputStore) -> bool {
    let compiler_device = ctx.compiler_names.compiler_name(device);
    let (binary, is_temp) = binary_path(ctx.request.outputs.binary.as_deref(), &ctx.workspace.temp_dir, device);

    log::info!("Compiling for {}...", device);
    let diagnostics = match build_binary(ctx, compiler_device, &binary) {
        Ok(diagnostics) => diagnostics,
        Err(e) => {
            log::error!("Compiling for {} failed: {}", device, e);
            store.insert(RecordKey::device(device), OutputRecord::failed());
            store.stats_mut().record_target_failed();
            return false;
        }
    };
    store.stats_mut().record_target_compiled();
    log::info!("Compiling for {}... succeeded", device);

    let mut succeeded = true;
    if let Some(base) = &ctx.request.outputs.llvm_ir {
        if let Err(e) = dump_llvm_ir(ctx, device, compiler_device, base) {
            log::error!("Extracting LLVM IR for {} failed: {}", device, e);
            succeeded = false;
        }
    } else if ctx.request.warnings {
        relay_warnings(&diagnostics);
    }

    if !ctx.request.outputs.needs_isa() {
        store.insert(RecordKey::device(device), OutputRecord::binary(&binary, is_temp));
    } else if let Err(e) = disassemble_binary(ctx, device, compiler_device, &binary, store) {
        log::error!("Extracting ISA for {} failed: {}", device, e);
        let record = OutputRecord {
            bin_file: Some(binary),
            is_bin_temp: is_temp,
            ..OutputRecord::failed()
        };
        store.insert(RecordKey::device(device), record);
        succeeded = false;
    } else {
        if !store.device_records(device).any(|(_, record)| record.success) {
            store.insert(RecordKey::device(device), OutputRecord::binary(&binary, is_temp));
        }
        store.set_binary_for_device(device, &binary, is_temp);
    }

    if !succeeded {
        store.stats_mut().record_target_failed();
    }
    succeeded
}

/// Compile the binary and return the compiler diagnostics.
fn build_binary(ctx: &RunContext<'_>, compiler_device: &str, binary: &Path) -> PipelineResult<String> {
    match fs::remove_file(binary) {
        Ok(()) => log::debug!("Removed stale {}", binary.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(PipelineError::io(binary, e)),
    }

    let request = ctx.request;
    let output = ctx
        .toolchain
        .compiler
        .compile(compiler_device, &request.options, &request.sources, binary)?
        .into_result(COMPILER_TOOL)?;
    if !binary.exists() {
        return Err(PipelineError::MissingOutput {
            tool: COMPILER_TOOL.to_string(),
            path: binary.to_path_buf(),
        });
    }
    Ok(output.stderr)
}

/// Emit one IR file per source. The compiler cannot write IR for several
/// sources in one invocation.
fn dump_llvm_ir(ctx: &RunContext<'_>, device: &str, compiler_device: &str, base: &Path) -> PipelineResult<()> {
    let sources = &ctx.request.sources;
    for source in sources {
        let stem = (sources.len() > 1).then(|| source_stem(source));
        let output = output_file_name(base, EXT_LLVM_IR, device, stem.as_deref());
        log::info!("Extracting LLVM IR for {} from {}...", device, source.display());
        ctx.toolchain
            .compiler
            .compile_to_llvm_ir(compiler_device, &ctx.request.options, source, &output)?
            .into_result(COMPILER_TOOL)?;
    }
    Ok(())
}

/// Relay the whole diagnostics block if it contains a warning.
pub fn relay_warnings(stderr: &str) -> bool {
    if stderr.contains(COMPILER_WARNING_TOKEN) {
        log::warn!("{}", stderr.trim_end());
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_path_user_and_temp() {
        let (path, temp) = binary_path(Some(Path::new("out/prog.bin")), Path::new("/tmp"), "gfx906");
        assert_eq!(path, PathBuf::from("out/prog-gfx906.bin"));
        assert!(!temp);

        let (path, temp) = binary_path(None, Path::new("/tmp"), "gfx906");
        assert!(path.starts_with("/tmp"));
        assert!(path.to_string_lossy().contains("gfx906"));
        assert!(temp);
    }

    #[test]
    fn test_relay_warnings_only_with_marker() {
        assert!(relay_warnings("k.cl:3:5: warning: unused variable 'x'\n1 warning generated.\n"));
        assert!(!relay_warnings("k.cl:3:5: note: declared here\n"));
        assert!(!relay_warnings(""));
    }
}
