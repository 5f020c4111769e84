//! Output and temporary file naming.
//!
//! User-visible artifacts follow `{base}-{device}[-{kernel}].{ext}`, where the
//! extension comes from the user's base name when it has one. Temporary
//! artifacts live in the workspace temp directory and carry the process id,
//! device and kernel so that concurrent runs and targets never collide.

use std::path::{Path, PathBuf};

pub const EXT_BINARY: &str = "bin";
pub const EXT_ISA: &str = "isa";
pub const EXT_CSV: &str = "csv";
pub const EXT_LLVM_IR: &str = "ll";
pub const EXT_TEXT: &str = "txt";
pub const EXT_DOT: &str = "dot";

pub const TEMP_BINARY_PREFIX: &str = "isaforge_lc_out";
pub const TEMP_ISA_PREFIX: &str = "isaforge_lc_isa";

/// Build `{base}-{device}[-{kernel}].{ext}` next to `base`.
pub fn output_file_name(base: &Path, default_ext: &str, device: &str, kernel: Option<&str>) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = base
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| default_ext.to_string());

    let mut name = if stem.is_empty() {
        device.to_string()
    } else {
        format!("{stem}-{device}")
    };
    if let Some(kernel) = kernel.filter(|k| !k.is_empty()) {
        name.push('-');
        name.push_str(kernel);
    }
    name.push('.');
    name.push_str(&ext);

    match base.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(name),
        _ => PathBuf::from(name),
    }
}

/// Build a collision-free temporary file name inside `dir`.
pub fn temp_file_name(dir: &Path, prefix: &str, device: &str, kernel: Option<&str>, ext: &str) -> PathBuf {
    let mut name = format!("{prefix}-{}-{device}", std::process::id());
    if let Some(kernel) = kernel.filter(|k| !k.is_empty()) {
        name.push('-');
        name.push_str(kernel);
    }
    name.push('.');
    name.push_str(ext);
    dir.join(name)
}

/// File name without directory and extension, used to key per-source outputs.
pub fn source_stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string())
}
