//! Kernel enumeration and code size queries read straight from the ELF code object.
//!
//! An AMDGPU HSA code object defines every kernel twice: a function symbol for
//! the machine code and a `<name>.kd` object symbol for the kernel descriptor.
//! Kernels are the function symbols that have a descriptor. Code objects built
//! without descriptors fall back to every global function symbol.

use std::fs;
use std::path::Path;

use object::{Object, ObjectSymbol, SymbolKind};

use super::{CodeSizeQuery, KernelEnumerator};
use crate::core::{PipelineError, PipelineResult};

const KERNEL_DESCRIPTOR_SUFFIX: &str = ".kd";

/// Reads kernel symbols from a code object with the `object` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElfInspector;

/// One function symbol of interest.
struct FunctionSymbol {
    name: String,
    size: u64,
    global: bool,
}

struct SymbolScan {
    functions: Vec<FunctionSymbol>,
    descriptors: hashbrown::HashSet<String>,
}

impl ElfInspector {
    pub fn new() -> Self {
        Self
    }

    fn scan(&self, binary: &Path) -> PipelineResult<SymbolScan> {
        let data = fs::read(binary).map_err(|e| PipelineError::io(binary, e))?;
        let file = object::File::parse(&*data).map_err(|e| PipelineError::CodeObject {
            path: binary.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut scan = SymbolScan {
            functions: Vec::new(),
            descriptors: hashbrown::HashSet::new(),
        };
        for symbol in file.symbols() {
            let Ok(name) = symbol.name() else { continue };
            if name.is_empty() || !symbol.is_definition() {
                continue;
            }
            if let Some(kernel) = name.strip_suffix(KERNEL_DESCRIPTOR_SUFFIX) {
                scan.descriptors.insert(kernel.to_string());
                continue;
            }
            if symbol.kind() == SymbolKind::Text {
                scan.functions.push(FunctionSymbol {
                    name: name.to_string(),
                    size: symbol.size(),
                    global: symbol.is_global(),
                });
            }
        }
        Ok(scan)
    }
}

impl KernelEnumerator for ElfInspector {
    fn kernel_names(&self, binary: &Path) -> PipelineResult<Vec<String>> {
        let scan = self.scan(binary)?;
        let names: Vec<String> = if scan.descriptors.is_empty() {
            scan.functions.into_iter().filter(|f| f.global).map(|f| f.name).collect()
        } else {
            scan.functions
                .into_iter()
                .filter(|f| scan.descriptors.contains(&f.name))
                .map(|f| f.name)
                .collect()
        };
        log::debug!("{} kernel(s) in {}", names.len(), binary.display());
        Ok(names)
    }
}

impl CodeSizeQuery for ElfInspector {
    fn kernel_code_size(&self, binary: &Path, kernel: &str) -> PipelineResult<Option<u64>> {
        let scan = self.scan(binary)?;
        Ok(scan
            .functions
            .iter()
            .find(|f| f.name == kernel)
            .map(|f| f.size)
            .filter(|&size| size > 0))
    }
}
