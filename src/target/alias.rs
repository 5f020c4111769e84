//! Device alias tables.
//!
//! Two independent lookups:
//! - [`TargetTable`]: LLVM processor names (`gfx803`) to public device names
//!   (`fiji`). The public side is the canonical supported-target set.
//! - [`CompilerNameTable`]: public device names the compiler does not accept,
//!   mapped to names it does.

use hashbrown::HashMap;
use std::collections::BTreeSet;

/// LLVM processor name to public device name.
///
/// Entry order matters: the last entry is the default target ("latest"
/// supported device). New devices must be appended in release order, and
/// reordering the table silently changes the default.
pub const LLVM_TARGETS: &[(&str, &str)] = &[
    ("gfx801", "carrizo"),
    ("gfx802", "tonga"),
    ("gfx803", "fiji"),
    ("gfx803", "ellesmere"),
    ("gfx803", "baffin"),
    ("gfx803", "gfx804"),
    ("gfx900", "gfx900"),
    ("gfx902", "gfx902"),
    ("gfx904", "gfx904"),
    ("gfx906", "gfx906"),
    ("gfx908", "gfx908"),
    ("gfx90a", "gfx90a"),
    ("gfx90c", "gfx90c"),
    ("gfx942", "gfx942"),
    ("gfx1010", "gfx1010"),
    ("gfx1011", "gfx1011"),
    ("gfx1012", "gfx1012"),
    ("gfx1030", "gfx1030"),
    ("gfx1031", "gfx1031"),
    ("gfx1032", "gfx1032"),
    ("gfx1034", "gfx1034"),
    ("gfx1035", "gfx1035"),
    ("gfx1100", "gfx1100"),
    ("gfx1101", "gfx1101"),
    ("gfx1102", "gfx1102"),
    ("gfx1103", "gfx1103"),
    ("gfx1150", "gfx1150"),
    ("gfx1151", "gfx1151"),
    ("gfx1152", "gfx1152"),
    ("gfx1200", "gfx1200"),
    ("gfx1201", "gfx1201"),
];

/// Public device names that the compiler knows under a different name.
pub const COMPILER_NAMES: &[(&str, &str)] = &[
    ("ellesmere", "polaris10"),
    ("baffin", "polaris11"),
    ("gfx804", "gfx803"),
];

/// Ordered LLVM-name to public-name table.
#[derive(Debug, Clone)]
pub struct TargetTable {
    entries: Vec<(String, String)>,
}

impl TargetTable {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(llvm, public)| (llvm.to_string(), public.to_string()))
                .collect(),
        }
    }

    /// The built-in table of supported devices.
    pub fn builtin() -> Self {
        Self::new(LLVM_TARGETS.iter().copied())
    }

    /// Public name for an LLVM-format device name. First match wins.
    pub fn public_name(&self, llvm_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(llvm, _)| llvm == llvm_name)
            .map(|(_, public)| public.as_str())
    }

    /// The canonical supported-target set.
    pub fn supported(&self) -> BTreeSet<String> {
        self.entries.iter().map(|(_, public)| public.clone()).collect()
    }

    /// The most recently added entry.
    pub fn latest(&self) -> Option<&str> {
        self.entries.last().map(|(_, public)| public.as_str())
    }
}

/// Public-name to compiler-name substitutions.
#[derive(Debug, Clone)]
pub struct CompilerNameTable {
    names: HashMap<String, String>,
}

impl CompilerNameTable {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            names: entries
                .into_iter()
                .map(|(public, compiler)| (public.to_string(), compiler.to_string()))
                .collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(COMPILER_NAMES.iter().copied())
    }

    /// The substitution for `device`, if it needs one.
    pub fn lookup(&self, device: &str) -> Option<&str> {
        self.names.get(device).map(String::as_str)
    }

    /// The name to pass to the compiler for `device`.
    pub fn compiler_name<'a>(&'a self, device: &'a str) -> &'a str {
        self.lookup(device).unwrap_or(device)
    }
}
