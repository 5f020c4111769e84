// This module holds everything isaforge does with ISA text once a disassembler has
// produced it. The work is pure string processing with no subprocesses: `line` has the
// single-line recognizers and rewriters (label forms, branch operands, encoding-size
// suffixes, instruction addresses), `split` cuts one disassembly blob into per-kernel
// fragments using the authoritative kernel-name list, `reduce` trims each fragment to
// the kernel's real code size and drops labels no branch refers to, `csv` turns a
// fragment into the parsed-ISA table and `stats` derives register usage and the
// per-device capability columns. Every fragment starts with a fixed two-line header,
// and every pass that walks fragment bodies skips exactly HEADER_LINE_COUNT lines.

//! ISA text processing.

pub mod csv;
pub mod line;
pub mod reduce;
pub mod split;
pub mod stats;

use std::collections::BTreeMap;

pub use reduce::{reduce_isa, reduce_kernel, ReduceReport};
pub use split::split_isa;

/// Kernel name to ISA fragment (header included).
pub type KernelIsaMap = BTreeMap<String, String>;

/// Number of header lines in front of every fragment body.
pub const HEADER_LINE_COUNT: usize = 2;

/// Prefix a kernel's ISA text with the canonical two-line header.
pub fn prefix_with_header(kernel: &str, isa: &str) -> String {
    format!("; {kernel}\n; Disassembly for {kernel}\n{isa}")
}

/// The body of a fragment, without the header lines.
pub fn fragment_body(fragment: &str) -> &str {
    let mut rest = fragment;
    for _ in 0..HEADER_LINE_COUNT {
        match rest.find('\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return "",
        }
    }
    rest
}
