//! Trimming kernel fragments to their real code size.
//!
//! Disassemblers may print bytes past the end of a kernel (padding, library
//! epilogues) as instructions. Reduction keeps lines up to and including the
//! first instruction that reaches the kernel's code size, then drops
//! unreferenced labels, rewrites inline `<label>:` annotations and strips
//! encoding-size suffixes from mnemonics.
//!
//! Precondition: every standalone `name:` line is a block or function label
//! that is only referenced through branch or call operands. A label used any
//! other way is dropped.

use std::path::Path;

use hashbrown::HashSet;

use super::line::{
    branch_target, instruction_address, is_comment_line, reformat_inline_label, standalone_label,
    strip_encoding_suffix, AddressParse,
};
use super::{KernelIsaMap, HEADER_LINE_COUNT};
use crate::core::{PipelineError, SessionStats};
use crate::toolchain::CodeSizeQuery;

/// Where the kernel's code ends inside the fragment body.
enum Boundary {
    /// Index of the last line to keep.
    At(usize),
    /// The code size is never reached; keep everything.
    Open,
    /// An address could not be parsed at this line.
    Unparsable(usize),
}

fn find_boundary(body: &[&str], code_size: u64) -> Boundary {
    let mut origin: Option<u64> = None;
    for (index, line) in body.iter().enumerate() {
        if is_comment_line(line) {
            continue;
        }
        match instruction_address(line) {
            AddressParse::Absent => {}
            AddressParse::Invalid => return Boundary::Unparsable(index),
            AddressParse::Parsed { address, width } => {
                let origin = *origin.get_or_insert(address);
                if address.saturating_sub(origin) + width >= code_size {
                    return Boundary::At(index);
                }
            }
        }
    }
    Boundary::Open
}

/// Reduce one header-prefixed fragment.
///
/// Returns the new text, or `None` when nothing was cut or rewritten (or an
/// address could not be parsed, which leaves the kernel untouched).
pub fn reduce_kernel(fragment: &str, code_size: u64) -> Option<String> {
    let lines: Vec<&str> = fragment.lines().collect();
    let header_len = HEADER_LINE_COUNT.min(lines.len());
    let (header, body) = lines.split_at(header_len);

    let kept = match find_boundary(body, code_size) {
        Boundary::At(last) => &body[..=last],
        Boundary::Open => body,
        Boundary::Unparsable(index) => {
            log::warn!("Unparsable instruction address, kernel left untrimmed: {}", body[index].trim());
            return None;
        }
    };
    let truncated = kept.len() < body.len();

    let targets: HashSet<&str> = kept.iter().filter_map(|line| branch_target(line)).collect();

    let mut rewritten = false;
    let mut out = String::with_capacity(fragment.len());
    for line in header {
        out.push_str(line);
        out.push('\n');
    }
    for line in kept {
        if let Some(label) = standalone_label(line) {
            if targets.contains(label) {
                out.push_str(line);
                out.push('\n');
            } else {
                rewritten = true;
            }
            continue;
        }
        if let Some(label_line) = reformat_inline_label(line) {
            out.push_str(&label_line);
            rewritten = true;
        } else if let Some(stripped) = (!is_comment_line(line)).then(|| strip_encoding_suffix(line)).flatten() {
            out.push_str(&stripped);
            rewritten = true;
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }

    (truncated || rewritten).then_some(out)
}

/// Outcome of reducing every kernel of one binary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReduceReport {
    /// At least one kernel's text was cut or rewritten.
    pub modified: bool,
    /// Kernels whose code size could not be obtained, left unreduced.
    pub r#unsized: Vec<String>,
}

impl ReduceReport {
    pub fn is_unsized(&self, kernel: &str) -> bool {
        self.r#unsized.iter().any(|k| k == kernel)
    }
}

/// Reduce every kernel of `binary` in place.
///
/// A kernel without a code size cannot be reduced; it is logged and listed
/// in the report so the caller can fail it.
pub fn reduce_isa(
    binary: &Path,
    kernels: &mut KernelIsaMap,
    code_size: &dyn CodeSizeQuery,
    stats: &mut SessionStats,
) -> ReduceReport {
    let mut report = ReduceReport::default();
    for (kernel, fragment) in kernels.iter_mut() {
        let size = match code_size.kernel_code_size(binary, kernel) {
            Ok(Some(size)) => size,
            Ok(None) => {
                log::error!("{}", PipelineError::CodeSizeUnavailable { kernel: kernel.clone() });
                report.r#unsized.push(kernel.clone());
                continue;
            }
            Err(e) => {
                log::error!("{}", e);
                report.r#unsized.push(kernel.clone());
                continue;
            }
        };
        if let Some(reduced) = reduce_kernel(fragment, size) {
            log::trace!("Reduced ISA of {} to {} byte(s) of code", kernel, size);
            *fragment = reduced;
            stats.record_kernel_reduced();
            report.modified = true;
        }
    }
    report
}
