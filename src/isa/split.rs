//! Splitting one disassembly into per-kernel fragments.
//!
//! Kernel blocks are separated by a blank line and open with a `name:` label.
//! Only labels whose name is in the authoritative kernel list start a
//! fragment; a fragment runs up to the line break before the next kernel's
//! label, or to the end of the text for the last kernel.

use std::path::Path;

use hashbrown::HashSet;

use super::line::strip_label_addresses;
use super::{prefix_with_header, KernelIsaMap};
use crate::core::{PipelineError, PipelineResult};

const LABEL_END_TOKEN: &str = ":\n";
const BLOCK_END_TOKEN: &str = "\n\n";

/// Start of a kernel inside the disassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelMarker {
    /// Byte offset of the label line.
    pub offset: usize,
    /// Length of the kernel name.
    pub name_len: usize,
}

/// Find the label line of every listed kernel, in text order.
pub fn kernel_markers(text: &str, kernel_names: &[String]) -> Vec<KernelMarker> {
    let names: HashSet<&str> = kernel_names.iter().map(String::as_str).collect();
    let mut markers = Vec::new();

    let Some(mut block_start) = text.find(|c: char| c != '\n') else {
        return markers;
    };
    while let Some(found) = text[block_start..].find(LABEL_END_TOKEN) {
        let label_end = block_start + found;
        let line_start = text[block_start..label_end]
            .rfind('\n')
            .map_or(block_start, |pos| block_start + pos + 1);
        if names.contains(&text[line_start..label_end]) {
            markers.push(KernelMarker {
                offset: line_start,
                name_len: label_end - line_start,
            });
        }
        match text[label_end..].find(BLOCK_END_TOKEN) {
            Some(pos) => block_start = label_end + pos + BLOCK_END_TOKEN.len(),
            None => break,
        }
    }
    markers
}

/// Cut `text` at the markers into `(name, fragment)` pairs.
///
/// Returns `None` if any span is inverted, in which case nothing is produced.
pub fn cut_fragments<'t>(text: &'t str, markers: &[KernelMarker]) -> Option<Vec<(&'t str, &'t str)>> {
    let mut fragments = Vec::with_capacity(markers.len());
    for (i, marker) in markers.iter().enumerate() {
        let start = marker.offset;
        let end = match markers.get(i + 1) {
            Some(next) => next.offset.checked_sub(1)?,
            None => text.len(),
        };
        if start > end || end > text.len() {
            return None;
        }
        let name = text.get(start..start + marker.name_len)?;
        fragments.push((name, text.get(start..end)?));
    }
    Some(fragments)
}

/// Split the disassembly of `binary` into header-prefixed kernel fragments.
pub fn split_isa(isa_text: &str, kernel_names: &[String], binary: &Path) -> PipelineResult<KernelIsaMap> {
    let text = strip_label_addresses(isa_text);
    let markers = kernel_markers(&text, kernel_names);
    let fragments = cut_fragments(&text, &markers).ok_or_else(|| PipelineError::SplitIsa {
        binary: binary.to_path_buf(),
    })?;

    if fragments.len() < kernel_names.len() {
        log::warn!(
            "Found {} of {} kernel(s) in the disassembly of {}",
            fragments.len(),
            kernel_names.len(),
            binary.display()
        );
    }

    Ok(fragments
        .into_iter()
        .map(|(name, fragment)| (name.to_string(), prefix_with_header(name, fragment)))
        .collect())
}
