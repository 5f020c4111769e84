//! Resource usage statistics derived from a kernel's ISA.
//!
//! Register counts are scanned from instruction operands (`s7`, `v[4:7]`),
//! reported as highest index plus one. Device capability columns come from a
//! fixed table and read `N/A` for devices it does not list.

use super::fragment_body;
use super::line::{is_comment_line, standalone_label, ADDRESS_START_TOKEN};

pub const NA_VALUE: &str = "N/A";

pub const STATISTICS_HEADER: &str =
    "DEVICE,KERNEL,CODE_SIZE,INSTRUCTIONS,USED_SGPRS,AVAILABLE_SGPRS,USED_VGPRS,AVAILABLE_VGPRS,AVAILABLE_LDS_BYTES";

/// Register and LDS budget of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProps {
    pub available_sgprs: u64,
    pub available_vgprs: u64,
    pub available_lds_bytes: u64,
}

const fn props(available_sgprs: u64) -> DeviceProps {
    DeviceProps {
        available_sgprs,
        available_vgprs: 256,
        available_lds_bytes: 65536,
    }
}

const DEVICE_PROPS: &[(&str, DeviceProps)] = &[
    ("carrizo", props(102)),
    ("tonga", props(102)),
    ("fiji", props(102)),
    ("ellesmere", props(102)),
    ("baffin", props(102)),
    ("polaris10", props(102)),
    ("polaris11", props(102)),
    ("gfx804", props(102)),
    ("gfx900", props(102)),
    ("gfx902", props(102)),
    ("gfx904", props(102)),
    ("gfx906", props(102)),
    ("gfx908", props(102)),
    ("gfx90c", props(102)),
    ("gfx1010", props(106)),
    ("gfx1011", props(106)),
    ("gfx1012", props(106)),
    ("gfx1030", props(106)),
    ("gfx1031", props(106)),
    ("gfx1032", props(106)),
    ("gfx1034", props(106)),
    ("gfx1035", props(106)),
    ("gfx1100", props(106)),
    ("gfx1101", props(106)),
    ("gfx1102", props(106)),
    ("gfx1103", props(106)),
];

pub fn device_props(device: &str) -> Option<DeviceProps> {
    DEVICE_PROPS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(device))
        .map(|&(_, props)| props)
}

/// Registers referenced by a kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterUsage {
    pub sgprs: u64,
    pub vgprs: u64,
    pub instructions: u64,
}

impl RegisterUsage {
    fn note(&mut self, class: char, last_index: u64) {
        let count = last_index + 1;
        match class {
            's' => self.sgprs = self.sgprs.max(count),
            'v' => self.vgprs = self.vgprs.max(count),
            _ => {}
        }
    }
}

/// `s7` / `v[4:7]` to `(class, highest index)`.
fn parse_register(token: &str) -> Option<(char, u64)> {
    let token = token.trim_matches(|c: char| c == '-' || c == '|' || c == '!');
    let class = token.chars().next().filter(|c| *c == 's' || *c == 'v')?;
    let rest = &token[1..];
    if let Some(range) = rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        let (_, last) = range.split_once(':')?;
        return Some((class, last.trim().parse().ok()?));
    }
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((class, rest.parse().ok()?))
}

/// Scan a header-prefixed fragment for register usage.
pub fn register_usage(fragment: &str) -> RegisterUsage {
    let mut usage = RegisterUsage::default();
    for line in fragment_body(fragment).lines() {
        let line = line.trim();
        if line.is_empty() || is_comment_line(line) || standalone_label(line).is_some() {
            continue;
        }
        let code = match line.find(ADDRESS_START_TOKEN) {
            Some(pos) => &line[..pos],
            None => line,
        };
        let mut tokens = code.split(|c: char| c.is_whitespace() || c == ',');
        if !matches!(tokens.next(), Some(mnemonic) if !mnemonic.is_empty()) {
            continue;
        }
        usage.instructions += 1;
        for token in tokens.filter(|t| !t.is_empty()) {
            if let Some((class, index)) = parse_register(token) {
                usage.note(class, index);
            }
        }
    }
    usage
}

fn na_or(value: Option<u64>) -> String {
    value.map_or_else(|| NA_VALUE.to_string(), |v| v.to_string())
}

/// One statistics CSV document (header plus a single row).
pub fn statistics_csv(device: &str, kernel: &str, code_size: Option<u64>, fragment: &str) -> String {
    let usage = register_usage(fragment);
    let props = device_props(device);
    format!(
        "{STATISTICS_HEADER}\n{device},{kernel},{},{},{},{},{},{},{}\n",
        na_or(code_size),
        usage.instructions,
        usage.sgprs,
        na_or(props.map(|p| p.available_sgprs)),
        usage.vgprs,
        na_or(props.map(|p| p.available_vgprs)),
        na_or(props.map(|p| p.available_lds_bytes)),
    )
}
