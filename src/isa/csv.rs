//! Parsed-ISA CSV conversion.
//!
//! One row per instruction with the columns `Address,Opcode,Operands,Encoding`.
//! Label lines become rows with only the label (including its colon) in the
//! Opcode column. Comment and blank lines are skipped.

use super::line::{is_comment_line, ADDRESS_END_TOKEN, ADDRESS_START_TOKEN};
use super::fragment_body;

pub const CSV_HEADER: &str = "Address,Opcode,Operands,Encoding";

/// One parsed instruction or label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IsaRow {
    pub address: String,
    pub opcode: String,
    pub operands: String,
    pub encoding: String,
}

impl IsaRow {
    fn to_csv(&self) -> String {
        [&self.address, &self.opcode, &self.operands, &self.encoding]
            .iter()
            .map(|field| escape_field(field))
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Parse one line of a fragment body.
pub fn parse_line(line: &str) -> Option<IsaRow> {
    let trimmed = line.trim();
    if trimmed.is_empty() || is_comment_line(trimmed) {
        return None;
    }

    let (code, comment) = match trimmed.find(ADDRESS_START_TOKEN) {
        Some(pos) => (trimmed[..pos].trim(), Some(&trimmed[pos + ADDRESS_START_TOKEN.len()..])),
        None => (trimmed, None),
    };

    if comment.is_none() && code.ends_with(':') {
        let label = code.rsplit(char::is_whitespace).next().unwrap_or(code);
        return Some(IsaRow {
            opcode: label.to_string(),
            ..IsaRow::default()
        });
    }

    let (opcode, operands) = match code.find(char::is_whitespace) {
        Some(pos) => (&code[..pos], code[pos..].trim()),
        None => (code, ""),
    };

    let (address, encoding) = comment
        .and_then(|c| c.split_once(ADDRESS_END_TOKEN))
        .map(|(address, encoding)| (address.trim(), encoding.trim()))
        .unwrap_or_default();

    Some(IsaRow {
        address: address.to_string(),
        opcode: opcode.to_string(),
        operands: operands.to_string(),
        encoding: encoding.to_string(),
    })
}

/// Convert a header-prefixed fragment into CSV text.
pub fn isa_to_csv(fragment: &str) -> String {
    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');
    for row in fragment_body(fragment).lines().filter_map(parse_line) {
        csv.push_str(&row.to_csv());
        csv.push('\n');
    }
    csv
}
