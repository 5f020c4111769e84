//! Single-line recognizers and rewriters for disassembler output.
//!
//! Instruction lines look like
//!
//! ```text
//!     s_cbranch_scc1 BB0_3                    // 000000001110: BF85001C
//!     s_load_dwordx2 s[0:1], s[6:7], 0x0      // 000000001108: C0060003 00000000
//! ```
//!
//! with the address between `//` and `:` and the encoded bytes after it.
//! Standalone label lines are `name:`. Every function here works on one line
//! (or, for [`strip_label_addresses`], one text) and has no side effects.

/// Mnemonic substring of branch instructions.
pub const BRANCH_TOKEN: &str = "branch";
/// Mnemonic substring of call instructions.
pub const CALL_TOKEN: &str = "call";
/// Start of the address comment.
pub const ADDRESS_START_TOKEN: &str = "//";
/// End of the address inside the address comment.
pub const ADDRESS_END_TOKEN: &str = ":";
/// Disassembler comment lines start with this.
pub const COMMENT_START_TOKEN: &str = ";";
/// Non-standard encoding-size suffixes on mnemonics.
pub const ENCODING_SUFFIXES: [&str; 2] = ["_e32", "_e64"];

/// Encoded-byte text at least this long (including the `:`) means a 64-bit instruction.
const WIDE_ENCODING_TEXT_LEN: usize = 16;
const NARROW_INSTRUCTION_BYTES: u64 = 4;
const WIDE_INSTRUCTION_BYTES: u64 = 8;

/// Result of looking for an instruction address on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressParse {
    /// No address comment on the line.
    Absent,
    /// Address and instruction width in bytes.
    Parsed { address: u64, width: u64 },
    /// An address comment whose address is not hexadecimal.
    Invalid,
}

pub fn is_comment_line(line: &str) -> bool {
    line.starts_with(COMMENT_START_TOKEN)
}

/// Rewrite every `<alnum-address> <label>:` to `label:`.
///
/// Two substitutions over the whole text: drop each alphanumeric run that is
/// directly followed by ` <` (together with the ` <`), then turn every `>:`
/// into `:`.
pub fn strip_label_addresses(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut search = 0;

    while let Some(found) = text[search..].find(" <") {
        let marker = search + found;
        let mut run_start = marker;
        while run_start > copied && bytes[run_start - 1].is_ascii_alphanumeric() {
            run_start -= 1;
        }
        if run_start < marker {
            out.push_str(&text[copied..run_start]);
            copied = marker + 2;
        }
        search = marker + 2;
    }
    out.push_str(&text[copied..]);
    out.replace(">:", ":")
}

/// The name of a standalone label line (`name:`), if this is one.
///
/// The first `:` must be the last character, and the name must be non-empty
/// and free of whitespace.
pub fn standalone_label(line: &str) -> Option<&str> {
    let colon = line.find(':')?;
    if colon + 1 != line.len() || colon == 0 {
        return None;
    }
    let name = &line[..colon];
    (!name.contains(char::is_whitespace)).then_some(name)
}

/// The label operand of a branch or call instruction.
///
/// The first token of the line must contain the branch or call token. The
/// operand is the next token, unless that token opens the address comment.
pub fn branch_target(line: &str) -> Option<&str> {
    let inst = line.trim_start();
    let mnemonic_end = inst.find(char::is_whitespace)?;
    let mnemonic = &inst[..mnemonic_end];
    if !mnemonic.contains(BRANCH_TOKEN) && !mnemonic.contains(CALL_TOKEN) {
        return None;
    }
    let operand = inst[mnemonic_end..].trim_start();
    if operand.is_empty() || operand.starts_with(ADDRESS_START_TOKEN) {
        return None;
    }
    let end = operand.find(char::is_whitespace).unwrap_or(operand.len());
    Some(&operand[..end])
}

/// Rewrite `<address> <label>:` to `<address> label:`.
///
/// Returns `None` when the line has no inline label annotation.
pub fn reformat_inline_label(line: &str) -> Option<String> {
    let open = line.find(" <")?;
    if open == 0 {
        return None;
    }
    let label_start = open + 2;
    let label_end = label_start + line[label_start..].find(">:")?;
    let address_end = line.find(' ')?;
    Some(format!("{}{}:", &line[..=address_end], &line[label_start..label_end]))
}

/// Drop an `_e32`/`_e64` suffix from the mnemonic.
///
/// As many spaces as were removed are inserted in front of the address
/// comment so the encoding column stays aligned. Returns `None` when the
/// mnemonic has no such suffix.
pub fn strip_encoding_suffix(line: &str) -> Option<String> {
    let mnemonic_start = line.find(|c: char| !c.is_whitespace())?;
    let mnemonic_end = mnemonic_start + line[mnemonic_start..].find(' ')?;
    let mnemonic = &line[mnemonic_start..mnemonic_end];
    let suffix = ENCODING_SUFFIXES.iter().find(|s| mnemonic.ends_with(*s))?;

    let suffix_start = mnemonic_end - suffix.len();
    let mut rewritten = String::with_capacity(line.len());
    rewritten.push_str(&line[..suffix_start]);
    rewritten.push_str(&line[mnemonic_end..]);

    if let Some(comment) = rewritten[suffix_start..].find(ADDRESS_START_TOKEN) {
        rewritten.insert_str(suffix_start + comment, &" ".repeat(suffix.len()));
    }
    Some(rewritten)
}

/// The instruction address and width encoded in the address comment.
pub fn instruction_address(line: &str) -> AddressParse {
    let Some(comment) = line.find(ADDRESS_START_TOKEN) else {
        return AddressParse::Absent;
    };
    let address_start = comment + ADDRESS_START_TOKEN.len();
    let Some(length) = line[address_start..].find(ADDRESS_END_TOKEN) else {
        return AddressParse::Absent;
    };
    let address_end = address_start + length;

    let width = if line.len() - address_end < WIDE_ENCODING_TEXT_LEN {
        NARROW_INSTRUCTION_BYTES
    } else {
        WIDE_INSTRUCTION_BYTES
    };
    match u64::from_str_radix(line[address_start..address_end].trim(), 16) {
        Ok(address) => AddressParse::Parsed { address, width },
        Err(_) => AddressParse::Invalid,
    }
}
