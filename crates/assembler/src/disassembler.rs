//! Disassembler: module binary → canonical assembly text.
//!
//! Output is flat text: the `.module` line, one `.export` per export with
//! an explicit offset, then one instruction per line. No labels, no
//! indentation, no comments. Bytes that do not decode as an instruction
//! come out as `.byte` lines.

use wordvm_common::{DecodeError, Instruction, Module};

/// Disassemble a module into canonical assembly text.
///
/// The output is guaranteed to reassemble to identical bytes
/// (`assemble(&disassemble(&module)) == module.bytes()`).
pub fn disassemble(module: &Module) -> String {
    let mut lines = vec![format!(".module {}", quote_name(module.name()))];
    for export in module.exports() {
        lines.push(format!(".export {} 0x{:04x}", quote_name(export.name), export.offset));
    }

    let code = module.code();
    let mut at = 0;
    while at < code.len() {
        let line = match Instruction::decode(code, at) {
            Ok(instr) => {
                at += instr.len();
                match instr.immediate {
                    Some(imm) => format!("{} 0x{:04x}", instr.opcode.mnemonic(), imm),
                    None => instr.opcode.mnemonic().to_string(),
                }
            }
            Err(DecodeError::TruncatedImmediate { .. }) => {
                // The opcode byte and whatever follows it up to the end.
                let tail: Vec<String> = code[at..].iter().map(|b| format!("0x{b:02x}")).collect();
                at = code.len();
                format!(".byte {}", tail.join(" "))
            }
            Err(_) => {
                let byte = code[at];
                at += 1;
                format!(".byte 0x{byte:02x}")
            }
        };
        lines.push(line);
    }

    let mut result = lines.join("\n");
    result.push('\n');
    result
}

/// A name as it must appear in source: bare when it lexes back as a plain
/// identifier, otherwise quoted.
fn quote_name(name: &str) -> String {
    let bare = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if bare {
        return name.to_string();
    }

    let mut quoted = String::from("\"");
    for c in name.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c if c.is_ascii_control() => quoted.push_str(&format!("\\x{:02x}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordvm_common::encode_module;

    fn module(name: &str, exports: &[(&str, u16)], code: &[u8]) -> Module {
        Module::parse(&encode_module(name, exports, code).unwrap()).unwrap()
    }

    #[test]
    fn header_and_instructions() {
        let m = module("demo", &[("entry", 0)], &[12, 0x2a, 0x00, 8]);
        assert_eq!(
            disassemble(&m),
            ".module demo\n.export entry 0x0000\npush_imm 0x002a\nreturn\n"
        );
    }

    #[test]
    fn header_only_module_is_one_line() {
        assert_eq!(disassemble(&module("m", &[], &[])), ".module m\n");
    }

    #[test]
    fn undecodable_bytes_become_byte_lines() {
        let m = module("m", &[], &[0xEE, 0, 12, 0x01]);
        assert_eq!(
            disassemble(&m),
            ".module m\n.byte 0xee\nnop\n.byte 0x0c 0x01\n"
        );
    }

    #[test]
    fn awkward_names_are_quoted() {
        assert_eq!(quote_name("entry"), "entry");
        assert_eq!(quote_name("_x1"), "_x1");
        assert_eq!(quote_name(""), "\"\"");
        assert_eq!(quote_name("9lives"), "\"9lives\"");
        assert_eq!(quote_name("add:"), "\"add:\"");
        assert_eq!(quote_name("a \"b\""), "\"a \\\"b\\\"\"");
        assert_eq!(quote_name("\u{1}"), "\"\\x01\"");
    }
}
