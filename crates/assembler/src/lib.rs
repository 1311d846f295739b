//! wordvm assembler: text assembly ↔ module binary.
//!
//! Assembly is a two-pass translation. The first pass lays out the code
//! region and records label offsets; the second emits bytes with labels
//! resolved. No optimization, no macros.
//!
//! # Usage
//!
//! ```
//! use wordvm_assembler::{assemble, disassemble};
//! use wordvm_common::Module;
//!
//! let text = "\
//! .module demo
//! .export entry
//! entry:
//!     push 3
//!     push 4
//!     add
//!     return
//! ";
//! let bytes = assemble(text).unwrap();
//! let module = Module::parse(&bytes).unwrap();
//! assert_eq!(module.get_export("entry").unwrap().offset, 0);
//!
//! let canonical = disassemble(&module);
//! assert_eq!(assemble(&canonical).unwrap(), bytes);
//! ```
//!
//! # Roundtrip Guarantee
//!
//! `assemble(disassemble(module)) == module.bytes()` holds for every module
//! that parses. The disassembler outputs canonical text; the assembler also
//! accepts labels, aliases and decimal numbers.

pub mod error;

mod disassembler;
mod lexer;
mod parser;

pub use disassembler::disassemble;
pub use error::AsmError;

use std::collections::HashMap;

use lexer::tokenize_line;
use parser::{parse_line, Item, Operand, MAX_CODE_LEN};
use wordvm_common::encode_module;

/// Assemble text into module bytes.
///
/// Returns the first error encountered. Fix one error at a time.
pub fn assemble(text: &str) -> Result<Vec<u8>, AsmError> {
    let mut items = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line_num = idx + 1;
        let tokens = tokenize_line(line, line_num)?;
        items.extend(parse_line(&tokens, line_num)?.into_iter().map(|item| (line_num, item)));
    }

    // Pass 1: layout.
    let mut labels: HashMap<&str, u16> = HashMap::new();
    let mut module_name = None;
    let mut offset = 0usize;
    for (line, item) in &items {
        match item {
            Item::Module(name) => {
                if module_name.is_some() {
                    return Err(AsmError::DuplicateModuleName { line: *line });
                }
                module_name = Some(name.as_str());
            }
            Item::Label(label) => {
                let at = u16::try_from(offset).map_err(|_| AsmError::CodeTooLarge { line: *line })?;
                if labels.insert(label, at).is_some() {
                    return Err(AsmError::DuplicateLabel {
                        line: *line,
                        label: label.clone(),
                    });
                }
            }
            _ => {
                offset += item.size();
                if offset > MAX_CODE_LEN {
                    return Err(AsmError::CodeTooLarge { line: *line });
                }
            }
        }
    }
    let module_name = module_name.ok_or(AsmError::MissingModuleName)?;

    let resolve = |operand: &Operand, line: usize| -> Result<u16, AsmError> {
        match operand {
            Operand::Number(n) => Ok(*n),
            Operand::Label(label) => {
                labels
                    .get(label.as_str())
                    .copied()
                    .ok_or_else(|| AsmError::UndefinedLabel {
                        line,
                        label: label.clone(),
                    })
            }
        }
    };

    // Pass 2: emit.
    let mut code = Vec::with_capacity(offset);
    let mut exports = Vec::new();
    for (line, item) in &items {
        match item {
            Item::Module(_) | Item::Label(_) => {}
            Item::Export { name, offset } => {
                let at = match offset {
                    Some(operand) => resolve(operand, *line)?,
                    None => resolve(&Operand::Label(name.clone()), *line)?,
                };
                exports.push((name.as_str(), at));
            }
            Item::Instruction { opcode, operand } => {
                code.push(*opcode as u8);
                if let Some(operand) = operand {
                    code.extend_from_slice(&resolve(operand, *line)?.to_le_bytes());
                }
            }
            Item::Bytes(bytes) => code.extend_from_slice(bytes),
            Item::Words(words) => {
                for word in words {
                    code.extend_from_slice(&resolve(word, *line)?.to_le_bytes());
                }
            }
        }
    }

    Ok(encode_module(module_name, &exports, &code)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordvm_common::{Module, Opcode};

    #[test]
    fn assemble_minimal() {
        let bytes = assemble(".module m\n.export entry 0\nreturn\n").unwrap();
        assert_eq!(bytes, [1, b'm', 1, 5, b'e', b'n', b't', b'r', b'y', 0, 0, 8]);
    }

    #[test]
    fn labels_resolve_forward_and_backward() {
        let text = "\
.module loops
.export entry
entry:
    jump_imm body
back:
    return
body:
    jump_imm back
";
        let bytes = assemble(text).unwrap();
        let module = Module::parse(&bytes).unwrap();
        assert_eq!(
            module.code(),
            [Opcode::JumpImm as u8, 4, 0, Opcode::Return as u8, Opcode::JumpImm as u8, 3, 0]
        );
    }

    #[test]
    fn data_directives_lay_out_in_order() {
        let text = "\
.module data
push msg
msg: .string \"ok\"
table: .word msg 0x1234 -1
.byte 7
.zero 2
";
        let bytes = assemble(text).unwrap();
        let module = Module::parse(&bytes).unwrap();
        assert_eq!(
            module.code(),
            [12, 3, 0, b'o', b'k', 0, 3, 0, 0x34, 0x12, 0xff, 0xff, 7, 0, 0]
        );
    }

    #[test]
    fn assemble_with_comments_blanks_and_case() {
        let text = "\
; header
.MODULE m   ; name

  PUSH 0x2a ; push 42
  Return
";
        let bytes = assemble(text).unwrap();
        assert_eq!(Module::parse(&bytes).unwrap().code(), [12, 42, 0, 8]);
    }

    #[test]
    fn decimal_hex_and_negative_agree() {
        let a = assemble(".module m\npush 65535\n").unwrap();
        let b = assemble(".module m\npush 0xffff\n").unwrap();
        let c = assemble(".module m\npush -1\n").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn aliases_assemble_to_canonical_opcodes() {
        let err = assemble(".module m\n+ - @ ! c@\n").unwrap_err();
        assert!(matches!(err, AsmError::UnexpectedToken { line: 2, .. }));

        let text = ".module m\n+\n-\n*\n/\n%\n@\n!\nc@\nc!\n>r\nr>\nr@\n2r@\n";
        let module_bytes = assemble(text).unwrap();
        let module = Module::parse(&module_bytes).unwrap();
        assert_eq!(
            module.code(),
            [1, 2, 3, 4, 35, 10, 11, 14, 15, 31, 32, 33, 34]
        );
    }

    #[test]
    fn roundtrip_through_disassembly() {
        let text = "\
.module round
.export entry
.export helper
entry:
    push 5
    call_imm helper
    bfalse_imm done
    push -3
done:
    return
helper:
    dup
    return
msg: .string \"hi\"
";
        let bytes = assemble(text).unwrap();
        let module = Module::parse(&bytes).unwrap();
        let canonical = disassemble(&module);
        assert_eq!(assemble(&canonical).unwrap(), bytes);
    }

    #[test]
    fn error_missing_module_name() {
        assert_eq!(assemble("return\n"), Err(AsmError::MissingModuleName));
    }

    #[test]
    fn error_duplicate_module_name() {
        assert_eq!(
            assemble(".module a\n.module b\n"),
            Err(AsmError::DuplicateModuleName { line: 2 })
        );
    }

    #[test]
    fn error_duplicate_label() {
        assert_eq!(
            assemble(".module m\nx:\nnop\nx:\n"),
            Err(AsmError::DuplicateLabel {
                line: 4,
                label: "x".to_string()
            })
        );
    }

    #[test]
    fn error_undefined_label() {
        assert_eq!(
            assemble(".module m\n.export entry\nreturn\n"),
            Err(AsmError::UndefinedLabel {
                line: 2,
                label: "entry".to_string()
            })
        );
        assert!(matches!(
            assemble(".module m\njump_imm nowhere\n"),
            Err(AsmError::UndefinedLabel { line: 2, .. })
        ));
    }

    #[test]
    fn error_reports_correct_line() {
        let err = assemble(".module m\nreturn\nfrobnicate\n").unwrap_err();
        assert!(matches!(err, AsmError::UnknownOpcode { line: 3, .. }));
    }

    #[test]
    fn error_code_too_large() {
        let err = assemble(".module m\n.zero 65536\nnop\n").unwrap_err();
        assert_eq!(err, AsmError::CodeTooLarge { line: 3 });
        assert!(assemble(".module m\n.zero 65536\n").is_ok());
    }

    #[test]
    fn error_name_too_long() {
        let text = format!(".module {}\n", "n".repeat(256));
        assert!(matches!(assemble(&text), Err(AsmError::Encode(_))));
    }
}
