//! Parser for wordvm assembly tokens → items.
//!
//! Each line yields zero or more label definitions followed by at most one
//! directive or instruction. Label references stay symbolic here; the
//! layout pass in `lib.rs` resolves them.

use wordvm_common::Opcode;

use crate::error::AsmError;
use crate::lexer::Token;

pub(crate) use wordvm_common::MAX_CODE_LEN;

/// A 16-bit operand: a literal or a label to be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Operand {
    Number(u16),
    Label(String),
}

/// One unit of assembly output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Item {
    /// `.module NAME`
    Module(String),
    /// `.export NAME [OFFSET]`; no offset means the label `NAME`.
    Export {
        name: String,
        offset: Option<Operand>,
    },
    /// `name:`
    Label(String),
    Instruction {
        opcode: Opcode,
        operand: Option<Operand>,
    },
    /// `.byte`, `.string` and `.zero`.
    Bytes(Vec<u8>),
    /// `.word`
    Words(Vec<Operand>),
}

impl Item {
    /// Bytes this item occupies in the code region.
    pub(crate) fn size(&self) -> usize {
        match self {
            Item::Module(_) | Item::Export { .. } | Item::Label(_) => 0,
            Item::Instruction { opcode, .. } => 1 + opcode.immediate_len(),
            Item::Bytes(bytes) => bytes.len(),
            Item::Words(words) => 2 * words.len(),
        }
    }
}

/// Parse the tokens of one line.
///
/// Returns an empty Vec for blank lines.
pub(crate) fn parse_line(tokens: &[Token], line_num: usize) -> Result<Vec<Item>, AsmError> {
    let mut items = Vec::new();
    let mut rest = tokens;

    while let Some((Token::Label(name), tail)) = rest.split_first() {
        items.push(Item::Label(name.clone()));
        rest = tail;
    }

    let Some((head, args)) = rest.split_first() else {
        return Ok(items);
    };

    let item = match head {
        Token::Directive(directive) => parse_directive(directive, args, line_num)?,
        Token::Ident(mnemonic) => parse_instruction(mnemonic, args, line_num)?,
        other => return Err(unexpected(other, line_num)),
    };
    items.push(item);
    Ok(items)
}

fn parse_instruction(mnemonic: &str, args: &[Token], line_num: usize) -> Result<Item, AsmError> {
    let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| AsmError::UnknownOpcode {
        line: line_num,
        token: mnemonic.to_string(),
    })?;

    if !opcode.has_immediate() {
        expect_end(args, line_num)?;
        return Ok(Item::Instruction {
            opcode,
            operand: None,
        });
    }

    let operand = args.first().ok_or(AsmError::MissingArgument {
        line: line_num,
        what: opcode.mnemonic(),
        expected: 1,
    })?;
    let operand = expect_operand(operand, line_num)?;
    expect_end(&args[1..], line_num)?;
    Ok(Item::Instruction {
        opcode,
        operand: Some(operand),
    })
}

fn parse_directive(directive: &str, args: &[Token], line_num: usize) -> Result<Item, AsmError> {
    match directive {
        "module" => {
            let name = expect_name(args.first(), line_num, ".module")?;
            expect_end(&args[1..], line_num)?;
            Ok(Item::Module(name))
        }

        "export" => {
            let name = expect_name(args.first(), line_num, ".export")?;
            let offset = args
                .get(1)
                .map(|t| expect_operand(t, line_num))
                .transpose()?;
            expect_end(args.get(2..).unwrap_or(&[]), line_num)?;
            Ok(Item::Export { name, offset })
        }

        "byte" => {
            expect_some(args, line_num, ".byte")?;
            let bytes = args
                .iter()
                .map(|t| match t {
                    Token::Number(n) => narrow(*n, -0x80, 0xFF, "a byte", line_num).map(|v| v as u8),
                    other => Err(unexpected(other, line_num)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Item::Bytes(bytes))
        }

        "word" => {
            expect_some(args, line_num, ".word")?;
            let words = args
                .iter()
                .map(|t| expect_operand(t, line_num))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Item::Words(words))
        }

        "string" => {
            let mut bytes = match args.first() {
                Some(Token::Str(bytes)) => bytes.clone(),
                Some(other) => return Err(unexpected(other, line_num)),
                None => {
                    return Err(AsmError::MissingArgument {
                        line: line_num,
                        what: ".string",
                        expected: 1,
                    })
                }
            };
            expect_end(&args[1..], line_num)?;
            bytes.push(0);
            Ok(Item::Bytes(bytes))
        }

        "zero" => {
            let count = match args.first() {
                Some(Token::Number(n)) => {
                    narrow(*n, 0, MAX_CODE_LEN as i64, "a code region", line_num)? as usize
                }
                Some(other) => return Err(unexpected(other, line_num)),
                None => {
                    return Err(AsmError::MissingArgument {
                        line: line_num,
                        what: ".zero",
                        expected: 1,
                    })
                }
            };
            expect_end(&args[1..], line_num)?;
            Ok(Item::Bytes(vec![0; count]))
        }

        _ => Err(AsmError::UnknownDirective {
            line: line_num,
            token: format!(".{directive}"),
        }),
    }
}

/// A name for `.module`/`.export`: a bare identifier or a quoted string.
fn expect_name(
    token: Option<&Token>,
    line_num: usize,
    what: &'static str,
) -> Result<String, AsmError> {
    match token {
        Some(Token::Ident(name)) => Ok(name.clone()),
        Some(Token::Str(bytes)) => String::from_utf8(bytes.clone()).map_err(|_| {
            AsmError::UnexpectedToken {
                line: line_num,
                token: String::from_utf8_lossy(bytes).into_owned(),
            }
        }),
        Some(other) => Err(unexpected(other, line_num)),
        None => Err(AsmError::MissingArgument {
            line: line_num,
            what,
            expected: 1,
        }),
    }
}

fn expect_operand(token: &Token, line_num: usize) -> Result<Operand, AsmError> {
    match token {
        Token::Number(n) => {
            // Accept both signed and unsigned spellings of a 16-bit value.
            let v = narrow(*n, i16::MIN as i64, u16::MAX as i64, "16 bits", line_num)?;
            Ok(Operand::Number(v as u16))
        }
        Token::Ident(label) => Ok(Operand::Label(label.clone())),
        other => Err(unexpected(other, line_num)),
    }
}

fn narrow(value: i64, min: i64, max: i64, width: &'static str, line_num: usize) -> Result<i64, AsmError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(AsmError::NumberOutOfRange {
            line: line_num,
            value,
            width,
        })
    }
}

fn expect_some(args: &[Token], line_num: usize, what: &'static str) -> Result<(), AsmError> {
    if args.is_empty() {
        return Err(AsmError::MissingArgument {
            line: line_num,
            what,
            expected: 1,
        });
    }
    Ok(())
}

fn expect_end(args: &[Token], line_num: usize) -> Result<(), AsmError> {
    match args.first() {
        Some(extra) => Err(unexpected(extra, line_num)),
        None => Ok(()),
    }
}

fn unexpected(token: &Token, line_num: usize) -> AsmError {
    AsmError::UnexpectedToken {
        line: line_num,
        token: token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize_line;

    fn parse(line: &str) -> Result<Vec<Item>, AsmError> {
        parse_line(&tokenize_line(line, 1)?, 1)
    }

    #[test]
    fn blank_line_is_empty() {
        assert_eq!(parse("  ; nothing").unwrap(), vec![]);
    }

    #[test]
    fn simple_instruction() {
        assert_eq!(
            parse("ADD").unwrap(),
            vec![Item::Instruction {
                opcode: Opcode::Add,
                operand: None
            }]
        );
    }

    #[test]
    fn immediate_number_and_label() {
        assert_eq!(
            parse("push -1").unwrap(),
            vec![Item::Instruction {
                opcode: Opcode::PushImm,
                operand: Some(Operand::Number(0xFFFF))
            }]
        );
        assert_eq!(
            parse("loop: jump_imm loop").unwrap(),
            vec![
                Item::Label("loop".to_string()),
                Item::Instruction {
                    opcode: Opcode::JumpImm,
                    operand: Some(Operand::Label("loop".to_string()))
                }
            ]
        );
    }

    #[test]
    fn label_only_line() {
        assert_eq!(parse("a: b:").unwrap(), vec![
            Item::Label("a".to_string()),
            Item::Label("b".to_string())
        ]);
    }

    #[test]
    fn directives() {
        assert_eq!(parse(".module demo").unwrap(), vec![Item::Module("demo".to_string())]);
        assert_eq!(
            parse(".module \"two words\"").unwrap(),
            vec![Item::Module("two words".to_string())]
        );
        assert_eq!(
            parse(".export entry 0x10").unwrap(),
            vec![Item::Export {
                name: "entry".to_string(),
                offset: Some(Operand::Number(0x10))
            }]
        );
        assert_eq!(
            parse(".export main").unwrap(),
            vec![Item::Export {
                name: "main".to_string(),
                offset: None
            }]
        );
        assert_eq!(parse(".byte 1 -1 0xff").unwrap(), vec![Item::Bytes(vec![1, 0xff, 0xff])]);
        assert_eq!(parse(".string \"hi\"").unwrap(), vec![Item::Bytes(b"hi\0".to_vec())]);
        assert_eq!(parse(".zero 3").unwrap(), vec![Item::Bytes(vec![0, 0, 0])]);
        assert_eq!(
            parse(".word 1 msg").unwrap(),
            vec![Item::Words(vec![
                Operand::Number(1),
                Operand::Label("msg".to_string())
            ])]
        );
    }

    #[test]
    fn sizes() {
        assert_eq!(parse("push 1").unwrap()[0].size(), 3);
        assert_eq!(parse("dup").unwrap()[0].size(), 1);
        assert_eq!(parse(".word 1 2").unwrap()[0].size(), 4);
        assert_eq!(parse(".module m").unwrap()[0].size(), 0);
    }

    #[test]
    fn errors() {
        assert!(matches!(parse("frob"), Err(AsmError::UnknownOpcode { line: 1, .. })));
        assert!(matches!(parse(".bogus"), Err(AsmError::UnknownDirective { .. })));
        assert!(matches!(
            parse("push"),
            Err(AsmError::MissingArgument {
                what: "push_imm",
                ..
            })
        ));
        assert!(matches!(parse("add 1"), Err(AsmError::UnexpectedToken { .. })));
        assert!(matches!(
            parse("push 70000"),
            Err(AsmError::NumberOutOfRange { value: 70000, .. })
        ));
        assert!(matches!(parse(".byte 256"), Err(AsmError::NumberOutOfRange { .. })));
        assert!(matches!(parse(".byte"), Err(AsmError::MissingArgument { .. })));
        assert!(matches!(parse(".string 5"), Err(AsmError::UnexpectedToken { .. })));
        assert!(matches!(parse("42"), Err(AsmError::UnexpectedToken { .. })));
    }
}
