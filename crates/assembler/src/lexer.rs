//! Tokenizer for wordvm assembly text.

use std::fmt;

use wordvm_common::Opcode;

use crate::error::AsmError;

/// A single token from an assembly line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// A mnemonic or label reference. Case is preserved.
    Ident(String),
    /// A numeric literal (decimal, possibly negative, or hex).
    Number(i64),
    /// A quoted string literal, escapes resolved.
    Str(Vec<u8>),
    /// `name:`, a label definition.
    Label(String),
    /// `.name`, lowercased, without the dot.
    Directive(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => f.write_str(s),
            Token::Number(n) => write!(f, "{n}"),
            Token::Str(bytes) => write!(f, "\"{}\"", String::from_utf8_lossy(bytes)),
            Token::Label(s) => write!(f, "{s}:"),
            Token::Directive(s) => write!(f, ".{s}"),
        }
    }
}

/// Tokenize a single line of assembly text.
///
/// Returns an empty Vec for blank lines and comment-only lines.
/// Comments start with `;` (outside a string) and extend to end of line.
pub(crate) fn tokenize_line(line: &str, line_num: usize) -> Result<Vec<Token>, AsmError> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == ';' {
            break;
        }
        if c == '"' {
            chars.next();
            tokens.push(Token::Str(string_literal(&mut chars, line_num)?));
            continue;
        }

        let mut end = line.len();
        while let Some(&(i, c)) = chars.peek() {
            if c.is_whitespace() || c == ';' || c == '"' {
                end = i;
                break;
            }
            chars.next();
        }
        tokens.push(classify(&line[start..end], line_num)?);
    }

    Ok(tokens)
}

fn classify(word: &str, line_num: usize) -> Result<Token, AsmError> {
    if Opcode::from_mnemonic(word).is_some() {
        return Ok(Token::Ident(word.to_string()));
    }
    if let Some(name) = word.strip_prefix('.').filter(|n| !n.is_empty()) {
        return Ok(Token::Directive(name.to_ascii_lowercase()));
    }
    if let Some(name) = word.strip_suffix(':').filter(|n| !n.is_empty()) {
        return Ok(Token::Label(name.to_string()));
    }

    let (negative, digits) = match word.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, word),
    };
    let invalid = || AsmError::InvalidNumber {
        line: line_num,
        token: word.to_string(),
    };
    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).map_err(|_| invalid())?
    } else if digits.as_bytes().first().is_some_and(|b| b.is_ascii_digit()) {
        digits.parse::<i64>().map_err(|_| invalid())?
    } else {
        return Ok(Token::Ident(word.to_string()));
    };

    Ok(Token::Number(if negative { -magnitude } else { magnitude }))
}

fn string_literal(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    line_num: usize,
) -> Result<Vec<u8>, AsmError> {
    let mut out = Vec::new();
    let mut buf = [0u8; 4];

    while let Some((_, c)) = chars.next() {
        match c {
            '"' => return Ok(out),
            '\\' => {
                let (_, e) = chars
                    .next()
                    .ok_or(AsmError::UnterminatedString { line: line_num })?;
                let byte = match e {
                    'n' => b'\n',
                    't' => b'\t',
                    'r' => b'\r',
                    '0' => 0,
                    '\\' => b'\\',
                    '"' => b'"',
                    'x' => {
                        let hi = chars.next().map(|(_, c)| c);
                        let lo = chars.next().map(|(_, c)| c);
                        let digits: String = hi.into_iter().chain(lo).collect();
                        u8::from_str_radix(&digits, 16).map_err(|_| AsmError::InvalidEscape {
                            line: line_num,
                            escape: format!("x{digits}"),
                        })?
                    }
                    other => {
                        return Err(AsmError::InvalidEscape {
                            line: line_num,
                            escape: other.to_string(),
                        })
                    }
                };
                out.push(byte);
            }
            _ => out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes()),
        }
    }

    Err(AsmError::UnterminatedString { line: line_num })
}
