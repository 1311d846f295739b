//! Error types for the wordvm assembler.

use thiserror::Error;
use wordvm_common::EncodeError;

/// Errors produced during assembly of text to a module binary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// An unrecognized opcode mnemonic was encountered.
    #[error("line {line}: unknown opcode '{token}'")]
    UnknownOpcode { line: usize, token: String },

    /// An unrecognized `.directive` was encountered.
    #[error("line {line}: unknown directive '{token}'")]
    UnknownDirective { line: usize, token: String },

    /// An opcode or directive did not have enough arguments.
    #[error("line {line}: {what} expects {expected} argument(s)")]
    MissingArgument {
        line: usize,
        what: &'static str,
        expected: usize,
    },

    /// A numeric literal could not be parsed.
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    /// A number does not fit the field it is used for.
    #[error("line {line}: {value} does not fit in {width}")]
    NumberOutOfRange {
        line: usize,
        value: i64,
        width: &'static str,
    },

    /// A token appeared where it was not expected.
    #[error("line {line}: unexpected token '{token}'")]
    UnexpectedToken { line: usize, token: String },

    /// A string literal has no closing quote.
    #[error("line {line}: unterminated string")]
    UnterminatedString { line: usize },

    /// A backslash escape inside a string is not recognized.
    #[error("line {line}: invalid escape '\\{escape}'")]
    InvalidEscape { line: usize, escape: String },

    /// The same label was defined twice.
    #[error("line {line}: label '{label}' already defined")]
    DuplicateLabel { line: usize, label: String },

    /// A label was referenced but never defined.
    #[error("line {line}: undefined label '{label}'")]
    UndefinedLabel { line: usize, label: String },

    /// No `.module` directive.
    #[error("missing .module directive")]
    MissingModuleName,

    /// More than one `.module` directive.
    #[error("line {line}: module name already set")]
    DuplicateModuleName { line: usize },

    /// The code region grew past what a 16-bit address can reach.
    #[error("line {line}: code region exceeds 65536 bytes")]
    CodeTooLarge { line: usize },

    /// The header could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}
