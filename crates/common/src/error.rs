//! Decode and encode errors for wordvm modules and instruction streams.

use crate::opcode::Opcode;
use thiserror::Error;

/// Errors from parsing a module header.
///
/// Every variant is an "invalid header" condition; the variants only say
/// which field was malformed and where.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// A length-prefixed field would read past the end of the input.
    #[error("invalid header: {field} truncated at byte {offset}")]
    Truncated { field: &'static str, offset: usize },

    /// A module or export name is not valid UTF-8.
    #[error("invalid header: {field} at byte {offset} is not valid UTF-8")]
    InvalidName { field: &'static str, offset: usize },

    /// The code/data region is larger than 16-bit addresses can reach.
    #[error("invalid header: code region is {len} bytes (max 65536)")]
    CodeTooLarge { len: usize },
}

/// Errors from decoding a single instruction out of a code region.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Decoding was requested at or past the end of the code.
    #[error("no instruction at offset {at} (end of code)")]
    EndOfCode { at: usize },

    /// The byte is not an opcode.
    #[error("unknown opcode {opcode:#04x} at offset {at}")]
    UnknownOpcode { opcode: u8, at: usize },

    /// The opcode takes a 16-bit immediate but the code ends first.
    #[error("{} at offset {at} is missing its immediate", .opcode.mnemonic())]
    TruncatedImmediate { opcode: Opcode, at: usize },
}

/// Errors from encoding a module header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A module or export name does not fit a one-byte length prefix.
    #[error("name '{name}' is {len} bytes (max 255)")]
    NameTooLong { name: String, len: usize },

    /// The export table does not fit a one-byte count.
    #[error("{count} exports (max 255)")]
    TooManyExports { count: usize },

    /// The code/data region is larger than 16-bit addresses can reach.
    #[error("code region is {len} bytes (max 65536)")]
    CodeTooLarge { len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_truncated() {
        assert_eq!(
            HeaderError::Truncated {
                field: "module name",
                offset: 1
            }
            .to_string(),
            "invalid header: module name truncated at byte 1"
        );
    }

    #[test]
    fn display_unknown_opcode() {
        assert_eq!(
            DecodeError::UnknownOpcode {
                opcode: 0xEE,
                at: 3
            }
            .to_string(),
            "unknown opcode 0xee at offset 3"
        );
    }

    #[test]
    fn display_truncated_immediate() {
        assert_eq!(
            DecodeError::TruncatedImmediate {
                opcode: Opcode::PushImm,
                at: 7
            }
            .to_string(),
            "push_imm at offset 7 is missing its immediate"
        );
    }

    #[test]
    fn display_name_too_long() {
        let e = EncodeError::NameTooLong {
            name: "x".repeat(300),
            len: 300,
        };
        assert!(e.to_string().ends_with("is 300 bytes (max 255)"));
    }
}
