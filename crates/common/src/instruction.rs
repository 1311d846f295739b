//! Instruction encoding and decoding for the wordvm instruction set.
//!
//! Instructions are variable length:
//! ```text
//! Byte 0:     opcode (u8)
//! Bytes 1-2:  immediate (u16, little-endian), *_imm opcodes only
//! ```

use crate::error::DecodeError;
use crate::opcode::Opcode;

/// A single decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// The operation to perform.
    pub opcode: Opcode,
    /// The immediate operand. `Some` exactly when the opcode takes one.
    pub immediate: Option<u16>,
}

impl Instruction {
    /// An instruction without an immediate.
    pub fn simple(opcode: Opcode) -> Self {
        Self {
            opcode,
            immediate: None,
        }
    }

    /// An instruction carrying a 16-bit immediate.
    pub fn with_immediate(opcode: Opcode, immediate: u16) -> Self {
        Self {
            opcode,
            immediate: Some(immediate),
        }
    }

    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        1 + self.opcode.immediate_len()
    }

    /// Always false: every instruction has at least an opcode byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Append the encoded bytes to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.opcode as u8);
        if self.opcode.has_immediate() {
            out.extend_from_slice(&self.immediate.unwrap_or(0).to_le_bytes());
        }
    }

    /// Decode the instruction starting at `at` in `code`.
    pub fn decode(code: &[u8], at: usize) -> Result<Self, DecodeError> {
        let byte = *code.get(at).ok_or(DecodeError::EndOfCode { at })?;
        let opcode =
            Opcode::try_from(byte).map_err(|e| DecodeError::UnknownOpcode { opcode: e.0, at })?;

        if !opcode.has_immediate() {
            return Ok(Self::simple(opcode));
        }

        match code.get(at + 1..at + 3) {
            Some(&[lo, hi]) => Ok(Self::with_immediate(opcode, u16::from_le_bytes([lo, hi]))),
            _ => Err(DecodeError::TruncatedImmediate { opcode, at }),
        }
    }
}

/// Encode a sequence of instructions into a contiguous code region.
pub fn encode_all(instructions: &[Instruction]) -> Vec<u8> {
    let mut out = Vec::with_capacity(instructions.len() * 3);
    for instr in instructions {
        instr.encode_into(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_simple() {
        let mut out = Vec::new();
        Instruction::simple(Opcode::Add).encode_into(&mut out);
        assert_eq!(out, [1]);
    }

    #[test]
    fn immediate_is_little_endian() {
        let mut out = Vec::new();
        Instruction::with_immediate(Opcode::PushImm, 0xABCD).encode_into(&mut out);
        assert_eq!(out, [12, 0xCD, 0xAB]);
    }

    #[test]
    fn decode_at_offset() {
        let code = [0, 12, 0x34, 0x12, 8];
        assert_eq!(
            Instruction::decode(&code, 1),
            Ok(Instruction::with_immediate(Opcode::PushImm, 0x1234))
        );
        assert_eq!(
            Instruction::decode(&code, 4),
            Ok(Instruction::simple(Opcode::Return))
        );
    }

    #[test]
    fn decode_rejects_unknown_opcode() {
        assert_eq!(
            Instruction::decode(&[0xEE], 0),
            Err(DecodeError::UnknownOpcode {
                opcode: 0xEE,
                at: 0
            })
        );
    }

    #[test]
    fn decode_rejects_truncated_immediate() {
        assert_eq!(
            Instruction::decode(&[16, 0x01], 0),
            Err(DecodeError::TruncatedImmediate {
                opcode: Opcode::JumpImm,
                at: 0
            })
        );
    }

    #[test]
    fn decode_past_end() {
        assert_eq!(
            Instruction::decode(&[0], 1),
            Err(DecodeError::EndOfCode { at: 1 })
        );
    }

    #[test]
    fn lengths() {
        assert_eq!(Instruction::simple(Opcode::Dup).len(), 1);
        assert_eq!(Instruction::with_immediate(Opcode::CallImm, 0).len(), 3);
    }

    #[test]
    fn encode_all_concatenates() {
        let code = encode_all(&[
            Instruction::with_immediate(Opcode::PushImm, 3),
            Instruction::with_immediate(Opcode::PushImm, 4),
            Instruction::simple(Opcode::Add),
            Instruction::simple(Opcode::Return),
        ]);
        assert_eq!(code, [12, 3, 0, 12, 4, 0, 1, 8]);
    }
}
