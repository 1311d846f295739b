//! The machine word.
//!
//! Stack slots hold signed 16-bit words. Arithmetic wraps. When a word is
//! used as an address, jump target or module id its bits are read as
//! unsigned.

/// A machine word.
pub type Word = i16;

/// Canonical truth value pushed by comparisons.
pub const TRUE_WORD: Word = 1;

/// Canonical false value pushed by comparisons.
pub const FALSE_WORD: Word = 0;

/// Convert a boolean to its canonical word.
pub fn from_bool(b: bool) -> Word {
    if b {
        TRUE_WORD
    } else {
        FALSE_WORD
    }
}

/// Reinterpret a word as an unsigned address.
pub fn to_address(word: Word) -> usize {
    word as u16 as usize
}

/// Reinterpret an unsigned 16-bit value (immediate, address) as a word.
pub fn from_u16(value: u16) -> Word {
    value as Word
}
