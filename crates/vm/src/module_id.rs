//! Module ids as seen by bytecode.
//!
//! A module id is a machine word. System modules have
//! [`SYSTEM_MODULE_MASK`] OR'd into their table index; bytecode modules use
//! the plain index. The low bits always recover the table index.

use std::fmt;

use wordvm_common::Word;

/// Reserved bit marking a system-module id.
pub const SYSTEM_MODULE_MASK: u16 = 0x8000;

/// Identifies a loaded bytecode module or a registered system module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleId(u16);

impl ModuleId {
    /// Id of the bytecode module at `index` in the module table.
    pub fn bytecode(index: usize) -> Self {
        Self(index as u16 & !SYSTEM_MODULE_MASK)
    }

    /// Id of the system module at `index` in the system-module table.
    pub fn system(index: usize) -> Self {
        Self(index as u16 | SYSTEM_MODULE_MASK)
    }

    /// Reinterpret a stack word as a module id.
    pub fn from_word(word: Word) -> Self {
        Self(word as u16)
    }

    /// The id as pushed onto the operand stack.
    pub fn to_word(self) -> Word {
        self.0 as Word
    }

    /// Raw 16-bit id.
    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn is_system(self) -> bool {
        self.0 & SYSTEM_MODULE_MASK != 0
    }

    /// Table index with the reserved bit stripped.
    pub fn index(self) -> usize {
        (self.0 & !SYSTEM_MODULE_MASK) as usize
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_system() {
            write!(f, "system#{}", self.index())
        } else {
            write!(f, "module#{}", self.index())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_ids_carry_the_mask() {
        let id = ModuleId::system(3);
        assert!(id.is_system());
        assert_eq!(id.index(), 3);
        assert_eq!(id.raw(), 0x8003);
        assert!(id.to_word() < 0);
    }

    #[test]
    fn bytecode_ids_do_not() {
        let id = ModuleId::bytecode(3);
        assert!(!id.is_system());
        assert_eq!(id.index(), 3);
        assert_eq!(id.to_word(), 3);
    }

    #[test]
    fn word_roundtrip() {
        let id = ModuleId::system(1);
        assert_eq!(ModuleId::from_word(id.to_word()), id);
    }

    #[test]
    fn display() {
        assert_eq!(ModuleId::system(0).to_string(), "system#0");
        assert_eq!(ModuleId::bytecode(2).to_string(), "module#2");
    }
}
