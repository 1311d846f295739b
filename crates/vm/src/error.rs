//! Errors for loading and executing wordvm modules.
//!
//! Runtime variants carry the program counter (`at`) of the faulting
//! instruction: the offset of its opcode byte in the current module's
//! code region.

use std::fmt;

use thiserror::Error;
use wordvm_common::{HeaderError, Opcode, Word};

use crate::stack::StackFault;

/// Which of the machine's two stacks faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackKind {
    Operand,
    Return,
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackKind::Operand => f.write_str("operand stack"),
            StackKind::Return => f.write_str("return stack"),
        }
    }
}

/// Errors from loading or executing modules.
///
/// None of these are recovered from inside the machine; they propagate to
/// the host unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// Malformed module bytes.
    #[error(transparent)]
    InvalidHeader(#[from] HeaderError),

    /// The name resolves neither in the module table nor via the loader.
    #[error("module not found: '{name}'")]
    ModuleNotFound { name: String },

    /// The module has no export with the requested name.
    #[error("export '{entry}' not found in module '{module}'")]
    EntryNotFound { module: String, entry: String },

    /// The program counter ran past the end of the code without a
    /// top-level return.
    #[error("reached end of module without return opcode at {at}")]
    EofWithoutReturn { at: usize },

    /// The fetched byte is not an opcode.
    #[error("unknown opcode {opcode:#04x} at {at}")]
    UnknownOpcode { opcode: u8, at: usize },

    /// `extern_call` targeted a bytecode module.
    #[error("cross-module call to bytecode module {module_id} is not supported at {at}")]
    CrossModuleCall { module_id: Word, at: usize },

    /// `extern_call` targeted a system-module id that is not registered.
    #[error("invalid module id {module_id:#06x} at {at}")]
    InvalidModuleId { module_id: u16, at: usize },

    /// Push onto a full stack.
    #[error("{stack} overflow at {at}")]
    StackOverflow { stack: StackKind, at: usize },

    /// Pop or peek on an empty stack.
    #[error("{stack} underflow at {at}")]
    StackUnderflow { stack: StackKind, at: usize },

    /// Load, store or name read outside the current module's code region.
    #[error("{} address {address:#06x} out of bounds (code length {len}) at {at}", .opcode.mnemonic())]
    AddressOutOfBounds {
        opcode: Opcode,
        address: usize,
        len: usize,
        at: usize,
    },

    /// `div` or `mod` with a zero divisor.
    #[error("division by zero at {at}")]
    DivisionByZero { at: usize },

    /// `execute_first_module` with an empty module table.
    #[error("no module loaded")]
    NoModuleLoaded,

    /// A system module routine failed for a host-side reason.
    #[error("system module '{module}' failed at {at}: {message}")]
    Host {
        module: String,
        message: String,
        at: usize,
    },
}

impl VmError {
    /// Map a stack fault on `stack` at instruction `at`.
    pub(crate) fn from_stack_fault(stack: StackKind, fault: StackFault, at: usize) -> Self {
        match fault {
            StackFault::Overflow => VmError::StackOverflow { stack, at },
            StackFault::Underflow => VmError::StackUnderflow { stack, at },
        }
    }

    /// Whether this is a resolution failure (the module or entry point
    /// could not be found) rather than a fault during execution.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            VmError::ModuleNotFound { .. } | VmError::EntryNotFound { .. } | VmError::NoModuleLoaded
        )
    }
}
