//! wordvm virtual machine: executes 16-bit stack bytecode modules.
//!
//! The machine has:
//! - An operand stack of [`Word`]s for arguments and results
//! - A return stack for call addresses and scratch values
//! - A table of loaded bytecode modules, grown on demand through a
//!   [`ModuleLoader`]
//! - A table of host [`SystemModule`]s reachable with `extern_call`
//!
//! # Usage
//!
//! ```
//! use wordvm_common::{encode_module, Opcode};
//! use wordvm_vm::Machine;
//!
//! // push_imm 7; push_imm 5; sub; return
//! let code = [
//!     Opcode::PushImm as u8, 7, 0,
//!     Opcode::PushImm as u8, 5, 0,
//!     Opcode::Sub as u8,
//!     Opcode::Return as u8,
//! ];
//! let bytes = encode_module("demo", &[("entry", 0)], &code).unwrap();
//!
//! let mut machine = Machine::default();
//! machine.load_module_bytes(&bytes).unwrap();
//! machine.execute_first_module().unwrap();
//! assert_eq!(machine.stack().as_slice(), [2]);
//! ```

pub mod error;
pub mod execute;
pub mod loader;
pub mod machine;
pub mod module_id;
pub mod stack;
pub mod system;

pub use error::{StackKind, VmError};
pub use loader::{ModuleLoader, NoLoader};
pub use machine::{
    Machine, MachineConfig, DEFAULT_RETURN_STACK_CAPACITY, DEFAULT_STACK_CAPACITY, ENTRY_EXPORT,
};
pub use module_id::{ModuleId, SYSTEM_MODULE_MASK};
pub use stack::{Stack, StackFault};
pub use system::{HostContext, SystemModule};

use wordvm_common::Word;

/// Load `bytes` into a fresh machine and run its `entry` export.
///
/// Returns the final operand stack, bottom first.
///
/// # Errors
///
/// Returns [`VmError`] if the header is malformed, there is no `entry`
/// export, or execution traps.
pub fn run(bytes: &[u8]) -> Result<Vec<Word>, VmError> {
    let mut machine = Machine::default();
    machine.load_module_bytes(bytes)?;
    machine.execute_first_module()?;
    Ok(machine.stack().as_slice().to_vec())
}
