//! The system-module capability: host-implemented functions callable from
//! bytecode through `extern_call`.

use std::any::Any;

use wordvm_common::{Module, Opcode, Word};

use crate::error::{StackKind, VmError};
use crate::stack::{Stack, StackFault};

/// A named, host-implemented unit exposing numbered functions.
///
/// Register instances with [`Machine::add_system_module`]. Bytecode finds a
/// module with `load_module` (by [`name`](SystemModule::name)) and calls it
/// with `extern_call`.
///
/// Routines get a [`HostContext`], not the machine itself, so they cannot
/// start a nested `execute`.
///
/// [`Machine::add_system_module`]: crate::Machine::add_system_module
pub trait SystemModule: Any {
    /// Name used for `load_module` resolution. Must not change.
    fn name(&self) -> &str;

    /// Run function `function_id`.
    ///
    /// Unknown ids are the module's own business; the convention is to log a
    /// warning and do nothing.
    fn invoke_index(&mut self, ctx: &mut HostContext<'_>, function_id: Word)
        -> Result<(), VmError>;
}

/// What a system module may touch while it runs: the operand stack and the
/// bytes of the module that made the call.
pub struct HostContext<'m> {
    pub(crate) stack: &'m mut Stack<Word>,
    pub(crate) module: &'m mut Module,
    pub(crate) at: usize,
}

impl<'m> HostContext<'m> {
    /// Pop an argument.
    pub fn pop(&mut self) -> Result<Word, VmError> {
        self.stack.pop().map_err(|f| self.stack_error(f))
    }

    /// Push a result.
    pub fn push(&mut self, value: Word) -> Result<(), VmError> {
        self.stack.push(value).map_err(|f| self.stack_error(f))
    }

    /// Read the top of the operand stack without removing it.
    pub fn peek(&self) -> Result<Word, VmError> {
        self.stack.peek().map_err(|f| self.stack_error(f))
    }

    /// Name of the calling module.
    pub fn module_name(&self) -> &str {
        self.module.name()
    }

    /// The calling module's code/data region.
    pub fn code(&self) -> &[u8] {
        self.module.code()
    }

    /// The calling module's code/data region, writable.
    pub fn code_mut(&mut self) -> &mut [u8] {
        self.module.code_mut()
    }

    /// `len` bytes of the code region starting at `addr`, or an
    /// out-of-bounds trap.
    pub fn slice(&self, addr: usize, len: usize) -> Result<&[u8], VmError> {
        let code_len = self.module.code_len();
        addr.checked_add(len)
            .and_then(|end| self.module.code().get(addr..end))
            .ok_or(VmError::AddressOutOfBounds {
                opcode: Opcode::ExternCall,
                address: addr,
                len: code_len,
                at: self.at,
            })
    }

    /// Writable `len` bytes of the code region starting at `addr`.
    pub fn slice_mut(&mut self, addr: usize, len: usize) -> Result<&mut [u8], VmError> {
        let code_len = self.module.code_len();
        let at = self.at;
        addr.checked_add(len)
            .and_then(|end| self.module.code_mut().get_mut(addr..end))
            .ok_or(VmError::AddressOutOfBounds {
                opcode: Opcode::ExternCall,
                address: addr,
                len: code_len,
                at,
            })
    }

    /// The NUL-terminated string at `addr`, without the NUL.
    pub fn cstr(&self, addr: usize) -> Result<&[u8], VmError> {
        self.module
            .read_cstr(addr)
            .ok_or(VmError::AddressOutOfBounds {
                opcode: Opcode::ExternCall,
                address: addr,
                len: self.module.code_len(),
                at: self.at,
            })
    }

    /// Offset of the `extern_call` that invoked this routine.
    pub fn at(&self) -> usize {
        self.at
    }

    /// A [`VmError::Host`] for `module` at the current call site.
    pub fn host_error(&self, module: &str, message: impl ToString) -> VmError {
        VmError::Host {
            module: module.to_string(),
            message: message.to_string(),
            at: self.at,
        }
    }

    fn stack_error(&self, fault: StackFault) -> VmError {
        VmError::from_stack_fault(StackKind::Operand, fault, self.at)
    }
}
