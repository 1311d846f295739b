//! Main execution loop and opcode dispatch for the wordvm machine.

use tracing::trace;
use wordvm_common::word::{from_bool, from_u16, to_address};
use wordvm_common::{Opcode, Word};

use crate::error::VmError;
use crate::machine::Machine;
use crate::module_id::ModuleId;
use crate::system::HostContext;

/// What the loop does after one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    /// `return` with an empty return stack.
    Finished,
}

impl Machine {
    /// Execute from the current program counter until a top-level return
    /// or an error.
    pub(crate) fn run(&mut self) -> Result<(), VmError> {
        while self.step()? == Flow::Continue {}
        Ok(())
    }

    /// Fetch, decode and execute one instruction.
    pub(crate) fn step(&mut self) -> Result<Flow, VmError> {
        self.at = self.pc;
        let byte = self.fetch_byte()?;
        let opcode = Opcode::try_from(byte).map_err(|_| VmError::UnknownOpcode {
            opcode: byte,
            at: self.at,
        })?;
        trace!(at = self.at, op = opcode.mnemonic(), depth = self.stack.len(), "step");

        match opcode {
            Opcode::Nop => {}

            // Arithmetic
            Opcode::Add => self.exec_binary(Word::wrapping_add)?,
            Opcode::Sub => self.exec_binary(Word::wrapping_sub)?,
            Opcode::Mul => self.exec_binary(Word::wrapping_mul)?,
            Opcode::Div => self.exec_division(Word::wrapping_div)?,
            Opcode::Mod => self.exec_division(Word::wrapping_rem)?,
            Opcode::Shl => self.exec_binary(shift_left)?,
            Opcode::Shr => self.exec_binary(shift_right)?,
            Opcode::Inc => {
                let v = self.pop()?;
                self.push(v.wrapping_add(1))?;
            }

            // Comparison
            Opcode::Gt => self.exec_comparison(|l, r| l > r)?,
            Opcode::Lt => self.exec_comparison(|l, r| l < r)?,
            Opcode::Ge => self.exec_comparison(|l, r| l >= r)?,
            Opcode::Le => self.exec_comparison(|l, r| l <= r)?,
            Opcode::Eq => self.exec_comparison(|l, r| l == r)?,
            Opcode::Neq => self.exec_comparison(|l, r| l != r)?,

            // Control flow
            Opcode::JumpImm => {
                let target = self.fetch_immediate()?;
                self.jump(target as usize);
            }
            Opcode::Jump => {
                let target = self.pop()?;
                self.jump(to_address(target));
            }
            Opcode::CallImm => {
                let target = self.fetch_immediate()?;
                self.call(target as usize)?;
            }
            Opcode::Call => {
                let target = self.pop()?;
                self.call(to_address(target))?;
            }
            Opcode::BTrueImm => {
                let target = self.fetch_immediate()?;
                let test = self.pop()?;
                if test != 0 {
                    self.jump(target as usize);
                }
            }
            Opcode::BFalseImm => {
                let target = self.fetch_immediate()?;
                let test = self.pop()?;
                if test == 0 {
                    self.jump(target as usize);
                }
            }
            Opcode::BTrue => {
                let target = self.pop()?;
                let test = self.pop()?;
                if test != 0 {
                    self.jump(to_address(target));
                }
            }
            Opcode::BFalse => {
                let target = self.pop()?;
                let test = self.pop()?;
                if test == 0 {
                    self.jump(to_address(target));
                }
            }
            Opcode::If => {
                let else_target = self.pop()?;
                let then_target = self.pop()?;
                let test = self.pop()?;
                let target = if test != 0 { then_target } else { else_target };
                self.jump(to_address(target));
            }
            Opcode::Return => {
                if self.return_stack.is_empty() {
                    trace!(at = self.at, "top-level return");
                    return Ok(Flow::Finished);
                }
                let caller = self.rpop()?;
                self.jump(to_address(caller));
            }

            // Modules
            Opcode::LoadModule => self.exec_load_module()?,
            Opcode::ExternCall => self.exec_extern_call()?,

            // Memory
            Opcode::LoadWord => {
                let addr = to_address(self.pop()?);
                let value = self
                    .code_module()
                    .read_word(addr)
                    .ok_or_else(|| self.out_of_bounds(opcode, addr))?;
                self.push(value)?;
            }
            Opcode::StoreWord => {
                let addr = to_address(self.pop()?);
                let value = self.pop()?;
                self.code_module_mut()
                    .write_word(addr, value)
                    .ok_or_else(|| self.out_of_bounds(opcode, addr))?;
            }
            Opcode::LoadByte => {
                let addr = to_address(self.pop()?);
                let value = self
                    .code_module()
                    .read_byte(addr)
                    .ok_or_else(|| self.out_of_bounds(opcode, addr))?;
                self.push(value as Word)?;
            }
            Opcode::StoreByte => {
                let addr = to_address(self.pop()?);
                let value = self.pop()?;
                self.code_module_mut()
                    .write_byte(addr, value as u8)
                    .ok_or_else(|| self.out_of_bounds(opcode, addr))?;
            }
            Opcode::PushImm => {
                let imm = self.fetch_immediate()?;
                self.push(from_u16(imm))?;
            }

            // Stack shuffles
            Opcode::Dup => {
                let a = self.peek_n(0)?;
                self.push(a)?;
            }
            Opcode::Swap => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push_all(&[b, a])?;
            }
            Opcode::Drop => {
                self.pop()?;
            }
            Opcode::Over => {
                let a = self.peek_n(1)?;
                self.push(a)?;
            }
            Opcode::Rot => {
                let c = self.pop()?;
                let b = self.pop()?;
                let a = self.pop()?;
                self.push_all(&[b, c, a])?;
            }
            Opcode::Dup2 => {
                let b = self.peek_n(0)?;
                let a = self.peek_n(1)?;
                self.push_all(&[a, b])?;
            }
            Opcode::Swap2 => {
                let d = self.pop()?;
                let c = self.pop()?;
                let b = self.pop()?;
                let a = self.pop()?;
                self.push_all(&[c, d, a, b])?;
            }
            Opcode::Over2 => {
                let b = self.peek_n(2)?;
                let a = self.peek_n(3)?;
                self.push_all(&[a, b])?;
            }
            Opcode::Drop2 => {
                self.pop()?;
                self.pop()?;
            }

            // Return stack
            Opcode::RPush => {
                let v = self.pop()?;
                self.rpush(v)?;
            }
            Opcode::RPop => {
                let v = self.rpop()?;
                self.push(v)?;
            }
            Opcode::RCopy => {
                let v = self.rpeek_n(0)?;
                self.push(v)?;
            }
            Opcode::RCopy2 => {
                let b = self.rpeek_n(0)?;
                let a = self.rpeek_n(1)?;
                self.push_all(&[a, b])?;
            }
        }

        Ok(Flow::Continue)
    }

    fn jump(&mut self, target: usize) {
        trace!(from = self.at, to = target, "jump");
        self.pc = target;
    }

    fn call(&mut self, target: usize) -> Result<(), VmError> {
        // A call ending the last addressable byte has nowhere to return to.
        let ret = u16::try_from(self.pc).map_err(|_| VmError::EofWithoutReturn { at: self.pc })?;
        self.rpush(from_u16(ret))?;
        self.jump(target);
        Ok(())
    }

    fn push_all(&mut self, values: &[Word]) -> Result<(), VmError> {
        for &v in values {
            self.push(v)?;
        }
        Ok(())
    }

    /// Pop right, pop left, push `op(left, right)`.
    fn exec_binary(&mut self, op: fn(Word, Word) -> Word) -> Result<(), VmError> {
        let r = self.pop()?;
        let l = self.pop()?;
        self.push(op(l, r))
    }

    /// Like `exec_binary`, trapping on a zero right operand.
    fn exec_division(&mut self, op: fn(Word, Word) -> Word) -> Result<(), VmError> {
        let r = self.pop()?;
        let l = self.pop()?;
        if r == 0 {
            return Err(VmError::DivisionByZero { at: self.at });
        }
        self.push(op(l, r))
    }

    fn exec_comparison(&mut self, op: fn(Word, Word) -> bool) -> Result<(), VmError> {
        let r = self.pop()?;
        let l = self.pop()?;
        self.push(from_bool(op(l, r)))
    }

    /// `( name_ptr -- module_id )`
    fn exec_load_module(&mut self) -> Result<(), VmError> {
        let addr = to_address(self.pop()?);
        let raw = self
            .code_module()
            .read_cstr(addr)
            .ok_or_else(|| self.out_of_bounds(Opcode::LoadModule, addr))?;
        let name = match std::str::from_utf8(raw) {
            Ok(name) => name.to_owned(),
            Err(_) => {
                return Err(VmError::ModuleNotFound {
                    name: String::from_utf8_lossy(raw).into_owned(),
                })
            }
        };

        let id = self.get_or_load_module(&name)?;
        trace!(name = %name, %id, "load_module");
        self.push(id.to_word())
    }

    /// `( module_id function_id -- ... )`
    fn exec_extern_call(&mut self) -> Result<(), VmError> {
        let function_id = self.pop()?;
        let module_id = ModuleId::from_word(self.pop()?);
        let at = self.at;

        if !module_id.is_system() {
            return Err(VmError::CrossModuleCall {
                module_id: module_id.to_word(),
                at,
            });
        }

        let Machine {
            stack,
            modules,
            system_modules,
            current,
            ..
        } = self;

        let system = system_modules
            .get_mut(module_id.index())
            .ok_or(VmError::InvalidModuleId {
                module_id: module_id.raw(),
                at,
            })?;
        trace!(module = system.name(), function_id, "extern_call");

        let mut ctx = HostContext {
            stack,
            module: &mut modules[*current],
            at,
        };
        system.invoke_index(&mut ctx, function_id)
    }
}

fn shift_left(l: Word, r: Word) -> Word {
    l.checked_shl(r as u16 as u32).unwrap_or(0)
}

/// Arithmetic shift; amounts of 16 or more leave only the sign.
fn shift_right(l: Word, r: Word) -> Word {
    l.checked_shr(r as u16 as u32)
        .unwrap_or(if l < 0 { -1 } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifts_saturate() {
        assert_eq!(shift_left(1, 3), 8);
        assert_eq!(shift_left(1, 16), 0);
        assert_eq!(shift_left(1, -1), 0);
        assert_eq!(shift_right(-16, 2), -4);
        assert_eq!(shift_right(-16, 40), -1);
        assert_eq!(shift_right(16, 40), 0);
    }

    #[test]
    fn step_on_empty_module_is_eof() {
        let mut machine = Machine::default();
        machine
            .load_module_bytes(&wordvm_common::encode_module("m", &[], &[]).unwrap())
            .unwrap();
        assert_eq!(machine.step(), Err(VmError::EofWithoutReturn { at: 0 }));
    }

    #[test]
    fn call_at_end_of_address_space_traps() {
        let mut code = vec![0; wordvm_common::MAX_CODE_LEN];
        let at = code.len() - 3;
        code[at..].copy_from_slice(&[Opcode::CallImm as u8, 0, 0]);
        let mut machine = Machine::default();
        machine
            .load_module_bytes(&wordvm_common::encode_module("m", &[], &code).unwrap())
            .unwrap();
        machine.pc = at;
        assert_eq!(
            machine.step(),
            Err(VmError::EofWithoutReturn {
                at: wordvm_common::MAX_CODE_LEN
            })
        );
        assert!(machine.return_stack.is_empty());
    }

    #[test]
    fn step_reports_flow() {
        let mut machine = Machine::default();
        machine
            .load_module_bytes(&wordvm_common::encode_module("m", &[], &[0, 8]).unwrap())
            .unwrap();
        assert_eq!(machine.step(), Ok(Flow::Continue));
        assert_eq!(machine.step(), Ok(Flow::Finished));
    }
}
