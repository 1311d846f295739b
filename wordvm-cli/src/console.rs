//! The `system` console module: printing for bytecode programs.

use std::io::Write;

use tracing::warn;
use wordvm_common::word::to_address;
use wordvm_common::Word;
use wordvm_vm::{HostContext, SystemModule, VmError};

/// Name bytecode passes to `load_module` to reach the console.
pub const CONSOLE_MODULE_NAME: &str = "system";

/// Function ids understood by [`ConsoleModule`].
pub mod function {
    /// `( n -- )` print a signed word and a newline.
    pub const PRINT: i16 = 0;
    /// `( c -- )` write the low byte of a word.
    pub const EMIT: i16 = 1;
    /// `( addr -- )` write the NUL-terminated string at `addr`.
    pub const PRINT_STR: i16 = 2;
}

/// Console output over any writer.
///
/// The CLI uses stdout; tests use a `Vec<u8>` and read it back with
/// [`ConsoleModule::output`].
pub struct ConsoleModule<W> {
    out: W,
}

impl<W: Write> ConsoleModule<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// The underlying writer.
    pub fn output(&self) -> &W {
        &self.out
    }
}

impl<W: Write + 'static> SystemModule for ConsoleModule<W> {
    fn name(&self) -> &str {
        CONSOLE_MODULE_NAME
    }

    fn invoke_index(&mut self, ctx: &mut HostContext<'_>, function_id: Word) -> Result<(), VmError> {
        let written = match function_id {
            function::PRINT => {
                let n = ctx.pop()?;
                writeln!(self.out, "{n}")
            }
            function::EMIT => {
                let c = ctx.pop()?;
                self.out.write_all(&[c as u8])
            }
            function::PRINT_STR => {
                let addr = to_address(ctx.pop()?);
                let s = ctx.cstr(addr)?;
                self.out.write_all(s)
            }
            other => {
                warn!(module = CONSOLE_MODULE_NAME, function_id = other, "unknown function");
                return Ok(());
            }
        };
        written
            .and_then(|()| self.out.flush())
            .map_err(|e| ctx.host_error(CONSOLE_MODULE_NAME, e))
    }
}
