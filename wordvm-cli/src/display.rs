//! The `display` module: a 256×64 framebuffer living in module memory.
//!
//! The program picks where the framebuffer lives with `set_display_buf`
//! and draws into it with `blit` or plain stores. One byte per pixel; only
//! the low four bits are shown. There is no window: the CLI can dump the
//! framebuffer as a PGM image after running.

use std::collections::HashSet;
use std::io::{self, Write};

use tracing::{trace, warn};
use wordvm_common::word::{from_bool, to_address};
use wordvm_common::Word;
use wordvm_vm::{HostContext, SystemModule, VmError};

/// Name bytecode passes to `load_module` to reach the display.
pub const DISPLAY_MODULE_NAME: &str = "display";

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 64;
pub const FRAMEBUFFER_LEN: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

/// Function ids understood by [`DisplayModule`].
pub mod function {
    /// `( addr -- )` place the framebuffer at `addr`.
    pub const SET_DISPLAY_BUF: i16 = 0;
    /// `( key -- flag )`
    pub const IS_KEY_DOWN: i16 = 1;
    /// `( x y sprite -- )` copy a `w, h, pixels...` sprite to (x, y).
    pub const BLIT: i16 = 2;
}

/// Headless display. Keys are whatever the host says is held down.
#[derive(Debug, Default)]
pub struct DisplayModule {
    buffer_addr: usize,
    keys_down: HashSet<Word>,
}

impl DisplayModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Code-region offset of the framebuffer.
    pub fn buffer_addr(&self) -> usize {
        self.buffer_addr
    }

    /// Mark `key` held (or released) for `is_key_down`.
    pub fn set_key_down(&mut self, key: Word, down: bool) {
        if down {
            self.keys_down.insert(key);
        } else {
            self.keys_down.remove(&key);
        }
    }

    /// The framebuffer bytes inside `code`, or `None` if it does not fit.
    pub fn frame<'c>(&self, code: &'c [u8]) -> Option<&'c [u8]> {
        code.get(self.buffer_addr..self.buffer_addr.checked_add(FRAMEBUFFER_LEN)?)
    }

    fn blit(&self, ctx: &mut HostContext<'_>) -> Result<(), VmError> {
        let sprite = to_address(ctx.pop()?);
        let y = to_address(ctx.pop()?);
        let x = to_address(ctx.pop()?);

        let size = ctx.slice(sprite, 2)?;
        let (w, h) = (size[0] as usize, size[1] as usize);
        let pixels = ctx.slice(sprite + 2, w * h)?.to_vec();
        trace!(x, y, sprite, w, h, "blit");

        // Rows land at increasing offsets; if the last fits, all do.
        if h > 0 {
            let last_row = self.buffer_addr + (y + h - 1) * SCREEN_WIDTH + x;
            ctx.slice(last_row, w)?;
        }

        for (row, src) in pixels.chunks(w.max(1)).enumerate().take(h) {
            let dest = self.buffer_addr + (y + row) * SCREEN_WIDTH + x;
            ctx.slice_mut(dest, src.len())?.copy_from_slice(src);
        }
        Ok(())
    }
}

impl SystemModule for DisplayModule {
    fn name(&self) -> &str {
        DISPLAY_MODULE_NAME
    }

    fn invoke_index(&mut self, ctx: &mut HostContext<'_>, function_id: Word) -> Result<(), VmError> {
        match function_id {
            function::SET_DISPLAY_BUF => {
                self.buffer_addr = to_address(ctx.pop()?);
                Ok(())
            }
            function::IS_KEY_DOWN => {
                let key = ctx.pop()?;
                ctx.push(from_bool(self.keys_down.contains(&key)))
            }
            function::BLIT => self.blit(ctx),
            other => {
                warn!(module = DISPLAY_MODULE_NAME, function_id = other, "unknown function");
                Ok(())
            }
        }
    }
}

/// Write `frame` as a binary PGM with 16 grey levels.
pub fn write_pgm(frame: &[u8], out: &mut impl Write) -> io::Result<()> {
    write!(out, "P5\n{SCREEN_WIDTH} {SCREEN_HEIGHT}\n15\n")?;
    let pixels: Vec<u8> = frame.iter().map(|p| p & 0x0F).collect();
    out.write_all(&pixels)
}
