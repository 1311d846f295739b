//! The module binary format.
//!
//! A module is a header followed by the code/data region. All integers are
//! little-endian, lengths are one-byte prefixes:
//! ```text
//! u8   module_name_len
//! u8[] module_name
//! u8   export_count
//! repeat export_count times:
//!    u8   export_name_len
//!    u8[] export_name
//!    u16  export_code_offset     (relative to the code region)
//! <rest>                         code/data region
//! ```
//!
//! A parsed [`Module`] owns a copy of the whole input. Names are kept as
//! spans into that buffer and only turned into `&str` when asked for. The
//! buffer's length never changes after parsing, so spans stay valid for
//! the module's whole lifetime.

use crate::error::{EncodeError, HeaderError};
use crate::word::Word;

/// Largest code/data region: every offset must fit a 16-bit address.
pub const MAX_CODE_LEN: usize = 0x1_0000;

/// A `(start, len)` range into a module's owned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    len: usize,
}

impl Span {
    fn range(self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ExportRecord {
    name: Span,
    offset: u16,
}

/// A named entry point, borrowed from its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Export<'m> {
    /// Export name.
    pub name: &'m str,
    /// Offset of the entry point, relative to the code region.
    pub offset: u16,
}

/// A parsed bytecode module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    bytes: Vec<u8>,
    name: Span,
    exports: Vec<ExportRecord>,
    code_start: usize,
}

/// Bounds-checked reader over the raw header bytes.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn u8(&mut self, field: &'static str) -> Result<u8, HeaderError> {
        let b = *self.bytes.get(self.pos).ok_or(HeaderError::Truncated {
            field,
            offset: self.pos,
        })?;
        self.pos += 1;
        Ok(b)
    }

    fn u16(&mut self, field: &'static str) -> Result<u16, HeaderError> {
        let lo = self.u8(field)?;
        let hi = self.u8(field)?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// A length-prefixed name. Returns its span.
    fn name(&mut self, field: &'static str) -> Result<Span, HeaderError> {
        let len = self.u8(field)? as usize;
        let start = self.pos;
        let raw = self
            .bytes
            .get(start..start + len)
            .ok_or(HeaderError::Truncated {
                field,
                offset: start,
            })?;
        if std::str::from_utf8(raw).is_err() {
            return Err(HeaderError::InvalidName {
                field,
                offset: start,
            });
        }
        self.pos += len;
        Ok(Span { start, len })
    }
}

impl Module {
    /// Parse a module from raw bytes. The input is copied.
    pub fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        let mut cursor = Cursor { bytes, pos: 0 };

        let name = cursor.name("module name")?;
        let export_count = cursor.u8("export count")?;

        let mut exports = Vec::with_capacity(export_count as usize);
        for _ in 0..export_count {
            let name = cursor.name("export name")?;
            let offset = cursor.u16("export offset")?;
            exports.push(ExportRecord { name, offset });
        }

        let code_len = bytes.len() - cursor.pos;
        if code_len > MAX_CODE_LEN {
            return Err(HeaderError::CodeTooLarge { len: code_len });
        }

        Ok(Self {
            bytes: bytes.to_vec(),
            name,
            exports,
            code_start: cursor.pos,
        })
    }

    fn text(&self, span: Span) -> &str {
        // Validated as UTF-8 during parse.
        std::str::from_utf8(&self.bytes[span.range()]).unwrap_or_default()
    }

    /// The module's name.
    pub fn name(&self) -> &str {
        self.text(self.name)
    }

    /// Number of exports.
    pub fn export_count(&self) -> usize {
        self.exports.len()
    }

    /// The export at position `n` in the header.
    pub fn nth_export(&self, n: usize) -> Option<Export<'_>> {
        self.exports.get(n).map(|e| Export {
            name: self.text(e.name),
            offset: e.offset,
        })
    }

    /// The first export named `name`.
    pub fn get_export(&self, name: &str) -> Option<Export<'_>> {
        self.exports().find(|e| e.name == name)
    }

    /// All exports, in header order.
    pub fn exports(&self) -> impl Iterator<Item = Export<'_>> + '_ {
        (0..self.exports.len()).filter_map(move |n| self.nth_export(n))
    }

    /// Byte offset where the header ends and the code region begins.
    pub fn code_start(&self) -> usize {
        self.code_start
    }

    /// The whole module as loaded, header included.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The code/data region.
    pub fn code(&self) -> &[u8] {
        &self.bytes[self.code_start..]
    }

    /// The code/data region, writable. Its length cannot change.
    pub fn code_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[self.code_start..]
    }

    /// Length of the code/data region.
    pub fn code_len(&self) -> usize {
        self.bytes.len() - self.code_start
    }

    /// Byte at `addr` in the code region.
    pub fn read_byte(&self, addr: usize) -> Option<u8> {
        self.code().get(addr).copied()
    }

    /// Little-endian word at `addr` in the code region.
    pub fn read_word(&self, addr: usize) -> Option<Word> {
        match self.code().get(addr..addr.checked_add(2)?) {
            Some(&[lo, hi]) => Some(Word::from_le_bytes([lo, hi])),
            _ => None,
        }
    }

    /// Store a byte. Returns `None` if `addr` is outside the code region.
    pub fn write_byte(&mut self, addr: usize, value: u8) -> Option<()> {
        let slot = self.code_mut().get_mut(addr)?;
        *slot = value;
        Some(())
    }

    /// Store a little-endian word. Returns `None` if either byte is out of range.
    pub fn write_word(&mut self, addr: usize, value: Word) -> Option<()> {
        let end = addr.checked_add(2)?;
        let slot = self.code_mut().get_mut(addr..end)?;
        slot.copy_from_slice(&value.to_le_bytes());
        Some(())
    }

    /// Bytes of the NUL-terminated string starting at `addr`, without the NUL.
    ///
    /// Returns `None` if `addr` is out of range or no NUL follows it.
    pub fn read_cstr(&self, addr: usize) -> Option<&[u8]> {
        let tail = self.code().get(addr..)?;
        let end = tail.iter().position(|&b| b == 0)?;
        Some(&tail[..end])
    }
}

/// Encode a module: header for `name` and `exports`, followed by `code`.
pub fn encode_module(
    name: &str,
    exports: &[(&str, u16)],
    code: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    if exports.len() > u8::MAX as usize {
        return Err(EncodeError::TooManyExports {
            count: exports.len(),
        });
    }

    if code.len() > MAX_CODE_LEN {
        return Err(EncodeError::CodeTooLarge { len: code.len() });
    }

    let mut out = Vec::new();
    push_name(&mut out, name)?;
    out.push(exports.len() as u8);
    for &(export_name, offset) in exports {
        push_name(&mut out, export_name)?;
        out.extend_from_slice(&offset.to_le_bytes());
    }
    out.extend_from_slice(code);
    Ok(out)
}

fn push_name(out: &mut Vec<u8>, name: &str) -> Result<(), EncodeError> {
    let len = name.len();
    if len > u8::MAX as usize {
        return Err(EncodeError::NameTooLong {
            name: name.to_string(),
            len,
        });
    }
    out.push(len as u8);
    out.extend_from_slice(name.as_bytes());
    Ok(())
}
