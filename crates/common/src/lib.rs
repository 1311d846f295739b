//! wordvm common types and encodings.
//!
//! This crate provides the foundational data structures shared by the VM,
//! the assembler and the CLI:
//!
//! - [`Word`] — the signed 16-bit machine word
//! - [`Opcode`] — the 45 opcodes and their byte values
//! - [`Instruction`] — one opcode plus optional 16-bit immediate
//! - [`Module`] — a parsed module: name, export table, code/data region
//! - [`HeaderError`], [`DecodeError`], [`EncodeError`]
//!
//! # Dependencies
//!
//! This crate uses `thiserror` and has no other dependencies.

pub mod error;
pub mod instruction;
pub mod module;
pub mod opcode;
pub mod word;

// Re-export commonly used types at the crate root.
pub use error::{DecodeError, EncodeError, HeaderError};
pub use instruction::Instruction;
pub use module::{encode_module, Export, Module, MAX_CODE_LEN};
pub use opcode::Opcode;
pub use word::{Word, FALSE_WORD, TRUE_WORD};
