//! Host pieces of the `wordvm` tool: the system modules it registers and the
//! loader it resolves module names with.
//!
//! - [`console::ConsoleModule`], registered as `"system"`
//! - [`display::DisplayModule`], registered as `"display"`
//! - [`loader::DirectoryLoader`], `<dir>/<name>.wvm` lookup

pub mod console;
pub mod display;
pub mod loader;

pub use console::{ConsoleModule, CONSOLE_MODULE_NAME};
pub use display::{write_pgm, DisplayModule, DISPLAY_MODULE_NAME};
pub use loader::{DirectoryLoader, MODULE_EXTENSION};
