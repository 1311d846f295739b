//! The module-loader capability.
//!
//! The machine asks its loader for module bytes by name when a name does not
//! resolve in its own tables. Where the bytes come from is up to the host.

use std::collections::HashMap;

/// Supplies raw module bytes by name.
pub trait ModuleLoader {
    /// The bytes of module `name`, or `None` if the host cannot supply it.
    fn get_module(&mut self, name: &str) -> Option<Vec<u8>>;
}

/// A loader that never finds anything. Modules must be loaded directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLoader;

impl ModuleLoader for NoLoader {
    fn get_module(&mut self, _name: &str) -> Option<Vec<u8>> {
        None
    }
}

/// In-memory table of module bytes keyed by name.
impl ModuleLoader for HashMap<String, Vec<u8>> {
    fn get_module(&mut self, name: &str) -> Option<Vec<u8>> {
        self.get(name).cloned()
    }
}
