//! Loading modules from `.wvm` files on disk.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};
use wordvm_vm::ModuleLoader;

/// File extension of assembled modules.
pub const MODULE_EXTENSION: &str = "wvm";

/// Resolves module `name` to `<dir>/<name>.wvm`, trying each search
/// directory in order.
#[derive(Debug, Clone, Default)]
pub struct DirectoryLoader {
    search_paths: Vec<PathBuf>,
}

impl DirectoryLoader {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl ModuleLoader for DirectoryLoader {
    fn get_module(&mut self, name: &str) -> Option<Vec<u8>> {
        // Module names come from bytecode; never let one walk the filesystem.
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
            warn!(name, "refusing to load module with a path-like name");
            return None;
        }

        let file = format!("{name}.{MODULE_EXTENSION}");
        for dir in &self.search_paths {
            let path = dir.join(&file);
            match fs::read(&path) {
                Ok(bytes) => {
                    debug!(name, path = %path.display(), "loaded module file");
                    return Some(bytes);
                }
                Err(e) => debug!(name, path = %path.display(), error = %e, "not here"),
            }
        }
        None
    }
}
