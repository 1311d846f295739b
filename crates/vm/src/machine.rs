//! VM state: stacks, module tables, name resolution.

use std::any::Any;
use std::collections::HashMap;

use tracing::{debug, warn};
use wordvm_common::{Module, Opcode, Word};

use crate::error::{StackKind, VmError};
use crate::loader::{ModuleLoader, NoLoader};
use crate::module_id::ModuleId;
use crate::stack::Stack;
use crate::system::SystemModule;

/// Default operand stack capacity, in words.
pub const DEFAULT_STACK_CAPACITY: usize = 0x100;

/// Default return stack capacity, in words.
pub const DEFAULT_RETURN_STACK_CAPACITY: usize = 0x100;

/// Export run by [`Machine::execute_first_module`].
pub const ENTRY_EXPORT: &str = "entry";

/// Construction-time settings for a [`Machine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    /// Operand stack capacity, in words.
    pub stack_capacity: usize,
    /// Return stack capacity, in words.
    pub return_stack_capacity: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            stack_capacity: DEFAULT_STACK_CAPACITY,
            return_stack_capacity: DEFAULT_RETURN_STACK_CAPACITY,
        }
    }
}

/// The wordvm virtual machine.
///
/// Owns its bytecode modules and the system modules registered with it.
/// Both tables are append-only: ids handed out stay valid for the machine's
/// lifetime.
pub struct Machine {
    /// Operand stack.
    pub(crate) stack: Stack<Word>,
    /// Return addresses, and scratch values moved with `rpush`.
    pub(crate) return_stack: Stack<Word>,
    /// Offset of the next byte to fetch in the current module's code region.
    pub(crate) pc: usize,
    /// Offset of the opcode byte being executed, for error reporting.
    pub(crate) at: usize,
    /// Index of the executing module in `modules`.
    pub(crate) current: usize,
    pub(crate) modules: Vec<Module>,
    pub(crate) system_modules: Vec<Box<dyn SystemModule>>,
    /// Requested names the loader answered with a differently named module.
    aliases: HashMap<String, usize>,
    loader: Box<dyn ModuleLoader>,
    last_error: Option<VmError>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(NoLoader)
    }
}

impl Machine {
    /// Create a machine with the default configuration.
    pub fn new(loader: impl ModuleLoader + 'static) -> Self {
        Self::with_config(loader, MachineConfig::default())
    }

    /// Create a machine with explicit stack capacities.
    pub fn with_config(loader: impl ModuleLoader + 'static, config: MachineConfig) -> Self {
        Self {
            stack: Stack::new(config.stack_capacity),
            return_stack: Stack::new(config.return_stack_capacity),
            pc: 0,
            at: 0,
            current: 0,
            modules: Vec::new(),
            system_modules: Vec::new(),
            aliases: HashMap::new(),
            loader: Box::new(loader),
            last_error: None,
        }
    }

    /// Register a system module. Returns its id (reserved bit set).
    pub fn add_system_module(&mut self, module: impl SystemModule) -> ModuleId {
        let id = ModuleId::system(self.system_modules.len());
        debug!(name = module.name(), %id, "registered system module");
        self.system_modules.push(Box::new(module));
        id
    }

    /// Parse `bytes` and append the module to the table.
    pub fn load_module_bytes(&mut self, bytes: &[u8]) -> Result<ModuleId, VmError> {
        let module = Module::parse(bytes)?;
        let id = ModuleId::bytecode(self.modules.len());
        debug!(
            name = module.name(),
            %id,
            exports = module.export_count(),
            code_len = module.code_len(),
            "loaded module"
        );
        self.modules.push(module);
        Ok(id)
    }

    /// Resolve a name without loading anything.
    ///
    /// System modules are searched first, then bytecode modules by header
    /// name, then names a loader resolved to a differently named module.
    pub fn module_index_by_name(&self, name: &str) -> Option<ModuleId> {
        if let Some(i) = self.system_modules.iter().position(|m| m.name() == name) {
            return Some(ModuleId::system(i));
        }
        self.modules
            .iter()
            .position(|m| m.name() == name)
            .or_else(|| self.aliases.get(name).copied())
            .map(ModuleId::bytecode)
    }

    /// Resolve a name, asking the loader for bytes if it is not known yet.
    pub fn get_or_load_module(&mut self, name: &str) -> Result<ModuleId, VmError> {
        if let Some(id) = self.module_index_by_name(name) {
            return Ok(id);
        }

        let bytes = self
            .loader
            .get_module(name)
            .ok_or_else(|| VmError::ModuleNotFound {
                name: name.to_string(),
            })?;
        let id = self.load_module_bytes(&bytes)?;

        let loaded_name = self.modules[id.index()].name();
        if loaded_name != name {
            warn!(requested = name, loaded = loaded_name, "loader returned a module with a different name");
            self.aliases.insert(name.to_string(), id.index());
        }
        Ok(id)
    }

    /// Run `function_name` of module `module_name`, loading the module if
    /// needed. Returns when the function returns at top level.
    pub fn execute(&mut self, module_name: &str, function_name: &str) -> Result<(), VmError> {
        let result = self
            .get_or_load_module(module_name)
            .and_then(|id| self.execute_export(id, function_name));
        self.record(result)
    }

    /// Run `function_name` of an already loaded module, skipping name
    /// resolution.
    pub fn execute_module(&mut self, id: ModuleId, function_name: &str) -> Result<(), VmError> {
        let result = self.execute_export(id, function_name);
        self.record(result)
    }

    /// Run the `entry` export of the first loaded module.
    pub fn execute_first_module(&mut self) -> Result<(), VmError> {
        let result = if self.modules.is_empty() {
            Err(VmError::NoModuleLoaded)
        } else {
            self.execute_export(ModuleId::bytecode(0), ENTRY_EXPORT)
        };
        self.record(result)
    }

    fn execute_export(&mut self, id: ModuleId, function_name: &str) -> Result<(), VmError> {
        let entry_not_found = |module: &str| VmError::EntryNotFound {
            module: module.to_string(),
            entry: function_name.to_string(),
        };

        if id.is_system() {
            let name = self
                .system_modules
                .get(id.index())
                .map_or("", |m| m.name());
            return Err(entry_not_found(name));
        }

        let module = self
            .modules
            .get(id.index())
            .ok_or(VmError::InvalidModuleId {
                module_id: id.raw(),
                at: self.pc,
            })?;
        let offset = module
            .get_export(function_name)
            .ok_or_else(|| entry_not_found(module.name()))?
            .offset;

        debug!(module = module.name(), entry = function_name, offset, "execute");
        self.current = id.index();
        self.pc = offset as usize;
        self.at = self.pc;
        self.return_stack.clear();
        self.run()
    }

    fn record(&mut self, result: Result<(), VmError>) -> Result<(), VmError> {
        self.last_error = result.as_ref().err().cloned();
        if let Err(e) = &result {
            debug!(error = %e, "execution stopped");
        }
        result
    }

    /// The error that ended the most recent `execute`, if any.
    pub fn last_error(&self) -> Option<&VmError> {
        self.last_error.as_ref()
    }

    /// The operand stack.
    pub fn stack(&self) -> &Stack<Word> {
        &self.stack
    }

    /// The operand stack, for hosts passing arguments or reading results.
    pub fn stack_mut(&mut self) -> &mut Stack<Word> {
        &mut self.stack
    }

    /// The return stack.
    pub fn return_stack(&self) -> &Stack<Word> {
        &self.return_stack
    }

    /// Current program counter.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// The module executing (or last executed).
    pub fn current_module(&self) -> Option<&Module> {
        self.modules.get(self.current)
    }

    /// A loaded bytecode module. `None` for system ids.
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        if id.is_system() {
            return None;
        }
        self.modules.get(id.index())
    }

    /// All loaded bytecode modules, in load order.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// The first registered system module of type `T`.
    pub fn system_module<T: SystemModule>(&self) -> Option<&T> {
        self.system_modules.iter().find_map(|m| {
            let module: &dyn SystemModule = &**m;
            let any: &dyn Any = module;
            any.downcast_ref::<T>()
        })
    }

    /// The first registered system module of type `T`, writable.
    pub fn system_module_mut<T: SystemModule>(&mut self) -> Option<&mut T> {
        self.system_modules.iter_mut().find_map(|m| {
            let module: &mut dyn SystemModule = &mut **m;
            let any: &mut dyn Any = module;
            any.downcast_mut::<T>()
        })
    }

    // ---- Helpers for the execute loop ----

    pub(crate) fn push(&mut self, value: Word) -> Result<(), VmError> {
        let at = self.at;
        self.stack
            .push(value)
            .map_err(|f| VmError::from_stack_fault(StackKind::Operand, f, at))
    }

    pub(crate) fn pop(&mut self) -> Result<Word, VmError> {
        let at = self.at;
        self.stack
            .pop()
            .map_err(|f| VmError::from_stack_fault(StackKind::Operand, f, at))
    }

    pub(crate) fn peek_n(&self, n: usize) -> Result<Word, VmError> {
        self.stack
            .peek_n(n)
            .map_err(|f| VmError::from_stack_fault(StackKind::Operand, f, self.at))
    }

    pub(crate) fn rpush(&mut self, value: Word) -> Result<(), VmError> {
        let at = self.at;
        self.return_stack
            .push(value)
            .map_err(|f| VmError::from_stack_fault(StackKind::Return, f, at))
    }

    pub(crate) fn rpop(&mut self) -> Result<Word, VmError> {
        let at = self.at;
        self.return_stack
            .pop()
            .map_err(|f| VmError::from_stack_fault(StackKind::Return, f, at))
    }

    pub(crate) fn rpeek_n(&self, n: usize) -> Result<Word, VmError> {
        self.return_stack
            .peek_n(n)
            .map_err(|f| VmError::from_stack_fault(StackKind::Return, f, self.at))
    }

    /// The executing module. `current` is only ever set to a valid index.
    pub(crate) fn code_module(&self) -> &Module {
        &self.modules[self.current]
    }

    pub(crate) fn code_module_mut(&mut self) -> &mut Module {
        &mut self.modules[self.current]
    }

    /// Fetch one byte at the program counter and advance past it.
    pub(crate) fn fetch_byte(&mut self) -> Result<u8, VmError> {
        let byte = self
            .code_module()
            .read_byte(self.pc)
            .ok_or(VmError::EofWithoutReturn { at: self.pc })?;
        self.pc += 1;
        Ok(byte)
    }

    /// Fetch a little-endian 16-bit immediate and advance past it.
    pub(crate) fn fetch_immediate(&mut self) -> Result<u16, VmError> {
        let lo = self.fetch_byte()?;
        let hi = self.fetch_byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    pub(crate) fn out_of_bounds(&self, opcode: Opcode, address: usize) -> VmError {
        VmError::AddressOutOfBounds {
            opcode,
            address,
            len: self.code_module().code_len(),
            at: self.at,
        }
    }
}
