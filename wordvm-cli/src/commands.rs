//! CLI command implementations.
//!
//! Each command prints its own diagnostics and returns the process exit
//! code on failure.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use wordvm_cli::{write_pgm, ConsoleModule, DirectoryLoader, DisplayModule, MODULE_EXTENSION};
use wordvm_common::Module;
use wordvm_vm::{Machine, MachineConfig, VmError};

/// Export run once per frame in frame mode.
const FRAME_EXPORT: &str = "frame";

/// Options for [`run`], filled in from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub entry: String,
    pub module_paths: Vec<PathBuf>,
    pub frames: Option<u32>,
    pub dump_frame: Option<PathBuf>,
    pub config: MachineConfig,
}

/// Assemble a .wvs text file to a .wvm module.
pub fn assemble(input: &Path, output: Option<PathBuf>) -> Result<(), i32> {
    let output = output.unwrap_or_else(|| input.with_extension(MODULE_EXTENSION));

    let text = fs::read_to_string(input).map_err(|e| {
        eprintln!("error: cannot read '{}': {e}", input.display());
        1
    })?;

    let bytes = wordvm_assembler::assemble(&text).map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;

    fs::write(&output, &bytes).map_err(|e| {
        eprintln!("error: cannot write '{}': {e}", output.display());
        1
    })?;

    eprintln!("assembled {} bytes -> {}", bytes.len(), output.display());
    Ok(())
}

/// Disassemble a .wvm module to canonical text on stdout.
pub fn disassemble(input: &Path) -> Result<(), i32> {
    let module = read_module(input)?;
    print!("{}", wordvm_assembler::disassemble(&module));
    Ok(())
}

/// Print a module's name, exports and code size.
pub fn inspect(input: &Path) -> Result<(), i32> {
    let module = read_module(input)?;
    println!("module: {}", module.name());
    println!("exports: {}", module.export_count());
    for export in module.exports() {
        println!("  {} 0x{:04x}", export.name, export.offset);
    }
    println!(
        "code: {} bytes at offset {}",
        module.code_len(),
        module.code_start()
    );
    Ok(())
}

/// Load a module and execute it with the console and display attached.
pub fn run(opts: &RunOptions) -> Result<(), i32> {
    let bytes = fs::read(&opts.input).map_err(|e| {
        eprintln!("error: cannot read '{}': {e}", opts.input.display());
        1
    })?;

    let mut search_paths = opts.module_paths.clone();
    if let Some(dir) = opts.input.parent() {
        search_paths.push(if dir.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            dir.to_path_buf()
        });
    }

    let mut machine = Machine::with_config(DirectoryLoader::new(search_paths), opts.config);
    machine.add_system_module(ConsoleModule::new(io::stdout()));
    machine.add_system_module(DisplayModule::new());

    let id = machine.load_module_bytes(&bytes).map_err(report)?;
    let Some(module) = machine.module(id) else {
        eprintln!("error: module was not loaded");
        return Err(1);
    };
    info!(module = module.name(), "running");
    let has_entry = module.get_export(&opts.entry).is_some();

    // Run by id: the header name may collide with a system module.
    match opts.frames {
        None => machine.execute_module(id, &opts.entry).map_err(report)?,
        Some(frames) => {
            if has_entry {
                machine.execute_module(id, &opts.entry).map_err(report)?;
            }
            for frame in 0..frames {
                debug!(frame, "frame");
                machine.execute_module(id, FRAME_EXPORT).map_err(report)?;
            }
        }
    }
    debug!(stack = ?machine.stack().as_slice(), "finished");

    if let Some(path) = &opts.dump_frame {
        dump_frame(&machine, path)?;
    }
    Ok(())
}

fn dump_frame(machine: &Machine, path: &Path) -> Result<(), i32> {
    let frame = machine
        .system_module::<DisplayModule>()
        .zip(machine.current_module())
        .and_then(|(display, module)| display.frame(module.code()));
    let Some(frame) = frame else {
        eprintln!("error: display buffer does not fit in module memory");
        return Err(1);
    };

    let mut out = Vec::new();
    write_pgm(frame, &mut out)
        .and_then(|()| fs::write(path, &out))
        .map_err(|e| {
            eprintln!("error: cannot write '{}': {e}", path.display());
            1
        })
}

/// Print a VM error and pick its exit code.
fn report(e: VmError) -> i32 {
    match e {
        VmError::InvalidHeader(_) => {
            eprintln!("error: {e}");
            1
        }
        e if e.is_resolution() => {
            eprintln!("error: {e}");
            2
        }
        e => {
            eprintln!("runtime error: {e}");
            3
        }
    }
}

// --- Helpers ---

/// Read and parse a .wvm module file.
fn read_module(path: &Path) -> Result<Module, i32> {
    let bytes = fs::read(path).map_err(|e| {
        eprintln!("error: cannot read '{}': {e}", path.display());
        1
    })?;

    Module::parse(&bytes).map_err(|e| {
        eprintln!("error: {e}");
        1
    })
}
