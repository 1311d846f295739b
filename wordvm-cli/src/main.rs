//! wordvm CLI — assemble, inspect, and run wordvm modules.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Input/decode/assembly error
//! - 2: Module or entry point not found
//! - 3: Runtime error

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wordvm_vm::{MachineConfig, DEFAULT_RETURN_STACK_CAPACITY, DEFAULT_STACK_CAPACITY, ENTRY_EXPORT};

use commands::RunOptions;

#[derive(Parser, Debug)]
#[command(name = "wordvm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Assemble, inspect and run wordvm bytecode modules")]
struct Cli {
    /// Log every executed instruction to stderr
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble a text file into a module binary
    Assemble {
        /// Assembly source (.wvs)
        input: PathBuf,
        /// Output path (defaults to the input with a .wvm extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a module binary as canonical assembly text
    Disassemble {
        /// Module binary (.wvm)
        input: PathBuf,
    },
    /// Show a module's name, exports and code size
    Inspect {
        /// Module binary (.wvm)
        input: PathBuf,
    },
    /// Execute a module
    Run {
        /// Module binary (.wvm)
        input: PathBuf,
        /// Export to execute
        #[arg(long, default_value = ENTRY_EXPORT)]
        entry: String,
        /// Extra directory searched for modules named by `load_module`
        #[arg(long = "module-path", value_name = "DIR")]
        module_paths: Vec<PathBuf>,
        /// Run `entry` (if exported) then the `frame` export N times
        #[arg(long, value_name = "N")]
        frames: Option<u32>,
        /// Write the display framebuffer to PATH as a PGM image afterwards
        #[arg(long, value_name = "PATH")]
        dump_frame: Option<PathBuf>,
        /// Operand stack capacity in words
        #[arg(long, default_value_t = DEFAULT_STACK_CAPACITY)]
        stack_size: usize,
        /// Return stack capacity in words
        #[arg(long, default_value_t = DEFAULT_RETURN_STACK_CAPACITY)]
        return_stack_size: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.trace);

    let result = match cli.command {
        Commands::Assemble { input, output } => commands::assemble(&input, output),
        Commands::Disassemble { input } => commands::disassemble(&input),
        Commands::Inspect { input } => commands::inspect(&input),
        Commands::Run {
            input,
            entry,
            module_paths,
            frames,
            dump_frame,
            stack_size,
            return_stack_size,
        } => commands::run(&RunOptions {
            input,
            entry,
            module_paths,
            frames,
            dump_frame,
            config: MachineConfig {
                stack_capacity: stack_size,
                return_stack_capacity: return_stack_size,
            },
        }),
    };

    if let Err(code) = result {
        process::exit(code);
    }
}

/// Logs go to stderr so they never mix with program output. `RUST_LOG`
/// controls the filter unless `--trace` is given.
fn init_tracing(trace: bool) {
    let filter = if trace {
        EnvFilter::new("warn,wordvm_vm=trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
