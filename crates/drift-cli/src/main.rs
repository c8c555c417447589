//! Drift - CLI
//!
//! Command-line interface to run, inspect and generate Drift images.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::{fmt, EnvFilter};

use drift_core::vm::OutputSink;
use drift_core::{
    CodeUnit, CodeUnitBuilder, DriftResult, ImageLoader, ImageWriter, OpCode, Value,
    VirtualMachine, VmConfig,
};
use drift_trace::{disassemble, TextTracer};

#[derive(Parser, Debug)]
#[command(name = "drift")]
#[command(about = "Run and inspect Drift bytecode images")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute an image and print its return value
    Run {
        /// Path to the image file
        path: PathBuf,

        /// Print an execution trace after the run
        #[arg(long)]
        trace: bool,

        /// Skip operand alignment and index checks when loading
        #[arg(long)]
        unchecked: bool,

        /// Maximum nested call frames
        #[arg(long)]
        max_call_depth: Option<usize>,

        /// Maximum values on one evaluation stack
        #[arg(long)]
        max_stack_size: Option<usize>,
    },

    /// Print the disassembly of an image
    Dis {
        /// Path to the image file
        path: PathBuf,
    },

    /// Write a sample image
    Demo {
        /// Where to write the image
        path: PathBuf,
    },
}

/// Initialize logging; `RUST_LOG` overrides the default filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let args = Args::parse();

    let result = match args.command {
        Command::Run {
            path,
            trace,
            unchecked,
            max_call_depth,
            max_stack_size,
        } => {
            let mut config = VmConfig::default();
            if let Some(depth) = max_call_depth {
                config.max_call_depth = depth;
            }
            if let Some(size) = max_stack_size {
                config.max_stack_size = size;
            }
            run(&path, config, trace, unchecked)
        }
        Command::Dis { path } => read_image(&path, true).and_then(|unit| print_out(&disassemble(&unit))),
        Command::Demo { path } => write_demo(&path),
    };

    if let Err(message) = result {
        error!("{}", message);
        eprintln!("Error: {}", message);
        process::exit(1);
    }
}

fn load(path: &Path, checked: bool) -> DriftResult<CodeUnit> {
    let bytes = fs::read(path)?;
    if checked {
        ImageLoader::load(&bytes)
    } else {
        ImageLoader::load_unchecked(&bytes)
    }
}

fn read_image(path: &Path, checked: bool) -> Result<CodeUnit, String> {
    load(path, checked).map_err(|e| format!("cannot load {}: {}", path.display(), e))
}

fn run(path: &Path, config: VmConfig, trace: bool, unchecked: bool) -> Result<(), String> {
    let unit = read_image(path, !unchecked)?;
    debug!(path = %path.display(), ?config, "running image");

    let mut vm = VirtualMachine::new(config).with_output(OutputSink::Stdout);
    let log = if trace {
        let tracer = TextTracer::new();
        let log = tracer.log();
        vm = vm.with_observer(Box::new(tracer));
        Some(log)
    } else {
        None
    };

    let result = vm.run(unit);

    if let Some(log) = log {
        eprint!("{}", log.text());
    }

    let value = result.map_err(|fault| format!("runtime fault: {}", fault))?;
    print_out(&format!("=> {}\n", value))
}

/// Write to stdout, turning a closed pipe into an ordinary error
fn print_out(text: &str) -> Result<(), String> {
    let mut out = io::stdout().lock();
    out.write_all(text.as_bytes())
        .and_then(|()| out.flush())
        .map_err(|e| format!("cannot write output: {}", e))
}

/// The arithmetic sample: prints 100 and 800, returns none
fn demo_unit() -> CodeUnit {
    CodeUnitBuilder::new()
        .load_const(34.0)
        .load_const(66.0)
        .emit(OpCode::Add)
        .emit(OpCode::Output)
        .load_const(8.0)
        .emit(OpCode::Mul)
        .emit(OpCode::Output)
        .load_const(Value::None)
        .emit(OpCode::Return)
        .build()
}

fn save_demo(path: &Path) -> DriftResult<()> {
    let bytes = ImageWriter::encode(&demo_unit())?;
    fs::write(path, bytes)?;
    Ok(())
}

fn write_demo(path: &Path) -> Result<(), String> {
    save_demo(path).map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
    print_out(&format!("wrote sample image to {}\n", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::DriftError;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("drift-cli-{}-{}", process::id(), name))
    }

    #[test]
    fn demo_image_loads_and_runs() {
        let path = scratch("demo.drft");
        save_demo(&path).expect("demo write failed");
        let unit = load(&path, true).expect("demo load failed");
        let _ = fs::remove_file(&path);

        let mut vm = VirtualMachine::new(VmConfig::default()).with_output(OutputSink::buffer());
        assert_eq!(vm.run(unit), Ok(Value::None));
        assert_eq!(vm.output().lines(), &["100".to_string(), "800".to_string()]);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = scratch("missing.drft");
        assert!(matches!(load(&path, true), Err(DriftError::Io(_))));
    }

    #[test]
    fn demo_into_missing_directory_is_an_io_error() {
        let path = scratch("no-such-dir").join("demo.drft");
        assert!(matches!(save_demo(&path), Err(DriftError::Io(_))));
    }
}
