//! cvmc - compile restricted C translation units and run them.
//!
//! This crate ties the workspace together:
//!
//! - [`compile`] checks a [`TranslationUnit`] against a [`MachineInfo`] and
//!   produces an [`Executable`]
//! - [`create_interpreter`] compiles and wraps the result in an
//!   [`Interpreter`]
//! - [`run`] does both and executes an entry function to completion
//!
//! Logging goes through `tracing`; call [`init_tracing`] once to print it
//! when `RUST_LOG` is set.

use std::sync::Once;

pub mod testing;

pub use cvm_codegen::{CompileError, Executable, INIT_FUNCTION};
pub use cvm_diagnostic::{Diagnostic, ErrorCode, ReportConfig};
pub use cvm_ir::{TranslationUnit, Value};
pub use cvm_types::{Host, HostError, MachineInfo};
pub use cvm_vm::{Interpreter, InterpreterConfig, VmError};

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset, and nothing after the first call.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

/// Compilation or execution failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Vm(#[from] VmError),
}

/// Compile `unit` for `machine`, collecting every diagnostic.
pub fn compile(unit: &TranslationUnit, machine: &MachineInfo) -> Result<Executable, CompileError> {
    cvm_codegen::compile(unit, machine, ReportConfig::default())
}

/// Compile `unit` and load it into a fresh interpreter.
pub fn create_interpreter(
    unit: &TranslationUnit,
    machine: &MachineInfo,
) -> Result<Interpreter, CompileError> {
    let executable = compile(unit, machine)?;
    if tracing::enabled!(tracing::Level::TRACE) {
        tracing::trace!(listing = %executable.disassemble(), "compiled");
    }
    Ok(Interpreter::new(executable, InterpreterConfig::default()))
}

/// Compile `unit`, then run `entry` to completion and return its result.
pub fn run(
    unit: &TranslationUnit,
    machine: &MachineInfo,
    entry: &str,
) -> Result<Option<Value>, Error> {
    let mut interpreter = create_interpreter(unit, machine)?;
    interpreter.reset(entry)?;
    Ok(interpreter.run()?)
}
