//! cvm VM - executes compiled cvm programs.
//!
//! The [`Interpreter`] runs an [`Executable`](cvm_codegen::Executable) on an
//! operand stack and a flat memory of [`Value`](cvm_ir::Value) cells:
//!
//! ```text
//! [0: null][globals ...][frame stack ...]
//! ```
//!
//! Every frame occupies a contiguous run of cells laid out as
//! `[this?][parameters][locals]`; locals are addressed relative to the frame
//! base, so taking the address of a local yields an ordinary pointer.
//!
//! Intrinsics run synchronously against the [`Host`](cvm_types::Host)
//! interface and hand results back by pushing onto the operand stack.

mod errors;
mod interpreter;
mod operators;

pub use errors::VmError;
pub use interpreter::{Interpreter, InterpreterConfig, Status};
