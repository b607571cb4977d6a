//! Runtime faults.

use cvm_ir::{Address, Value, ValueKind};
use cvm_types::HostError;

/// Why execution stopped before the entry function returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VmError {
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("invalid memory address 0x{0:04x}")]
    InvalidAddress(Address),
    #[error("call stack overflow at depth {depth}")]
    StackOverflow { depth: usize },
    #[error("entry point '{0}' not found")]
    EntryNotFound(String),
    #[error("value {0} is not callable")]
    NotCallable(Value),
    #[error("operator '{op}' cannot combine {left:?} and {right:?}")]
    TypeMismatch {
        op: &'static str,
        left: ValueKind,
        right: ValueKind,
    },
    #[error("integer division by zero")]
    DivisionByZero,
    #[error("'{function}' ran past the end of its code")]
    MissingReturn { function: String },
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("step limit of {0} exceeded")]
    StepLimit(u64),
    #[error("the interpreter is not running; call reset first")]
    NotRunning,
}
