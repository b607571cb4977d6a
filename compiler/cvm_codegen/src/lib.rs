//! Type checking, overload resolution and bytecode emission for cvm.
//!
//! [`compile`] turns a [`TranslationUnit`](cvm_ir::TranslationUnit) into an
//! [`Executable`] for a given [`MachineInfo`](cvm_types::MachineInfo). All
//! problems are collected in a [`Report`](cvm_diagnostic::Report); a unit
//! with errors produces [`CompileError::Diagnostics`] instead of code.
//!
//! # Calls
//!
//! Call emission is the heart of the crate. For `f(a, b)` the callee is
//! resolved to an [`Overload`] by [`resolve_overload`], candidates are ranked
//! with [`pick_overload`], and the call leaves the stack as:
//!
//! ```text
//! a b [defaults...] [receiver] callee  Call(n)  [LoadConstant 0 if void]
//! ```
//!
//! Every call expression leaves exactly one value on the stack, including
//! calls to `void` functions, so that expression statements can always pop.

mod compile;
mod context;
mod executable;
mod expr;
mod instruction;
mod stmt;

pub use compile::{compile, CompileError};
pub use context::{
    pick_overload, EmitContext, FunctionSymbol, GlobalSymbol, MethodKey, Symbol, SymbolTable,
};
pub use executable::{CompiledFunction, Executable, Function, FunctionBody, INIT_FUNCTION};
pub use expr::{
    constant_type, emit, emit_pointer, evaluated_type, integer_literal_type, resolve_overload,
    Overload, OverloadEmit, Receiver,
};
pub use instruction::Instruction;
pub use stmt::{emit_block, emit_implicit_return, emit_stmt};
