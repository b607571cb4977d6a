//! The cvm bytecode.
//!
//! A stack machine instruction set. Operands come from the operand stack;
//! the only immediate arguments are constants, slots, addresses, strides and
//! jump targets. Binary operators pop the right operand first and require
//! both operands to share a `Value` variant; the compiler inserts `Convert`
//! to guarantee it.

use std::fmt;

use cvm_ir::{Address, Value, ValueKind};

#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    LoadConstant(Value),
    /// Push the cell at `frame + slot`.
    LoadLocal(u32),
    /// Pop into the cell at `frame + slot`.
    StoreLocal(u32),
    /// Push a pointer to `frame + slot`.
    LoadLocalAddress(u32),
    LoadGlobal(Address),
    StoreGlobal(Address),
    LoadGlobalAddress(Address),
    /// Pop a pointer, push the cell it addresses.
    LoadPointer,
    /// Pop a pointer, then a value; store the value and push it back.
    StorePointer,
    /// Pop a pointer, push it advanced by a fixed number of cells.
    OffsetPointer(u32),
    /// Pop an integer then a pointer; push `pointer + integer * stride`.
    AddPointer(u32),
    /// Pop an integer then a pointer; push `pointer - integer * stride`.
    SubPointer(u32),
    Dup,
    Pop,
    Convert(ValueKind),

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    Neg,
    BitNot,
    LogicalNot,

    Jump(usize),
    /// Pop a value; jump when it is zero.
    BranchIfFalse(usize),
    /// Pop the callee (a function address), the receiver for instance
    /// methods, then `argc` arguments.
    Call(u32),
    Return,
}

impl Instruction {
    pub fn is_call(&self) -> bool {
        matches!(self, Instruction::Call(_))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::LoadConstant(v) => write!(f, "LoadConstant {v}"),
            Instruction::LoadLocal(s) => write!(f, "LoadLocal {s}"),
            Instruction::StoreLocal(s) => write!(f, "StoreLocal {s}"),
            Instruction::LoadLocalAddress(s) => write!(f, "LoadLocalAddress {s}"),
            Instruction::LoadGlobal(a) => write!(f, "LoadGlobal {a}"),
            Instruction::StoreGlobal(a) => write!(f, "StoreGlobal {a}"),
            Instruction::LoadGlobalAddress(a) => write!(f, "LoadGlobalAddress {a}"),
            Instruction::OffsetPointer(n) => write!(f, "OffsetPointer {n}"),
            Instruction::AddPointer(n) => write!(f, "AddPointer {n}"),
            Instruction::SubPointer(n) => write!(f, "SubPointer {n}"),
            Instruction::Convert(kind) => write!(f, "Convert {kind:?}"),
            Instruction::Jump(t) => write!(f, "Jump {t}"),
            Instruction::BranchIfFalse(t) => write!(f, "BranchIfFalse {t}"),
            Instruction::Call(n) => write!(f, "Call {n}"),
            other => write!(f, "{other:?}"),
        }
    }
}
