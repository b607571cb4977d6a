//! Operator semantics on [`Value`] cells.
//!
//! The compiler converts both operands of a binary operator to one
//! representation before the operator runs, so every function here expects
//! matching kinds and reports [`VmError::TypeMismatch`] otherwise.
//! Integer arithmetic wraps at the width of the representation.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    reason = "values wrap at their own width"
)]

use cvm_ir::{Address, Value, ValueKind};

use crate::VmError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Arith {
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
}

impl Arith {
    fn as_symbol(self) -> &'static str {
        match self {
            Arith::Add => "+",
            Arith::Sub => "-",
            Arith::Mul => "*",
            Arith::Div => "/",
            Arith::Mod => "%",
            Arith::BitAnd => "&",
            Arith::BitOr => "|",
            Arith::BitXor => "^",
            Arith::Shl => "<<",
            Arith::Shr => ">>",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Compare {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Compare {
    fn holds(self, ordering: Option<std::cmp::Ordering>) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match (self, ordering) {
            (Compare::Ne, None) => true,
            (_, None) => false,
            (Compare::Eq, Some(o)) => o == Equal,
            (Compare::Ne, Some(o)) => o != Equal,
            (Compare::Lt, Some(o)) => o == Less,
            (Compare::Le, Some(o)) => o != Greater,
            (Compare::Gt, Some(o)) => o == Greater,
            (Compare::Ge, Some(o)) => o != Less,
        }
    }

    fn as_symbol(self) -> &'static str {
        match self {
            Compare::Eq => "==",
            Compare::Ne => "!=",
            Compare::Lt => "<",
            Compare::Le => "<=",
            Compare::Gt => ">",
            Compare::Ge => ">=",
        }
    }
}

fn mismatch(op: &'static str, left: Value, right: Value) -> VmError {
    VmError::TypeMismatch {
        op,
        left: left.kind(),
        right: right.kind(),
    }
}

fn width_bits(kind: ValueKind) -> u32 {
    match kind {
        ValueKind::Int8 | ValueKind::UInt8 => 8,
        ValueKind::Int16 | ValueKind::UInt16 => 16,
        ValueKind::Int32 | ValueKind::UInt32 | ValueKind::Float32 | ValueKind::Pointer => 32,
        ValueKind::Int64 | ValueKind::UInt64 | ValueKind::Float64 => 64,
    }
}

pub(crate) fn arithmetic(op: Arith, left: Value, right: Value) -> Result<Value, VmError> {
    if left.kind() != right.kind() {
        return Err(mismatch(op.as_symbol(), left, right));
    }
    match (left, right) {
        (Value::Float32(a), Value::Float32(b)) => float_arith(op, f64::from(a), f64::from(b))
            .map(|v| Value::Float32(v as f32))
            .ok_or_else(|| mismatch(op.as_symbol(), left, right)),
        (Value::Float64(a), Value::Float64(b)) => float_arith(op, a, b)
            .map(Value::Float64)
            .ok_or_else(|| mismatch(op.as_symbol(), left, right)),
        _ => integer_arith(op, left, right),
    }
}

fn float_arith(op: Arith, a: f64, b: f64) -> Option<f64> {
    match op {
        Arith::Add => Some(a + b),
        Arith::Sub => Some(a - b),
        Arith::Mul => Some(a * b),
        Arith::Div => Some(a / b),
        _ => None,
    }
}

fn integer_arith(op: Arith, left: Value, right: Value) -> Result<Value, VmError> {
    let kind = left.kind();
    let signed = kind.is_signed();
    let (a, b) = (left.to_bits(), right.to_bits());
    let raw = match op {
        Arith::Add => a.wrapping_add(b),
        Arith::Sub => a.wrapping_sub(b),
        Arith::Mul => a.wrapping_mul(b),
        Arith::Div | Arith::Mod => {
            if b == 0 {
                return Err(VmError::DivisionByZero);
            }
            if signed {
                let (a, b) = (left.as_i64(), right.as_i64());
                let v = if op == Arith::Div {
                    a.wrapping_div(b)
                } else {
                    a.wrapping_rem(b)
                };
                v as u64
            } else if op == Arith::Div {
                left.as_u64() / right.as_u64()
            } else {
                left.as_u64() % right.as_u64()
            }
        }
        Arith::BitAnd => a & b,
        Arith::BitOr => a | b,
        Arith::BitXor => a ^ b,
        Arith::Shl | Arith::Shr => {
            // Shift counts wrap at the operand width.
            let count = (right.as_u64() % u64::from(width_bits(kind))) as u32;
            match (op, signed) {
                (Arith::Shl, _) => a.wrapping_shl(count),
                (_, true) => left.as_i64().wrapping_shr(count) as u64,
                (_, false) => left.as_u64().wrapping_shr(count),
            }
        }
    };
    Ok(Value::from_bits(kind, raw))
}

/// Compare two values, producing 1 or 0 in the `result` representation.
pub(crate) fn compare(
    op: Compare,
    left: Value,
    right: Value,
    result: ValueKind,
) -> Result<Value, VmError> {
    let kind = left.kind();
    if kind != right.kind() {
        return Err(mismatch(op.as_symbol(), left, right));
    }
    let ordering = if kind.is_float() {
        left.as_f64().partial_cmp(&right.as_f64())
    } else if kind.is_signed() {
        Some(left.as_i64().cmp(&right.as_i64()))
    } else {
        Some(left.as_u64().cmp(&right.as_u64()))
    };
    Ok(Value::from_bits(result, u64::from(op.holds(ordering))))
}

pub(crate) fn negate(value: Value) -> Result<Value, VmError> {
    match value {
        Value::Float32(v) => Ok(Value::Float32(-v)),
        Value::Float64(v) => Ok(Value::Float64(-v)),
        Value::Pointer(_) => Err(mismatch("-", value, value)),
        integer => Ok(Value::from_bits(
            integer.kind(),
            integer.as_i64().wrapping_neg() as u64,
        )),
    }
}

pub(crate) fn bit_not(value: Value) -> Result<Value, VmError> {
    match value {
        Value::Float32(_) | Value::Float64(_) | Value::Pointer(_) => {
            Err(mismatch("~", value, value))
        }
        integer => Ok(Value::from_bits(integer.kind(), !integer.to_bits())),
    }
}

pub(crate) fn logical_not(value: Value, result: ValueKind) -> Value {
    Value::from_bits(result, u64::from(!value.is_truthy()))
}

/// `pointer + cells`, wrapping at a pointer of `width` bytes.
///
/// Widths beyond the interpreter's address type wrap at the address type.
pub(crate) fn offset_pointer(pointer: Value, cells: i64, width: u8) -> Result<Value, VmError> {
    match pointer {
        Value::Pointer(address) => {
            let bits = (u32::from(width) * 8).min(Address::BITS);
            let mask = (1u64 << bits) - 1;
            let moved = i64::from(address).wrapping_add(cells) as u64 & mask;
            Ok(Value::Pointer(moved as Address))
        }
        other => Err(VmError::TypeMismatch {
            op: "+",
            left: other.kind(),
            right: ValueKind::Int64,
        }),
    }
}
