//! Conversion scoring and the usual arithmetic conversions.
//!
//! Overload resolution ranks candidates by summing, per argument, how good
//! the implicit conversion from argument type to parameter type is:
//!
//! | score | conversion |
//! |-------|------------|
//! | 3     | identical types |
//! | 2     | widening within one category and signedness (`char` → `int`, `float` → `double`) |
//! | 1     | anything else C converts implicitly: narrowing, signedness change, int ↔ float, to `bool`, `void*` |
//! | 0     | not implicitly convertible |

use cvm_ir::Signedness;

use crate::{BasicKind, BasicType, CType, MachineInfo};

pub const SCORE_NONE: u32 = 0;
pub const SCORE_CONVERSION: u32 = 1;
pub const SCORE_PROMOTION: u32 = 2;
pub const SCORE_EXACT: u32 = 3;

/// Score the implicit conversion of a `from` value to `to`.
pub fn score_conversion(from: &CType, to: &CType) -> u32 {
    if from == to {
        return SCORE_EXACT;
    }
    match (from, to) {
        (CType::Basic(f), CType::Basic(t)) => score_basic(*f, *t),
        (CType::Pointer(f), CType::Pointer(t)) => match (f.as_ref(), t.as_ref()) {
            (CType::Function(f), CType::Function(t)) if f.same_signature(t) => SCORE_EXACT,
            (f, t) if f.is_void() || t.is_void() => SCORE_CONVERSION,
            _ => SCORE_NONE,
        },
        // A function designator decays to a pointer to itself.
        (CType::Function(f), CType::Pointer(t)) => match t.as_ref() {
            CType::Function(t) if f.same_signature(t) => SCORE_EXACT,
            _ => SCORE_NONE,
        },
        (CType::Function(f), CType::Function(t)) if f.same_signature(t) => SCORE_EXACT,
        (CType::Pointer(_) | CType::Function(_), CType::Basic(t)) if t.kind() == BasicKind::Bool => {
            SCORE_CONVERSION
        }
        _ => SCORE_NONE,
    }
}

fn score_basic(from: BasicType, to: BasicType) -> u32 {
    let widening = match (from.kind(), to.kind()) {
        (BasicKind::Integer, BasicKind::Integer) => {
            to.size > from.size && from.signedness == to.signedness
        }
        (BasicKind::Float, BasicKind::Float) => to.size > from.size,
        _ => false,
    };
    if widening {
        SCORE_PROMOTION
    } else {
        SCORE_CONVERSION
    }
}

/// Whether an explicit cast from `from` to `to` is allowed.
pub fn is_explicit_conversion_allowed(from: &CType, to: &CType) -> bool {
    if from == to || to.is_void() {
        return true;
    }
    match (from, to) {
        (CType::Basic(_), CType::Basic(_))
        | (CType::Pointer(_) | CType::Function(_), CType::Pointer(_)) => true,
        (CType::Basic(b), CType::Pointer(_)) => b.kind() != BasicKind::Float,
        (CType::Pointer(_), CType::Basic(b)) => b.kind() != BasicKind::Float,
        _ => false,
    }
}

/// Integer promotion: `bool` and anything narrower than `int` become `int`.
pub fn integer_promotion(ty: BasicType, machine: &MachineInfo) -> BasicType {
    match ty.kind() {
        BasicKind::Float => ty,
        BasicKind::Bool => int_type(machine),
        BasicKind::Integer if ty.size < machine.int_size => int_type(machine),
        BasicKind::Integer => ty,
    }
}

/// The common type binary arithmetic on `left` and `right` is performed in.
pub fn arithmetic_result_type(
    left: BasicType,
    right: BasicType,
    machine: &MachineInfo,
) -> BasicType {
    match (left.kind(), right.kind()) {
        (BasicKind::Float, BasicKind::Float) => {
            if right.size > left.size {
                right
            } else {
                left
            }
        }
        (BasicKind::Float, _) => left,
        (_, BasicKind::Float) => right,
        _ => {
            let l = integer_promotion(left, machine);
            let r = integer_promotion(right, machine);
            if l == r {
                l
            } else if l.size != r.size {
                if l.size > r.size {
                    l
                } else {
                    r
                }
            } else {
                // Same width, mixed signedness.
                l.with_signedness(Signedness::Unsigned)
            }
        }
    }
}

fn int_type(machine: &MachineInfo) -> BasicType {
    BasicType::new(cvm_ir::BasicTypeName::Int, Signedness::Signed, machine)
}

#[cfg(test)]
mod tests;
