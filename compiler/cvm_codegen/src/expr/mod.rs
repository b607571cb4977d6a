//! Expression typing and emission.
//!
//! Every expression supports two queries against an [`EmitContext`]:
//!
//! - [`evaluated_type`]: the static type, reporting problems it finds
//! - [`emit`]: bytecode leaving exactly one value on the stack
//!
//! Lvalues (variables, fields, dereferences) also support [`emit_pointer`],
//! which leaves the address of the object instead. Both queries may run on
//! the same node. Types, names, fields and call targets are memoised per
//! node, so a node reports its diagnostics the first time it is queried and
//! never again.
//!
//! A node that fails to type-check is typed `int` so that its parents keep
//! checking; the failure itself is reported exactly once where it happens.

mod call;
mod member;
mod operators;

use cvm_diagnostic::{ErrorCode, ErrorGuaranteed};
use cvm_ir::{BasicTypeName, Expr, ExprKind, Signedness, Value, ValueKind};
use cvm_stack::ensure_sufficient_stack;
use cvm_types::{is_explicit_conversion_allowed, CType, MachineInfo};

use crate::context::{node_key, Symbol};
use crate::{EmitContext, Instruction};

pub use call::{resolve_overload, Overload, OverloadEmit, Receiver};

/// Static type of `expr`, computed once per node.
pub fn evaluated_type<'a>(expr: &'a Expr, ec: &mut EmitContext<'a>) -> CType {
    let key = node_key(expr);
    if let Some(ty) = ec.memo().types.get(&key) {
        return ty.clone();
    }
    let ty = ensure_sufficient_stack(|| evaluated_type_inner(expr, ec));
    ec.memo().types.insert(key, ty.clone());
    ty
}

/// Emit `expr`, leaving its value on the stack.
pub fn emit<'a>(expr: &'a Expr, ec: &mut EmitContext<'a>) {
    ensure_sufficient_stack(|| emit_inner(expr, ec));
}

/// Emit the address of the object `expr` designates.
pub fn emit_pointer<'a>(expr: &'a Expr, ec: &mut EmitContext<'a>) {
    ensure_sufficient_stack(|| emit_pointer_inner(expr, ec));
}

/// What the variable `expr` names when it is read or assigned.
fn variable_symbol<'a>(
    expr: &'a Expr,
    name: &str,
    ec: &mut EmitContext<'a>,
) -> Result<Symbol, ErrorGuaranteed> {
    let key = node_key(expr);
    if let Some(symbol) = ec.memo().names.get(&key) {
        return symbol.clone();
    }
    let symbol = ec.resolve_variable(name, None, expr.span);
    ec.memo().names.insert(key, symbol.clone());
    symbol
}

fn evaluated_type_inner<'a>(expr: &'a Expr, ec: &mut EmitContext<'a>) -> CType {
    let machine = ec.machine();
    match &expr.kind {
        ExprKind::Integer(v) => integer_literal_type(*v, machine),
        ExprKind::Character(_) => CType::char(machine),
        ExprKind::Float(_) => CType::double(machine),
        ExprKind::Constant(v) => constant_type(*v, machine),
        ExprKind::Variable(name) => match variable_symbol(expr, name, ec) {
            Ok(symbol) => symbol.ty(),
            Err(_) => ec.int_type(),
        },
        ExprKind::This => this_type(expr, ec),
        ExprKind::Member { .. } | ExprKind::Arrow { .. } => member::member_type(expr, ec),
        ExprKind::Call {
            function,
            arguments,
        } => call::call_type(expr, function, arguments, ec),
        ExprKind::Cast { ty, operand } => {
            let to = ec.resolve_type(ty, expr.span);
            let from = evaluated_type(operand, ec);
            if !is_explicit_conversion_allowed(&from, &to) {
                ec.error(
                    ErrorCode::E0030,
                    expr.span,
                    format!("Cannot convert type '{from}' to '{to}'"),
                );
            }
            to
        }
        ExprKind::Unary { op, operand } => operators::unary_type(expr, *op, operand, ec),
        ExprKind::Binary { op, left, right } => {
            operators::binary_type(expr, *op, left, right, ec)
        }
        ExprKind::Logical { op, left, right } => {
            operators::logical_type(expr, *op, left, right, ec)
        }
        ExprKind::Assign { target, .. } => evaluated_type(target, ec),
        ExprKind::AddressOf(operand) => evaluated_type(operand, ec).pointer_to(),
        ExprKind::Deref(operand) => deref_type(expr, operand, ec),
        ExprKind::Error => ec.int_type(),
    }
}

fn emit_inner<'a>(expr: &'a Expr, ec: &mut EmitContext<'a>) {
    match &expr.kind {
        ExprKind::Integer(_) | ExprKind::Character(_) | ExprKind::Float(_) => {
            let ty = evaluated_type(expr, ec);
            let value = literal_value(&expr.kind);
            let value = ty.value_kind().map_or(value, |kind| value.convert(kind));
            ec.emit(Instruction::LoadConstant(value));
        }
        ExprKind::Constant(v) => {
            ec.emit(Instruction::LoadConstant(*v));
        }
        ExprKind::Variable(name) => {
            let Ok(symbol) = variable_symbol(expr, name, ec) else {
                return;
            };
            if symbol.ty().is_struct() {
                struct_value(expr, ec);
                return;
            }
            match symbol {
                Symbol::Local { slot, .. } => {
                    ec.emit(Instruction::LoadLocal(slot));
                }
                Symbol::Global { address, .. } => {
                    ec.emit(Instruction::LoadGlobal(address));
                }
                Symbol::Field { offset, .. } => {
                    emit_this_field(offset, ec);
                    ec.emit(Instruction::LoadPointer);
                }
                Symbol::Function { address, .. } => {
                    ec.emit(Instruction::LoadConstant(Value::Pointer(address)));
                }
                Symbol::Method { .. } => {
                    invalid_in_context(expr, ec);
                }
            }
        }
        ExprKind::This => {
            if evaluated_type(expr, ec).is_pointer() {
                ec.emit(Instruction::LoadLocal(0));
            }
        }
        ExprKind::Member { .. } | ExprKind::Arrow { .. } => member::emit_member(expr, ec),
        ExprKind::Call {
            function,
            arguments,
        } => call::emit_call(expr, function, arguments, ec),
        ExprKind::Cast { operand, .. } => {
            let to = evaluated_type(expr, ec);
            let from = evaluated_type(operand, ec);
            emit(operand, ec);
            if is_explicit_conversion_allowed(&from, &to) {
                ec.emit_conversion(&from, &to);
            }
        }
        ExprKind::Unary { op, operand } => operators::emit_unary(expr, *op, operand, ec),
        ExprKind::Binary { op, left, right } => {
            operators::emit_binary(expr, *op, left, right, ec);
        }
        ExprKind::Logical { op, left, right } => {
            operators::emit_logical(expr, *op, left, right, ec);
        }
        ExprKind::Assign { target, value } => emit_assign(target, value, ec),
        ExprKind::AddressOf(operand) => {
            if matches!(evaluated_type(operand, ec), CType::Function(_)) {
                emit(operand, ec);
            } else {
                emit_pointer(operand, ec);
            }
        }
        ExprKind::Deref(operand) => match evaluated_type(expr, ec) {
            CType::Function(_) => emit(operand, ec),
            CType::Struct(_) => struct_value(expr, ec),
            _ => {
                emit(operand, ec);
                ec.emit(Instruction::LoadPointer);
            }
        },
        ExprKind::Error => {}
    }
}

fn emit_pointer_inner<'a>(expr: &'a Expr, ec: &mut EmitContext<'a>) {
    match &expr.kind {
        ExprKind::Variable(name) => {
            let Ok(symbol) = variable_symbol(expr, name, ec) else {
                return;
            };
            match symbol {
                Symbol::Local { slot, .. } => {
                    ec.emit(Instruction::LoadLocalAddress(slot));
                }
                Symbol::Global { address, .. } => {
                    ec.emit(Instruction::LoadGlobalAddress(address));
                }
                Symbol::Field { offset, .. } => emit_this_field(offset, ec),
                Symbol::Function { .. } | Symbol::Method { .. } => not_an_lvalue(expr, ec),
            }
        }
        ExprKind::Member { .. } | ExprKind::Arrow { .. } => member::emit_member_pointer(expr, ec),
        ExprKind::Deref(operand) => {
            evaluated_type(expr, ec);
            emit(operand, ec);
        }
        ExprKind::Error => {}
        _ => not_an_lvalue(expr, ec),
    }
}

fn emit_assign<'a>(target: &'a Expr, value: &'a Expr, ec: &mut EmitContext<'a>) {
    let target_ty = evaluated_type(target, ec);
    let value_ty = evaluated_type(value, ec);
    if target_ty.is_struct() {
        struct_value(target, ec);
        return;
    }
    emit(value, ec);
    ec.emit_cast(&value_ty, &target_ty, value.span);
    ec.emit(Instruction::Dup);
    emit_pointer(target, ec);
    ec.emit(Instruction::StorePointer);
}

fn emit_this_field(offset: u32, ec: &mut EmitContext<'_>) {
    ec.emit(Instruction::LoadLocal(0));
    if offset > 0 {
        ec.emit(Instruction::OffsetPointer(offset));
    }
}

fn this_type(expr: &Expr, ec: &mut EmitContext<'_>) -> CType {
    match ec.owner() {
        Some(owner) => CType::Struct(owner.clone()).pointer_to(),
        None => {
            ec.error(
                ErrorCode::E0103,
                expr.span,
                "The name 'this' does not exist in the current context",
            );
            ec.int_type()
        }
    }
}

fn deref_type<'a>(expr: &Expr, operand: &'a Expr, ec: &mut EmitContext<'a>) -> CType {
    let ty = evaluated_type(operand, ec);
    match ty {
        CType::Pointer(inner) if !inner.is_void() => *inner,
        CType::Function(_) => ty,
        other => {
            ec.error(
                ErrorCode::E0019,
                expr.span,
                format!("Operator '*' cannot be applied to operand of type '{other}'"),
            );
            ec.int_type()
        }
    }
}

pub(crate) fn struct_value(expr: &Expr, ec: &mut EmitContext<'_>) {
    ec.error(
        ErrorCode::E0020,
        expr.span,
        format!("'{expr}' is a struct value; take its address instead"),
    );
}

pub(crate) fn invalid_in_context(expr: &Expr, ec: &mut EmitContext<'_>) {
    ec.error(
        ErrorCode::E0119,
        expr.span,
        format!("'{expr}' is not valid in the given context"),
    );
}

fn not_an_lvalue(expr: &Expr, ec: &mut EmitContext<'_>) {
    ec.error(
        ErrorCode::E0131,
        expr.span,
        "The left-hand side of an assignment must be a variable, property or indexer",
    );
}

fn literal_value(kind: &ExprKind) -> Value {
    match kind {
        ExprKind::Integer(v) => Value::Int64(*v),
        ExprKind::Character(c) => Value::UInt8(*c),
        ExprKind::Float(v) => Value::Float64(*v),
        _ => Value::Int32(0),
    }
}

/// `int`, `long` or `long long`: the first wide enough for `value`.
pub fn integer_literal_type(value: i64, machine: &MachineInfo) -> CType {
    let name = [BasicTypeName::Int, BasicTypeName::LongInt]
        .into_iter()
        .find(|&name| fits_signed(value, machine.size_of(name)))
        .unwrap_or(BasicTypeName::LongLongInt);
    CType::basic(name, Signedness::Signed, machine)
}

fn fits_signed(value: i64, size: u8) -> bool {
    let bits = u32::from(size) * 8;
    if bits >= 64 {
        return true;
    }
    let limit = 1i64 << (bits - 1);
    (-limit..limit).contains(&value)
}

/// The C type a constant of this representation has on `machine`.
pub fn constant_type(value: Value, machine: &MachineInfo) -> CType {
    let (size, signedness) = match value.kind() {
        ValueKind::Pointer => return CType::void_pointer(),
        ValueKind::Float32 | ValueKind::Float64 => {
            let size = if value.kind() == ValueKind::Float32 { 4 } else { 8 };
            let name = [BasicTypeName::Float, BasicTypeName::Double, BasicTypeName::LongDouble]
                .into_iter()
                .find(|&name| machine.size_of(name) == size)
                .unwrap_or(BasicTypeName::Double);
            return CType::basic(name, Signedness::Signed, machine);
        }
        ValueKind::Int8 => (1, Signedness::Signed),
        ValueKind::UInt8 => (1, Signedness::Unsigned),
        ValueKind::Int16 => (2, Signedness::Signed),
        ValueKind::UInt16 => (2, Signedness::Unsigned),
        ValueKind::Int32 => (4, Signedness::Signed),
        ValueKind::UInt32 => (4, Signedness::Unsigned),
        ValueKind::Int64 => (8, Signedness::Signed),
        ValueKind::UInt64 => (8, Signedness::Unsigned),
    };
    let name = [
        BasicTypeName::Char,
        BasicTypeName::ShortInt,
        BasicTypeName::Int,
        BasicTypeName::LongInt,
        BasicTypeName::LongLongInt,
    ]
    .into_iter()
    .find(|&name| machine.size_of(name) == size)
    .unwrap_or(BasicTypeName::LongLongInt);
    CType::basic(name, signedness, machine)
}
