//! Unary, binary and short-circuit operators.

use cvm_diagnostic::ErrorCode;
use cvm_ir::{BinaryOp, Expr, LogicalOp, UnaryOp, Value};
use cvm_types::{arithmetic_result_type, integer_promotion, BasicKind, CType};

use super::{emit, evaluated_type};
use crate::{EmitContext, Instruction};

/// How a binary operator is carried out for a pair of operand types.
enum BinaryPlan {
    /// Both operands converted to `operand`.
    Arithmetic { operand: CType },
    /// The right operand is converted to the (promoted) left type.
    Shift { operand: CType },
    /// `pointer ± integer`, scaled by the pointee's cell count.
    PointerOffset {
        pointer: CType,
        stride: u32,
        pointer_first: bool,
    },
    /// Pointer comparison; integers are converted to pointers.
    PointerCompare,
    Invalid,
}

fn plan_binary(op: BinaryOp, left: &CType, right: &CType, ec: &EmitContext<'_>) -> BinaryPlan {
    let machine = ec.machine();
    match (left, right) {
        (CType::Basic(l), CType::Basic(r)) => {
            let floats = l.kind() == BasicKind::Float || r.kind() == BasicKind::Float;
            if op.requires_integers() && floats {
                BinaryPlan::Invalid
            } else if op.is_shift() {
                BinaryPlan::Shift {
                    operand: CType::Basic(integer_promotion(*l, machine)),
                }
            } else {
                BinaryPlan::Arithmetic {
                    operand: CType::Basic(arithmetic_result_type(*l, *r, machine)),
                }
            }
        }
        (CType::Pointer(p), other) | (other, CType::Pointer(p))
            if other.is_integer() && matches!(op, BinaryOp::Add | BinaryOp::Sub) =>
        {
            let pointer_first = left.is_pointer();
            if op == BinaryOp::Sub && !pointer_first {
                return BinaryPlan::Invalid;
            }
            if matches!(**p, CType::Function(_)) {
                return BinaryPlan::Invalid;
            }
            BinaryPlan::PointerOffset {
                pointer: CType::Pointer(p.clone()),
                stride: ec.registry().cell_count(p).max(1),
                pointer_first,
            }
        }
        (l, r) if op.is_comparison() => {
            let pointerish = |t: &CType| t.is_pointer() || matches!(t, CType::Function(_));
            let ok = (pointerish(l) && pointerish(r))
                || (matches!(op, BinaryOp::Eq | BinaryOp::NotEq)
                    && ((pointerish(l) && r.is_integer()) || (l.is_integer() && pointerish(r))));
            if ok {
                BinaryPlan::PointerCompare
            } else {
                BinaryPlan::Invalid
            }
        }
        _ => BinaryPlan::Invalid,
    }
}

fn binary_instruction(op: BinaryOp) -> Instruction {
    match op {
        BinaryOp::Add => Instruction::Add,
        BinaryOp::Sub => Instruction::Sub,
        BinaryOp::Mul => Instruction::Mul,
        BinaryOp::Div => Instruction::Div,
        BinaryOp::Mod => Instruction::Mod,
        BinaryOp::BitAnd => Instruction::BitAnd,
        BinaryOp::BitOr => Instruction::BitOr,
        BinaryOp::BitXor => Instruction::BitXor,
        BinaryOp::Shl => Instruction::Shl,
        BinaryOp::Shr => Instruction::Shr,
        BinaryOp::Eq => Instruction::Eq,
        BinaryOp::NotEq => Instruction::Ne,
        BinaryOp::Lt => Instruction::Lt,
        BinaryOp::LtEq => Instruction::Le,
        BinaryOp::Gt => Instruction::Gt,
        BinaryOp::GtEq => Instruction::Ge,
    }
}

fn bad_operands(expr: &Expr, op: &str, left: &CType, right: &CType, ec: &mut EmitContext<'_>) {
    ec.error(
        ErrorCode::E0019,
        expr.span,
        format!("Operator '{op}' cannot be applied to operands of type '{left}' and '{right}'"),
    );
}

fn bad_operand(expr: &Expr, op: &str, operand: &CType, ec: &mut EmitContext<'_>) {
    ec.error(
        ErrorCode::E0019,
        expr.span,
        format!("Operator '{op}' cannot be applied to operand of type '{operand}'"),
    );
}

pub(super) fn unary_type<'a>(
    expr: &Expr,
    op: UnaryOp,
    operand: &'a Expr,
    ec: &mut EmitContext<'a>,
) -> CType {
    let ty = evaluated_type(operand, ec);
    let result = match (op, &ty) {
        (UnaryOp::Neg, CType::Basic(b)) => Some(CType::Basic(integer_promotion(*b, ec.machine()))),
        (UnaryOp::BitNot, CType::Basic(b)) if b.kind() != BasicKind::Float => {
            Some(CType::Basic(integer_promotion(*b, ec.machine())))
        }
        (UnaryOp::Not, t) if t.is_scalar() => Some(ec.int_type()),
        _ => None,
    };
    result.unwrap_or_else(|| {
        bad_operand(expr, op.as_symbol(), &ty, ec);
        ec.int_type()
    })
}

pub(super) fn emit_unary<'a>(
    expr: &'a Expr,
    op: UnaryOp,
    operand: &'a Expr,
    ec: &mut EmitContext<'a>,
) {
    let result = evaluated_type(expr, ec);
    let ty = evaluated_type(operand, ec);
    emit(operand, ec);
    match op {
        UnaryOp::Neg => {
            ec.emit_conversion(&ty, &result);
            ec.emit(Instruction::Neg);
        }
        UnaryOp::BitNot => {
            ec.emit_conversion(&ty, &result);
            ec.emit(Instruction::BitNot);
        }
        UnaryOp::Not => {
            ec.emit(Instruction::LogicalNot);
        }
    }
}

pub(super) fn binary_type<'a>(
    expr: &Expr,
    op: BinaryOp,
    left: &'a Expr,
    right: &'a Expr,
    ec: &mut EmitContext<'a>,
) -> CType {
    let lt = evaluated_type(left, ec);
    let rt = evaluated_type(right, ec);
    let plan = plan_binary(op, &lt, &rt, ec);
    if op.is_comparison() && !matches!(plan, BinaryPlan::Invalid) {
        return ec.int_type();
    }
    match plan {
        BinaryPlan::Arithmetic { operand } | BinaryPlan::Shift { operand } => operand,
        BinaryPlan::PointerOffset { pointer, .. } => pointer,
        BinaryPlan::PointerCompare => ec.int_type(),
        BinaryPlan::Invalid => {
            bad_operands(expr, op.as_symbol(), &lt, &rt, ec);
            ec.int_type()
        }
    }
}

pub(super) fn emit_binary<'a>(
    expr: &'a Expr,
    op: BinaryOp,
    left: &'a Expr,
    right: &'a Expr,
    ec: &mut EmitContext<'a>,
) {
    // Reports invalid operands, once.
    evaluated_type(expr, ec);
    let lt = evaluated_type(left, ec);
    let rt = evaluated_type(right, ec);
    match plan_binary(op, &lt, &rt, ec) {
        BinaryPlan::Arithmetic { operand } | BinaryPlan::Shift { operand } => {
            emit(left, ec);
            ec.emit_conversion(&lt, &operand);
            emit(right, ec);
            ec.emit_conversion(&rt, &operand);
            ec.emit(binary_instruction(op));
        }
        BinaryPlan::PointerOffset {
            stride,
            pointer_first,
            ..
        } => {
            // The pointer goes below the offset on the stack.
            let (pointer, offset) = if pointer_first {
                (left, right)
            } else {
                (right, left)
            };
            emit(pointer, ec);
            emit(offset, ec);
            ec.emit(if op == BinaryOp::Sub {
                Instruction::SubPointer(stride)
            } else {
                Instruction::AddPointer(stride)
            });
        }
        BinaryPlan::PointerCompare => {
            let pointer = CType::void_pointer();
            emit(left, ec);
            ec.emit_conversion(&lt, &pointer);
            emit(right, ec);
            ec.emit_conversion(&rt, &pointer);
            ec.emit(binary_instruction(op));
        }
        BinaryPlan::Invalid => {}
    }
}

pub(super) fn logical_type<'a>(
    expr: &Expr,
    op: LogicalOp,
    left: &'a Expr,
    right: &'a Expr,
    ec: &mut EmitContext<'a>,
) -> CType {
    let lt = evaluated_type(left, ec);
    let rt = evaluated_type(right, ec);
    if !lt.is_scalar() || !rt.is_scalar() {
        bad_operands(expr, op.as_symbol(), &lt, &rt, ec);
    }
    ec.int_type()
}

/// Short-circuit evaluation leaving `int` 0 or 1.
pub(super) fn emit_logical<'a>(
    expr: &'a Expr,
    op: LogicalOp,
    left: &'a Expr,
    right: &'a Expr,
    ec: &mut EmitContext<'a>,
) {
    evaluated_type(expr, ec);
    let kind = ec.int_kind();
    let one = Value::Int64(1).convert(kind);

    emit(left, ec);
    let left_false = ec.emit(Instruction::BranchIfFalse(0));
    let mut short_circuit = None;
    if op == LogicalOp::Or {
        ec.emit(Instruction::LoadConstant(one));
        short_circuit = Some(ec.emit(Instruction::Jump(0)));
        let right_start = ec.next_index();
        ec.patch(left_false, right_start);
    }

    emit(right, ec);
    let right_false = ec.emit(Instruction::BranchIfFalse(0));
    ec.emit(Instruction::LoadConstant(one));
    let skip_false = ec.emit(Instruction::Jump(0));
    let false_branch = ec.emit(Instruction::LoadConstant(kind.zero()));
    let end = ec.next_index();

    ec.patch(right_false, false_branch);
    if op == LogicalOp::And {
        ec.patch(left_false, false_branch);
    }
    ec.patch(skip_false, end);
    if let Some(jump) = short_circuit {
        ec.patch(jump, end);
    }
}
