//! Field access: `target.field` and `target->field`.

use cvm_diagnostic::{ErrorCode, ErrorGuaranteed};
use cvm_ir::{Expr, ExprKind};
use cvm_types::CType;

use super::{emit, emit_pointer, evaluated_type, struct_value};
use crate::context::node_key;
use crate::{EmitContext, Instruction};

/// The struct a member access reaches into, and whether the target is a
/// pointer to it.
fn split(expr: &Expr) -> Option<(&Expr, &str, bool)> {
    match &expr.kind {
        ExprKind::Member { target, member } => Some((target, member, false)),
        ExprKind::Arrow { target, member } => Some((target, member, true)),
        _ => None,
    }
}

/// Cell offset and type of the field `expr` names, resolved once per node.
fn field_of<'a>(
    expr: &'a Expr,
    ec: &mut EmitContext<'a>,
) -> Result<(u32, CType), ErrorGuaranteed> {
    let key = node_key(expr);
    if let Some(field) = ec.memo().fields.get(&key) {
        return field.clone();
    }
    let field = resolve_field(expr, ec);
    ec.memo().fields.insert(key, field.clone());
    field
}

fn resolve_field<'a>(
    expr: &'a Expr,
    ec: &mut EmitContext<'a>,
) -> Result<(u32, CType), ErrorGuaranteed> {
    let Some((target, member, arrow)) = split(expr) else {
        return Err(ec.error(
            ErrorCode::E0119,
            expr.span,
            format!("'{expr}' is not valid in the given context"),
        ));
    };
    let target_ty = evaluated_type(target, ec);
    let owner = if arrow {
        target_ty.pointee().and_then(CType::as_struct)
    } else {
        target_ty.as_struct()
    };
    let Some(owner) = owner.cloned() else {
        return Err(ec.error(
            ErrorCode::E0119,
            target.span,
            format!("'{target}' is not valid in the given context"),
        ));
    };

    let registry = ec.registry();
    let Some(st) = registry.get(&owner) else {
        return Err(ec.error(
            ErrorCode::E0246,
            target.span,
            format!("The type '{owner}' could not be found"),
        ));
    };
    if let Some((offset, ty)) = st.field(member) {
        return Ok((offset, ty.clone()));
    }
    if st.has_member(member) {
        // A method named without calling it.
        return Err(ec.error(
            ErrorCode::E0119,
            expr.span,
            format!("'{expr}' is not valid in the given context"),
        ));
    }
    Err(ec.error(
        ErrorCode::E1061,
        expr.span,
        format!("'{member}' not found in '{owner}'"),
    ))
}

pub(super) fn member_type<'a>(expr: &'a Expr, ec: &mut EmitContext<'a>) -> CType {
    match field_of(expr, ec) {
        Ok((_, ty)) => ty,
        Err(_) => ec.int_type(),
    }
}

pub(super) fn emit_member<'a>(expr: &'a Expr, ec: &mut EmitContext<'a>) {
    let Ok((_, ty)) = field_of(expr, ec) else {
        return;
    };
    if ty.is_struct() {
        struct_value(expr, ec);
        return;
    }
    emit_member_pointer(expr, ec);
    ec.emit(Instruction::LoadPointer);
}

pub(super) fn emit_member_pointer<'a>(expr: &'a Expr, ec: &mut EmitContext<'a>) {
    let Ok((offset, _)) = field_of(expr, ec) else {
        return;
    };
    let Some((target, _, arrow)) = split(expr) else {
        return;
    };
    if arrow {
        emit(target, ec);
    } else {
        emit_pointer(target, ec);
    }
    if offset > 0 {
        ec.emit(Instruction::OffsetPointer(offset));
    }
}
