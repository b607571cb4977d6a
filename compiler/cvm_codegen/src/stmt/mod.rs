//! Statement emission.

use cvm_diagnostic::ErrorCode;
use cvm_ir::{Block, Expr, Stmt, StmtKind};
use cvm_stack::ensure_sufficient_stack;
use cvm_types::CType;

use crate::expr::{emit, evaluated_type, struct_value};
use crate::{EmitContext, Instruction};

pub fn emit_block<'a>(block: &'a Block, ec: &mut EmitContext<'a>) {
    ec.push_scope();
    for stmt in &block.statements {
        emit_stmt(stmt, ec);
    }
    ec.pop_scope();
}

pub fn emit_stmt<'a>(stmt: &'a Stmt, ec: &mut EmitContext<'a>) {
    ensure_sufficient_stack(|| emit_stmt_inner(stmt, ec));
}

fn emit_stmt_inner<'a>(stmt: &'a Stmt, ec: &mut EmitContext<'a>) {
    match &stmt.kind {
        StmtKind::Expr(expr) => {
            if expr.is_error() {
                return;
            }
            emit(expr, ec);
            ec.emit(Instruction::Pop);
        }
        StmtKind::Var { name, ty, init } => {
            let ty = ec.resolve_type(ty, stmt.span);
            let slot = ec.declare_local(name, ty.clone(), stmt.span);
            if let Some(init) = init {
                if ty.is_struct() {
                    struct_value(init, ec);
                    return;
                }
                let init_ty = evaluated_type(init, ec);
                emit(init, ec);
                ec.emit_cast(&init_ty, &ty, init.span);
                ec.emit(Instruction::StoreLocal(slot));
            }
        }
        StmtKind::Return(value) => emit_return(stmt, value.as_ref(), ec),
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            emit_condition(condition, ec);
            let to_else = ec.emit(Instruction::BranchIfFalse(0));
            emit_stmt(then_branch, ec);
            match else_branch {
                Some(else_branch) => {
                    let to_end = ec.emit(Instruction::Jump(0));
                    let else_start = ec.next_index();
                    ec.patch(to_else, else_start);
                    emit_stmt(else_branch, ec);
                    let end = ec.next_index();
                    ec.patch(to_end, end);
                }
                None => {
                    let end = ec.next_index();
                    ec.patch(to_else, end);
                }
            }
        }
        StmtKind::While { condition, body } => {
            let start = ec.next_index();
            emit_condition(condition, ec);
            let to_end = ec.emit(Instruction::BranchIfFalse(0));
            emit_stmt(body, ec);
            ec.emit(Instruction::Jump(start));
            let end = ec.next_index();
            ec.patch(to_end, end);
        }
        StmtKind::Block(block) => emit_block(block, ec),
    }
}

fn emit_condition<'a>(condition: &'a Expr, ec: &mut EmitContext<'a>) {
    let ty = evaluated_type(condition, ec);
    if ty.is_struct() {
        struct_value(condition, ec);
        return;
    }
    emit(condition, ec);
}

fn emit_return<'a>(stmt: &Stmt, value: Option<&'a Expr>, ec: &mut EmitContext<'a>) {
    let return_type = ec.return_type().clone();
    match (value, return_type.is_void()) {
        (Some(value), true) => {
            let name = ec.function_name().to_owned();
            ec.error(
                ErrorCode::E0127,
                value.span,
                format!(
                    "Since '{name}' returns void, a return keyword must not be followed by an object expression"
                ),
            );
        }
        (Some(value), false) => {
            let ty = evaluated_type(value, ec);
            emit(value, ec);
            ec.emit_cast(&ty, &return_type, value.span);
            ec.emit(Instruction::Return);
        }
        (None, true) => {
            ec.emit(Instruction::Return);
        }
        (None, false) => {
            ec.error(
                ErrorCode::E0126,
                stmt.span,
                format!("An object of a type convertible to '{return_type}' is required"),
            );
        }
    }
}

/// Close a function body. Control falling off the end of a non-`void`
/// function returns zero.
pub fn emit_implicit_return(return_type: &CType, ec: &mut EmitContext<'_>) {
    if let Some(kind) = return_type.value_kind() {
        ec.emit(Instruction::LoadConstant(kind.zero()));
    }
    ec.emit(Instruction::Return);
}

#[cfg(test)]
mod tests;
