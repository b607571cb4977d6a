use super::*;
use cvm_diagnostic::Report;
use cvm_ir::{BinaryOp, Span, TypeName, Value};
use cvm_types::{FunctionType, MachineInfo, TypeRegistry};
use pretty_assertions::assert_eq;

use crate::SymbolTable;

/// Emit `statements` as the body of a function returning `return_type`.
fn body(return_type: fn(&MachineInfo) -> CType, statements: Vec<Stmt>) -> (Vec<Instruction>, Report) {
    let machine = MachineInfo::default();
    let registry = TypeRegistry::new();
    let symbols = SymbolTable::new();
    let mut report = Report::new();
    let block = Block::new(statements);
    let code = {
        let mut ec = EmitContext::new(&machine, &registry, &symbols, &mut report);
        let ty = FunctionType::new(return_type(&machine), Vec::new());
        ec.begin_function("f", &ty, None, Span::DUMMY);
        emit_block(&block, &mut ec);
        emit_implicit_return(&ty.return_type, &mut ec);
        ec.finish_function().code
    };
    (code, report)
}

fn void(_: &MachineInfo) -> CType {
    CType::Void
}

fn codes(report: &Report) -> Vec<ErrorCode> {
    report.diagnostics().iter().map(|d| d.code).collect()
}

#[test]
fn test_if_else_targets() {
    let (code, report) = body(
        CType::int,
        vec![Stmt::if_else(
            Expr::int(1),
            Stmt::ret(Some(Expr::int(2))),
            Some(Stmt::ret(Some(Expr::int(3)))),
        )],
    );
    assert!(!report.has_errors());
    assert_eq!(
        code,
        vec![
            Instruction::LoadConstant(Value::Int32(1)),
            Instruction::BranchIfFalse(5),
            Instruction::LoadConstant(Value::Int32(2)),
            Instruction::Return,
            Instruction::Jump(7),
            Instruction::LoadConstant(Value::Int32(3)),
            Instruction::Return,
            Instruction::LoadConstant(Value::Int32(0)),
            Instruction::Return,
        ]
    );
}

#[test]
fn test_while_jumps_back_to_condition() {
    let (code, _) = body(
        void,
        vec![
            Stmt::var("x", TypeName::int(), Some(Expr::int(3))),
            Stmt::while_loop(
                Expr::var("x"),
                Stmt::expr(Expr::assign(
                    Expr::var("x"),
                    Expr::binary(BinaryOp::Sub, Expr::var("x"), Expr::int(1)),
                )),
            ),
        ],
    );
    assert_eq!(
        code,
        vec![
            Instruction::LoadConstant(Value::Int32(3)),
            Instruction::StoreLocal(0),
            Instruction::LoadLocal(0),
            Instruction::BranchIfFalse(12),
            Instruction::LoadLocal(0),
            Instruction::LoadConstant(Value::Int32(1)),
            Instruction::Sub,
            Instruction::Dup,
            Instruction::LoadLocalAddress(0),
            Instruction::StorePointer,
            Instruction::Pop,
            Instruction::Jump(2),
            Instruction::Return,
        ]
    );
}

#[test]
fn test_inner_scopes_get_their_own_slots() {
    let (code, report) = body(
        void,
        vec![
            Stmt::var("x", TypeName::int(), None),
            Stmt::block(vec![Stmt::var("x", TypeName::char(), Some(Expr::int(1)))]),
        ],
    );
    assert!(!report.has_errors());
    assert_eq!(
        code,
        vec![
            Instruction::LoadConstant(Value::Int32(1)),
            Instruction::Convert(cvm_ir::ValueKind::Int8),
            Instruction::StoreLocal(1),
            Instruction::Return,
        ]
    );
}

#[test]
fn test_value_returned_from_void_function() {
    let (_, report) = body(void, vec![Stmt::ret(Some(Expr::int(1)))]);
    assert_eq!(codes(&report), vec![ErrorCode::E0127]);
}

#[test]
fn test_missing_return_value() {
    let (_, report) = body(CType::int, vec![Stmt::ret(None)]);
    assert_eq!(codes(&report), vec![ErrorCode::E0126]);
}

#[test]
fn test_return_value_converted() {
    let (code, _) = body(CType::double, vec![Stmt::ret(Some(Expr::int(1)))]);
    assert_eq!(
        &code[..3],
        &[
            Instruction::LoadConstant(Value::Int32(1)),
            Instruction::Convert(cvm_ir::ValueKind::Float64),
            Instruction::Return,
        ]
    );
}

#[test]
fn test_unknown_local_type() {
    let (_, report) = body(
        void,
        vec![Stmt::var("s", TypeName::named("Nope"), None)],
    );
    assert_eq!(codes(&report), vec![ErrorCode::E0246]);
}
