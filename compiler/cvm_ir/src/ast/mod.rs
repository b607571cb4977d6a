//! Syntax trees consumed by the compiler.
//!
//! The tree is owned top-down: every node exclusively owns its children and
//! nothing points back up. Constructors mirror what a parser produces, so
//! tests and embedders can build programs without source text.

mod expr;
mod items;
mod stmt;
mod types;

pub use expr::{BinaryOp, Expr, ExprKind, LogicalOp, UnaryOp};
pub use items::{
    FunctionDef, GlobalDecl, MemberDecl, ParamDecl, Signature, StructDecl, TranslationUnit,
};
pub use stmt::{Block, Stmt, StmtKind};
pub use types::{BasicTypeName, Signedness, TypeName};

#[cfg(test)]
mod tests;
