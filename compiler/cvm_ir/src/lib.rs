//! cvm IR - values, source spans and syntax trees.
//!
//! This crate is the leaf of the cvm workspace:
//! - [`Value`]: the tagged numeric/pointer cell the virtual machine computes with
//! - [`Span`]: compact source locations for diagnostics
//! - [`ast`]: type syntax, expressions, statements and declarations handed to
//!   the compiler by a front end
//!
//! Nothing here knows about target widths. Type names stay syntactic
//! ([`TypeName`]) until `cvm_types` resolves them against a machine model.

pub mod ast;
mod span;
mod value;

pub use ast::{
    BasicTypeName, BinaryOp, Block, Expr, ExprKind, FunctionDef, GlobalDecl, LogicalOp,
    MemberDecl, ParamDecl, Signature, Signedness, Stmt, StmtKind, StructDecl, TranslationUnit,
    TypeName, UnaryOp,
};
pub use span::Span;
pub use value::{Address, Value, ValueKind};
