//! Statements and blocks.

use super::{Expr, TypeName};
use crate::Span;

#[derive(Clone, PartialEq, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, PartialEq, Debug)]
pub enum StmtKind {
    /// Expression evaluated for its effect; the value is discarded.
    Expr(Expr),
    /// Local variable declaration.
    Var {
        name: String,
        ty: TypeName,
        init: Option<Expr>,
    },
    Return(Option<Expr>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    Block(Block),
}

/// A braced statement list; introduces a scope.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

impl Block {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Block { statements }
    }
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }

    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn expr(expr: Expr) -> Self {
        let span = expr.span;
        Self::new(StmtKind::Expr(expr), span)
    }

    pub fn var(name: impl Into<String>, ty: TypeName, init: Option<Expr>) -> Self {
        Self::new(
            StmtKind::Var {
                name: name.into(),
                ty,
                init,
            },
            Span::DUMMY,
        )
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Return(value), Span::DUMMY)
    }

    pub fn if_else(condition: Expr, then_branch: Stmt, else_branch: Option<Stmt>) -> Self {
        Self::new(
            StmtKind::If {
                condition,
                then_branch: Box::new(then_branch),
                else_branch: else_branch.map(Box::new),
            },
            Span::DUMMY,
        )
    }

    pub fn while_loop(condition: Expr, body: Stmt) -> Self {
        Self::new(
            StmtKind::While {
                condition,
                body: Box::new(body),
            },
            Span::DUMMY,
        )
    }

    pub fn block(statements: Vec<Stmt>) -> Self {
        Self::new(StmtKind::Block(Block::new(statements)), Span::DUMMY)
    }
}
