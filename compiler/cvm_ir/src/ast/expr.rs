//! Expression nodes.

use std::fmt;

use super::TypeName;
use crate::{Span, Value};

/// Unary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `~x`
    BitNot,
    /// `!x`
    Not,
}

impl UnaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::Not => "!",
        }
    }
}

/// Binary operators that evaluate both operands.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
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
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
        }
    }

    /// Comparison operators produce `int` 0 or 1.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }

    /// Operators that are only defined for integer operands.
    pub fn requires_integers(self) -> bool {
        matches!(
            self,
            BinaryOp::Mod
                | BinaryOp::BitAnd
                | BinaryOp::BitOr
                | BinaryOp::BitXor
                | BinaryOp::Shl
                | BinaryOp::Shr
        )
    }
}

/// Short-circuiting operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        }
    }
}

/// An expression with its source span.
#[derive(Clone, PartialEq, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Expression variants.
#[derive(Clone, PartialEq, Debug)]
pub enum ExprKind {
    /// Integer literal; typed as the first of `int`, `long`, `long long`
    /// wide enough on the target.
    Integer(i64),
    /// Character literal, typed `char`.
    Character(u8),
    /// Floating literal, typed `double`.
    Float(f64),
    /// A constant whose representation is already fixed.
    Constant(Value),
    /// Reference to a local, global, function or implicit `this` member.
    Variable(String),
    /// The receiver pointer inside a method body.
    This,
    /// `target.member`
    Member { target: Box<Expr>, member: String },
    /// `target->member`
    Arrow { target: Box<Expr>, member: String },
    /// `function(arguments...)`
    Call {
        function: Box<Expr>,
        arguments: Vec<Expr>,
    },
    /// `(ty)operand`
    Cast { ty: TypeName, operand: Box<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `target = value`
    Assign { target: Box<Expr>, value: Box<Expr> },
    /// `&operand`
    AddressOf(Box<Expr>),
    /// `*operand`
    Deref(Box<Expr>),
    /// Placeholder left by a front end after a syntax error.
    Error,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }

    /// Replace the span of a programmatically built node.
    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::Integer(value), Span::DUMMY)
    }

    pub fn character(value: u8) -> Self {
        Self::new(ExprKind::Character(value), Span::DUMMY)
    }

    pub fn float(value: f64) -> Self {
        Self::new(ExprKind::Float(value), Span::DUMMY)
    }

    pub fn constant(value: Value) -> Self {
        Self::new(ExprKind::Constant(value), Span::DUMMY)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Variable(name.into()), Span::DUMMY)
    }

    pub fn this() -> Self {
        Self::new(ExprKind::This, Span::DUMMY)
    }

    pub fn error() -> Self {
        Self::new(ExprKind::Error, Span::DUMMY)
    }

    pub fn member(target: Expr, member: impl Into<String>) -> Self {
        Self::new(
            ExprKind::Member {
                target: Box::new(target),
                member: member.into(),
            },
            Span::DUMMY,
        )
    }

    pub fn arrow(target: Expr, member: impl Into<String>) -> Self {
        Self::new(
            ExprKind::Arrow {
                target: Box::new(target),
                member: member.into(),
            },
            Span::DUMMY,
        )
    }

    pub fn call(function: Expr, arguments: Vec<Expr>) -> Self {
        Self::new(
            ExprKind::Call {
                function: Box::new(function),
                arguments,
            },
            Span::DUMMY,
        )
    }

    pub fn cast(ty: TypeName, operand: Expr) -> Self {
        Self::new(
            ExprKind::Cast {
                ty,
                operand: Box::new(operand),
            },
            Span::DUMMY,
        )
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            Span::DUMMY,
        )
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            Span::DUMMY,
        )
    }

    pub fn logical(op: LogicalOp, left: Expr, right: Expr) -> Self {
        Self::new(
            ExprKind::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            Span::DUMMY,
        )
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::new(
            ExprKind::Assign {
                target: Box::new(target),
                value: Box::new(value),
            },
            Span::DUMMY,
        )
    }

    pub fn address_of(operand: Expr) -> Self {
        Self::new(ExprKind::AddressOf(Box::new(operand)), Span::DUMMY)
    }

    pub fn deref(operand: Expr) -> Self {
        Self::new(ExprKind::Deref(Box::new(operand)), Span::DUMMY)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ExprKind::Error)
    }
}

/// Renders the expression as C source; diagnostics quote it.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Integer(v) => write!(f, "{v}"),
            ExprKind::Character(c) => match *c {
                b'\'' => write!(f, "'\\''"),
                c if c.is_ascii_graphic() || c == b' ' => write!(f, "'{}'", char::from(c)),
                c => write!(f, "'\\x{c:02x}'"),
            },
            ExprKind::Float(v) => write!(f, "{v:?}"),
            ExprKind::Constant(v) => write!(f, "{v}"),
            ExprKind::Variable(name) => write!(f, "{name}"),
            ExprKind::This => write!(f, "this"),
            ExprKind::Member { target, member } => write!(f, "{target}.{member}"),
            ExprKind::Arrow { target, member } => write!(f, "{target}->{member}"),
            ExprKind::Call {
                function,
                arguments,
            } => {
                write!(f, "{function}(")?;
                let mut head = "";
                for arg in arguments {
                    write!(f, "{head}{arg}")?;
                    head = ", ";
                }
                write!(f, ")")
            }
            ExprKind::Cast { ty, operand } => write!(f, "(({ty}){operand})"),
            ExprKind::Unary { op, operand } => write!(f, "{}{operand}", op.as_symbol()),
            ExprKind::Binary { op, left, right } => {
                write!(f, "({left} {} {right})", op.as_symbol())
            }
            ExprKind::Logical { op, left, right } => {
                write!(f, "({left} {} {right})", op.as_symbol())
            }
            ExprKind::Assign { target, value } => write!(f, "{target} = {value}"),
            ExprKind::AddressOf(operand) => write!(f, "&{operand}"),
            ExprKind::Deref(operand) => write!(f, "*{operand}"),
            ExprKind::Error => write!(f, "<error>"),
        }
    }
}
