//! Top-level declarations: structs, globals and functions.

use std::fmt;

use super::{Block, Expr, TypeName};
use crate::{Span, Value};

/// A declared parameter, optionally with a default value.
#[derive(Clone, PartialEq, Debug)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeName,
    pub default: Option<Value>,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: TypeName) -> Self {
        ParamDecl {
            name: name.into(),
            ty,
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Return type and parameter list of a function or method.
#[derive(Clone, PartialEq, Debug)]
pub struct Signature {
    pub return_type: TypeName,
    pub params: Vec<ParamDecl>,
}

impl Signature {
    pub fn new(return_type: TypeName, params: Vec<ParamDecl>) -> Self {
        Signature {
            return_type,
            params,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.return_type)?;
        let mut head = "";
        for p in &self.params {
            write!(f, "{head}{} {}", p.ty, p.name)?;
            if let Some(default) = p.default {
                write!(f, " = {default}")?;
            }
            head = ", ";
        }
        write!(f, ")")
    }
}

/// A struct member as declared.
#[derive(Clone, PartialEq, Debug)]
pub enum MemberDecl {
    Field { name: String, ty: TypeName },
    Method { name: String, signature: Signature },
}

#[derive(Clone, PartialEq, Debug)]
pub struct StructDecl {
    pub name: String,
    pub members: Vec<MemberDecl>,
    pub span: Span,
}

impl StructDecl {
    pub fn new(name: impl Into<String>) -> Self {
        StructDecl {
            name: name.into(),
            members: Vec::new(),
            span: Span::DUMMY,
        }
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: TypeName) -> Self {
        self.members.push(MemberDecl::Field {
            name: name.into(),
            ty,
        });
        self
    }

    #[must_use]
    pub fn method(mut self, name: impl Into<String>, signature: Signature) -> Self {
        self.members.push(MemberDecl::Method {
            name: name.into(),
            signature,
        });
        self
    }
}

/// A global variable with an optional initialiser.
#[derive(Clone, PartialEq, Debug)]
pub struct GlobalDecl {
    pub name: String,
    pub ty: TypeName,
    pub init: Option<Expr>,
    pub span: Span,
}

impl GlobalDecl {
    pub fn new(name: impl Into<String>, ty: TypeName, init: Option<Expr>) -> Self {
        GlobalDecl {
            name: name.into(),
            ty,
            init,
            span: Span::DUMMY,
        }
    }
}

/// A function or method definition, or a prototype when `body` is `None`.
///
/// Methods name their struct in `owner` (`Point::move`).
#[derive(Clone, PartialEq, Debug)]
pub struct FunctionDef {
    pub name: String,
    pub owner: Option<String>,
    pub signature: Signature,
    pub body: Option<Block>,
    pub span: Span,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, signature: Signature, body: Block) -> Self {
        FunctionDef {
            name: name.into(),
            owner: None,
            signature,
            body: Some(body),
            span: Span::DUMMY,
        }
    }

    pub fn prototype(name: impl Into<String>, signature: Signature) -> Self {
        FunctionDef {
            name: name.into(),
            owner: None,
            signature,
            body: None,
            span: Span::DUMMY,
        }
    }

    pub fn method(
        owner: impl Into<String>,
        name: impl Into<String>,
        signature: Signature,
        body: Block,
    ) -> Self {
        FunctionDef {
            name: name.into(),
            owner: Some(owner.into()),
            signature,
            body: Some(body),
            span: Span::DUMMY,
        }
    }

    /// `Owner::name` for methods, `name` otherwise.
    pub fn qualified_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}::{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Everything a front end hands to the compiler for one program.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct TranslationUnit {
    pub structs: Vec<StructDecl>,
    pub globals: Vec<GlobalDecl>,
    pub functions: Vec<FunctionDef>,
}

impl TranslationUnit {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_struct(mut self, decl: StructDecl) -> Self {
        self.structs.push(decl);
        self
    }

    #[must_use]
    pub fn with_global(mut self, decl: GlobalDecl) -> Self {
        self.globals.push(decl);
        self
    }

    #[must_use]
    pub fn with_function(mut self, def: FunctionDef) -> Self {
        self.functions.push(def);
        self
    }
}
