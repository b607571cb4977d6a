//! Type syntax as written in source.

use std::fmt;

/// Whether an integer type is signed.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// Primitive type keywords.
///
/// Widths are not known here; `cvm_types` maps each keyword to a byte size
/// through the machine model.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BasicTypeName {
    Bool,
    Char,
    ShortInt,
    Int,
    LongInt,
    LongLongInt,
    Float,
    Double,
    LongDouble,
}

impl BasicTypeName {
    pub fn as_str(self) -> &'static str {
        match self {
            BasicTypeName::Bool => "bool",
            BasicTypeName::Char => "char",
            BasicTypeName::ShortInt => "short",
            BasicTypeName::Int => "int",
            BasicTypeName::LongInt => "long",
            BasicTypeName::LongLongInt => "long long",
            BasicTypeName::Float => "float",
            BasicTypeName::Double => "double",
            BasicTypeName::LongDouble => "long double",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            BasicTypeName::Float | BasicTypeName::Double | BasicTypeName::LongDouble
        )
    }
}

/// A type as written in a declaration or cast.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeName {
    Void,
    Basic {
        name: BasicTypeName,
        signedness: Signedness,
    },
    Pointer(Box<TypeName>),
    Struct(String),
    /// A function type; variables and fields hold pointers to one.
    Function {
        return_type: Box<TypeName>,
        params: Vec<TypeName>,
    },
}

impl TypeName {
    pub fn signed(name: BasicTypeName) -> Self {
        TypeName::Basic {
            name,
            signedness: Signedness::Signed,
        }
    }

    pub fn unsigned(name: BasicTypeName) -> Self {
        TypeName::Basic {
            name,
            signedness: Signedness::Unsigned,
        }
    }

    pub fn int() -> Self {
        Self::signed(BasicTypeName::Int)
    }

    pub fn char() -> Self {
        Self::signed(BasicTypeName::Char)
    }

    pub fn bool() -> Self {
        Self::unsigned(BasicTypeName::Bool)
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeName::Struct(name.into())
    }

    /// Function returning `return_type`; `.pointer()` makes the
    /// function-pointer type `return_type (*)(params)`.
    pub fn function(return_type: TypeName, params: Vec<TypeName>) -> Self {
        TypeName::Function {
            return_type: Box::new(return_type),
            params,
        }
    }

    /// Pointer to this type.
    #[must_use]
    pub fn pointer(self) -> Self {
        TypeName::Pointer(Box::new(self))
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Void => write!(f, "void"),
            TypeName::Basic {
                name,
                signedness: Signedness::Unsigned,
            } if *name != BasicTypeName::Bool => write!(f, "unsigned {}", name.as_str()),
            TypeName::Basic { name, .. } => write!(f, "{}", name.as_str()),
            TypeName::Pointer(inner) => write!(f, "{inner}*"),
            TypeName::Struct(name) => write!(f, "{name}"),
            TypeName::Function {
                return_type,
                params,
            } => {
                write!(f, "{return_type} (")?;
                let mut head = "";
                for param in params {
                    write!(f, "{head}{param}")?;
                    head = ", ";
                }
                write!(f, ")")
            }
        }
    }
}
