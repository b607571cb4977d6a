//! Resolved C types.
//!
//! Unlike [`TypeName`](cvm_ir::TypeName), a [`CType`] knows its width: basic
//! types carry the byte size the machine model assigned them. Identity is
//! structural (kind, signedness, size), so on a target where `int` and
//! `short` are both two bytes wide they are the same type; the keyword is
//! kept only for display.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use cvm_ir::{BasicTypeName, Signedness, Value, ValueKind};

use crate::conversion::score_conversion;
use crate::{MachineInfo, StructId};

/// Category of a basic type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BasicKind {
    Bool,
    Integer,
    Float,
}

/// A primitive type with its target width.
#[derive(Copy, Clone, Debug)]
pub struct BasicType {
    /// Keyword as written; display only.
    pub name: BasicTypeName,
    pub signedness: Signedness,
    pub size: u8,
}

impl BasicType {
    pub fn new(name: BasicTypeName, signedness: Signedness, machine: &MachineInfo) -> Self {
        let signedness = match name {
            BasicTypeName::Bool => Signedness::Unsigned,
            n if n.is_float() => Signedness::Signed,
            _ => signedness,
        };
        BasicType {
            name,
            signedness,
            size: machine.size_of(name),
        }
    }

    pub fn kind(&self) -> BasicKind {
        match self.name {
            BasicTypeName::Bool => BasicKind::Bool,
            n if n.is_float() => BasicKind::Float,
            _ => BasicKind::Integer,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signedness == Signedness::Signed
    }

    /// Runtime representation.
    pub fn value_kind(&self) -> ValueKind {
        let kind = match self.kind() {
            BasicKind::Float => ValueKind::float(self.size),
            BasicKind::Bool | BasicKind::Integer => ValueKind::integer(self.size, self.is_signed()),
        };
        // Only reachable with a machine model that failed `validate`.
        kind.unwrap_or(ValueKind::Int64)
    }

    /// Same kind and size with the other signedness.
    #[must_use]
    pub fn with_signedness(mut self, signedness: Signedness) -> Self {
        if self.kind() == BasicKind::Integer {
            self.signedness = signedness;
        }
        self
    }
}

impl PartialEq for BasicType {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind()
            && self.signedness == other.signedness
            && self.size == other.size
    }
}

impl Eq for BasicType {}

impl Hash for BasicType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.signedness.hash(state);
        self.size.hash(state);
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind() == BasicKind::Integer && !self.is_signed() {
            write!(f, "unsigned ")?;
        }
        write!(f, "{}", self.name.as_str())
    }
}

/// A parameter of a function type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub name: String,
    pub ty: CType,
    /// Already converted to the parameter's representation.
    pub default: Option<Value>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: CType) -> Self {
        Parameter {
            name: name.into(),
            ty,
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(match self.ty.value_kind() {
            Some(kind) => value.convert(kind),
            None => value,
        });
        self
    }
}

/// Signature of a function or method.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub return_type: CType,
    pub parameters: Vec<Parameter>,
    /// Methods take their receiver implicitly in slot 0.
    pub is_instance: bool,
}

impl FunctionType {
    pub fn new(return_type: CType, parameters: Vec<Parameter>) -> Self {
        FunctionType {
            return_type,
            parameters,
            is_instance: false,
        }
    }

    #[must_use]
    pub fn into_instance(mut self) -> Self {
        self.is_instance = true;
        self
    }

    /// Number of parameters before the first defaulted one.
    ///
    /// Omitted arguments always form a suffix, so a default that precedes a
    /// parameter without one can never be used.
    pub fn required_count(&self) -> usize {
        self.parameters
            .iter()
            .position(|p| p.default.is_some())
            .unwrap_or(self.parameters.len())
    }

    /// How well `arg_types` fit this signature; 0 means not callable.
    ///
    /// Any callable match scores at least 1, plus the conversion score of
    /// each supplied argument against its parameter. Omitted defaulted
    /// parameters add nothing.
    pub fn score_parameter_type_matches(&self, arg_types: &[CType]) -> u32 {
        if arg_types.len() > self.parameters.len() || arg_types.len() < self.required_count() {
            return 0;
        }
        let mut score = 1;
        for (arg, param) in arg_types.iter().zip(&self.parameters) {
            let s = score_conversion(arg, &param.ty);
            if s == 0 {
                return 0;
            }
            score += s;
        }
        score
    }

    /// Whether a pointer to one can hold the other: same return type,
    /// parameter types and receiver. Names and defaults do not matter.
    pub fn same_signature(&self, other: &FunctionType) -> bool {
        self.return_type == other.return_type
            && self.is_instance == other.is_instance
            && self.same_parameter_types(other)
    }

    /// Whether both declare the same parameter types, ignoring names,
    /// defaults and return type.
    pub fn same_parameter_types(&self, other: &FunctionType) -> bool {
        self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| a.ty == b.ty)
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.return_type)?;
        let mut head = "";
        for p in &self.parameters {
            write!(f, "{head}{}", p.ty)?;
            head = ", ";
        }
        write!(f, ")")
    }
}

/// A resolved C type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CType {
    Void,
    Basic(BasicType),
    Pointer(Box<CType>),
    Function(Arc<FunctionType>),
    Struct(StructId),
}

impl CType {
    pub fn basic(name: BasicTypeName, signedness: Signedness, machine: &MachineInfo) -> Self {
        CType::Basic(BasicType::new(name, signedness, machine))
    }

    /// `signed int`, the type of placeholders and comparisons.
    pub fn int(machine: &MachineInfo) -> Self {
        Self::basic(BasicTypeName::Int, Signedness::Signed, machine)
    }

    pub fn char(machine: &MachineInfo) -> Self {
        Self::basic(BasicTypeName::Char, Signedness::Signed, machine)
    }

    pub fn bool(machine: &MachineInfo) -> Self {
        Self::basic(BasicTypeName::Bool, Signedness::Unsigned, machine)
    }

    pub fn double(machine: &MachineInfo) -> Self {
        Self::basic(BasicTypeName::Double, Signedness::Signed, machine)
    }

    pub fn void_pointer() -> Self {
        CType::Void.pointer_to()
    }

    #[must_use]
    pub fn pointer_to(self) -> Self {
        CType::Pointer(Box::new(self))
    }

    pub fn function(ty: FunctionType) -> Self {
        CType::Function(Arc::new(ty))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, CType::Void)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, CType::Pointer(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, CType::Struct(_))
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, CType::Basic(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, CType::Basic(b) if b.kind() != BasicKind::Float)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, CType::Basic(b) if b.kind() == BasicKind::Float)
    }

    /// Fits in one cell and can be tested for truth.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            CType::Basic(_) | CType::Pointer(_) | CType::Function(_)
        )
    }

    pub fn as_basic(&self) -> Option<BasicType> {
        match self {
            CType::Basic(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructId> {
        match self {
            CType::Struct(id) => Some(id),
            _ => None,
        }
    }

    pub fn pointee(&self) -> Option<&CType> {
        match self {
            CType::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    /// The function type this value can be called as: a function itself or
    /// a pointer to one.
    pub fn callable(&self) -> Option<&Arc<FunctionType>> {
        match self {
            CType::Function(f) => Some(f),
            CType::Pointer(inner) => match inner.as_ref() {
                CType::Function(f) => Some(f),
                _ => None,
            },
            _ => None,
        }
    }

    /// Runtime representation of a value of this type; `None` for `void`
    /// and structs, which have no single cell.
    pub fn value_kind(&self) -> Option<ValueKind> {
        match self {
            CType::Basic(b) => Some(b.value_kind()),
            CType::Pointer(_) | CType::Function(_) => Some(ValueKind::Pointer),
            CType::Void | CType::Struct(_) => None,
        }
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CType::Void => write!(f, "void"),
            CType::Basic(b) => write!(f, "{b}"),
            CType::Pointer(inner) => write!(f, "{inner}*"),
            CType::Function(ft) => write!(f, "{ft}"),
            CType::Struct(id) => write!(f, "{id}"),
        }
    }
}
