//! Runtime values for the cvm virtual machine.
//!
//! A [`Value`] is a single memory cell or operand-stack slot. Every variant
//! carries an explicit width and signedness, so arithmetic never depends on
//! host integer sizes: the compiler picks the variant from the target's
//! machine model and the interpreter only ever combines equal variants.
//!
//! Conversions follow C: integers truncate or extend, floats truncate toward
//! zero when converted to integers, and pointers are plain unsigned addresses.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    reason = "C conversions truncate and reinterpret by definition"
)]

use std::fmt;
use std::hash::{Hash, Hasher};

/// Address of a cell in interpreter memory, or of a function in an executable.
pub type Address = u32;

/// A tagged numeric or pointer cell.
#[derive(Copy, Clone, Debug)]
pub enum Value {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Pointer(Address),
}

/// The payload-free tag of a [`Value`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Pointer,
}

impl ValueKind {
    /// Integer representation for a byte width and signedness.
    ///
    /// Returns `None` for widths the VM has no cell for (anything other
    /// than 1, 2, 4 or 8 bytes).
    pub fn integer(size: u8, signed: bool) -> Option<ValueKind> {
        let kind = match (size, signed) {
            (1, true) => ValueKind::Int8,
            (1, false) => ValueKind::UInt8,
            (2, true) => ValueKind::Int16,
            (2, false) => ValueKind::UInt16,
            (4, true) => ValueKind::Int32,
            (4, false) => ValueKind::UInt32,
            (8, true) => ValueKind::Int64,
            (8, false) => ValueKind::UInt64,
            _ => return None,
        };
        Some(kind)
    }

    /// Floating-point representation for a byte width.
    pub fn float(size: u8) -> Option<ValueKind> {
        match size {
            4 => Some(ValueKind::Float32),
            8 => Some(ValueKind::Float64),
            _ => None,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, ValueKind::Float32 | ValueKind::Float64)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            ValueKind::Int8
                | ValueKind::Int16
                | ValueKind::Int32
                | ValueKind::Int64
                | ValueKind::Float32
                | ValueKind::Float64
        )
    }

    /// The zero value of this representation.
    pub fn zero(self) -> Value {
        Value::from_bits(self, 0)
    }
}

impl Value {
    /// Null pointer.
    pub const NULL: Value = Value::Pointer(0);

    #[inline]
    pub const fn pointer(address: Address) -> Self {
        Value::Pointer(address)
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int8(_) => ValueKind::Int8,
            Value::UInt8(_) => ValueKind::UInt8,
            Value::Int16(_) => ValueKind::Int16,
            Value::UInt16(_) => ValueKind::UInt16,
            Value::Int32(_) => ValueKind::Int32,
            Value::UInt32(_) => ValueKind::UInt32,
            Value::Int64(_) => ValueKind::Int64,
            Value::UInt64(_) => ValueKind::UInt64,
            Value::Float32(_) => ValueKind::Float32,
            Value::Float64(_) => ValueKind::Float64,
            Value::Pointer(_) => ValueKind::Pointer,
        }
    }

    /// The value as a signed 64-bit integer (floats truncate toward zero).
    pub fn as_i64(self) -> i64 {
        match self {
            Value::Int8(v) => v as i64,
            Value::UInt8(v) => v as i64,
            Value::Int16(v) => v as i64,
            Value::UInt16(v) => v as i64,
            Value::Int32(v) => v as i64,
            Value::UInt32(v) => v as i64,
            Value::Int64(v) => v,
            Value::UInt64(v) => v as i64,
            Value::Float32(v) => v as i64,
            Value::Float64(v) => v as i64,
            Value::Pointer(v) => v as i64,
        }
    }

    /// The value as an unsigned 64-bit integer; signed values sign-extend.
    pub fn as_u64(self) -> u64 {
        match self {
            Value::UInt8(v) => v as u64,
            Value::UInt16(v) => v as u64,
            Value::UInt32(v) => v as u64,
            Value::UInt64(v) => v,
            Value::Pointer(v) => v as u64,
            other => other.as_i64() as u64,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Value::Float32(v) => v as f64,
            Value::Float64(v) => v,
            Value::UInt8(_) | Value::UInt16(_) | Value::UInt32(_) | Value::UInt64(_) => {
                self.as_u64() as f64
            }
            Value::Pointer(v) => v as f64,
            other => other.as_i64() as f64,
        }
    }

    /// The value interpreted as an address (truncated to the address width).
    pub fn as_pointer(self) -> Address {
        self.as_u64() as Address
    }

    /// C truthiness: anything other than zero.
    pub fn is_truthy(self) -> bool {
        match self {
            Value::Float32(v) => v != 0.0,
            Value::Float64(v) => v != 0.0,
            other => other.as_u64() != 0,
        }
    }

    /// Convert to another representation with C cast semantics.
    #[must_use]
    pub fn convert(self, kind: ValueKind) -> Value {
        if self.kind() == kind {
            return self;
        }
        match kind {
            ValueKind::Float32 => Value::Float32(self.as_f64() as f32),
            ValueKind::Float64 => Value::Float64(self.as_f64()),
            ValueKind::Pointer => Value::Pointer(self.as_pointer()),
            integer => Value::from_bits(integer, self.as_i64() as u64),
        }
    }

    /// Reinterpret raw bits as a value of `kind`, keeping only the low bits
    /// that fit the representation.
    pub fn from_bits(kind: ValueKind, bits: u64) -> Value {
        match kind {
            ValueKind::Int8 => Value::Int8(bits as u8 as i8),
            ValueKind::UInt8 => Value::UInt8(bits as u8),
            ValueKind::Int16 => Value::Int16(bits as u16 as i16),
            ValueKind::UInt16 => Value::UInt16(bits as u16),
            ValueKind::Int32 => Value::Int32(bits as u32 as i32),
            ValueKind::UInt32 => Value::UInt32(bits as u32),
            ValueKind::Int64 => Value::Int64(bits as i64),
            ValueKind::UInt64 => Value::UInt64(bits),
            ValueKind::Float32 => Value::Float32(f32::from_bits(bits as u32)),
            ValueKind::Float64 => Value::Float64(f64::from_bits(bits)),
            ValueKind::Pointer => Value::Pointer(bits as Address),
        }
    }

    /// Raw bits of the value, zero-extended to 64 bits.
    pub fn to_bits(self) -> u64 {
        match self {
            Value::Int8(v) => v as u8 as u64,
            Value::UInt8(v) => v as u64,
            Value::Int16(v) => v as u16 as u64,
            Value::UInt16(v) => v as u64,
            Value::Int32(v) => v as u32 as u64,
            Value::UInt32(v) => v as u64,
            Value::Int64(v) => v as u64,
            Value::UInt64(v) => v,
            Value::Float32(v) => v.to_bits() as u64,
            Value::Float64(v) => v.to_bits(),
            Value::Pointer(v) => v as u64,
        }
    }
}

// Identity is (representation, bits): NaN equals itself and 0.0 differs
// from -0.0, which keeps `Eq` and `Hash` lawful for constant tables.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.to_bits() == other.to_bits()
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.to_bits().hash(state);
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Int32(0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int8(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Pointer(v) => write!(f, "0x{v:04x}"),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($prim:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$prim> for Value {
                #[inline]
                fn from(v: $prim) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_primitive! {
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::UInt8(u8::from(v))
    }
}

#[cfg(test)]
mod tests;
