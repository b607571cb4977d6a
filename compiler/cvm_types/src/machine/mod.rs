//! Target machine model.
//!
//! A [`MachineInfo`] fixes the byte width of every primitive type and lists
//! the intrinsic functions the host implements. The compiler derives every
//! size and every `Value` representation from it, so the same program can be
//! compiled for a 2-byte-int microcontroller or a 4-byte-int desktop.

use std::fmt;
use std::sync::Arc;

use cvm_ir::{Address, BasicTypeName, Signature, Value};

mod signature;

pub use signature::{parse_signature, SignatureError};

/// Failure raised by an intrinsic, or by the interpreter on its behalf.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error("argument {index} out of range ({count} arguments)")]
    ArgumentOutOfRange { index: usize, count: usize },
    #[error("invalid memory address 0x{0:04x}")]
    InvalidAddress(Address),
    #[error("assertion failed: expected {expected}, got {actual}")]
    AssertionFailed { expected: String, actual: String },
    #[error("{0}")]
    Custom(String),
}

/// What an intrinsic can see of the interpreter while it runs.
///
/// Arguments are the values popped for the call, in declaration order.
/// Intrinsics return results by pushing them; a non-void intrinsic must push
/// exactly one value.
pub trait Host {
    fn read_arg(&self, index: usize) -> Result<Value, HostError>;

    fn read_memory(&self, address: Address) -> Result<Value, HostError>;

    fn write_memory(&mut self, address: Address, value: Value) -> Result<(), HostError>;

    fn push(&mut self, value: Value);
}

/// Host implementation of an intrinsic.
pub type InternalCallback = Arc<dyn Fn(&mut dyn Host) -> Result<(), HostError> + Send + Sync>;

/// An intrinsic: a C declaration backed by a host callback.
#[derive(Clone)]
pub struct InternalFunction {
    pub name: String,
    pub signature: Signature,
    pub callback: InternalCallback,
}

impl fmt::Debug for InternalFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalFunction")
            .field("name", &self.name)
            .field("signature", &self.signature.to_string())
            .finish_non_exhaustive()
    }
}

/// A machine model the VM cannot represent.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MachineError {
    #[error("'{ty}' cannot be {size} bytes wide (expected one of 1, 2, 4, 8)")]
    IntegerWidth { ty: &'static str, size: u8 },
    #[error("'{ty}' cannot be {size} bytes wide (expected 4 or 8)")]
    FloatWidth { ty: &'static str, size: u8 },
    #[error("'{wider}' ({wider_size} bytes) is narrower than '{narrower}' ({narrower_size} bytes)")]
    Ordering {
        narrower: &'static str,
        narrower_size: u8,
        wider: &'static str,
        wider_size: u8,
    },
}

/// Byte widths of the target plus its intrinsics.
#[derive(Clone, Debug)]
pub struct MachineInfo {
    pub char_size: u8,
    pub short_int_size: u8,
    pub int_size: u8,
    pub long_int_size: u8,
    pub long_long_int_size: u8,
    pub float_size: u8,
    pub double_size: u8,
    pub long_double_size: u8,
    pub pointer_size: u8,
    internal_functions: Vec<InternalFunction>,
}

impl Default for MachineInfo {
    /// A 32-bit host-like target.
    fn default() -> Self {
        MachineInfo {
            char_size: 1,
            short_int_size: 2,
            int_size: 4,
            long_int_size: 4,
            long_long_int_size: 8,
            float_size: 4,
            double_size: 8,
            long_double_size: 8,
            pointer_size: 4,
            internal_functions: Vec::new(),
        }
    }
}

impl MachineInfo {
    /// An 8-bit AVR board: 2-byte `int`, 4-byte `double`, 2-byte pointers.
    pub fn arduino() -> Self {
        MachineInfo {
            char_size: 1,
            short_int_size: 2,
            int_size: 2,
            long_int_size: 4,
            long_long_int_size: 8,
            float_size: 4,
            double_size: 4,
            long_double_size: 4,
            pointer_size: 2,
            internal_functions: Vec::new(),
        }
    }

    /// Width in bytes of a primitive type keyword.
    pub fn size_of(&self, name: BasicTypeName) -> u8 {
        match name {
            BasicTypeName::Bool | BasicTypeName::Char => self.char_size,
            BasicTypeName::ShortInt => self.short_int_size,
            BasicTypeName::Int => self.int_size,
            BasicTypeName::LongInt => self.long_int_size,
            BasicTypeName::LongLongInt => self.long_long_int_size,
            BasicTypeName::Float => self.float_size,
            BasicTypeName::Double => self.double_size,
            BasicTypeName::LongDouble => self.long_double_size,
        }
    }

    /// Check that every width maps onto a VM cell and that integer widths
    /// do not shrink from `char` to `long long`.
    pub fn validate(&self) -> Result<(), MachineError> {
        let integers = [
            ("char", self.char_size),
            ("short", self.short_int_size),
            ("int", self.int_size),
            ("long", self.long_int_size),
            ("long long", self.long_long_int_size),
            ("void*", self.pointer_size),
        ];
        for (ty, size) in integers {
            if !matches!(size, 1 | 2 | 4 | 8) {
                return Err(MachineError::IntegerWidth { ty, size });
            }
        }
        for (ty, size) in [
            ("float", self.float_size),
            ("double", self.double_size),
            ("long double", self.long_double_size),
        ] {
            if !matches!(size, 4 | 8) {
                return Err(MachineError::FloatWidth { ty, size });
            }
        }
        for pair in integers[..5].windows(2) {
            let [(narrower, narrower_size), (wider, wider_size)] = [pair[0], pair[1]];
            if wider_size < narrower_size {
                return Err(MachineError::Ordering {
                    narrower,
                    narrower_size,
                    wider,
                    wider_size,
                });
            }
        }
        Ok(())
    }

    /// Declare an intrinsic.
    ///
    /// `signature` is a C declaration such as
    /// `"int memcmp (void* s1, void* s2, int n)"`. Declaring a name twice
    /// adds an overload.
    pub fn add_internal_function<F>(
        &mut self,
        signature: &str,
        callback: F,
    ) -> Result<(), SignatureError>
    where
        F: Fn(&mut dyn Host) -> Result<(), HostError> + Send + Sync + 'static,
    {
        let (name, signature) = parse_signature(signature)?;
        tracing::debug!(%name, %signature, "intrinsic declared");
        self.internal_functions.push(InternalFunction {
            name,
            signature,
            callback: Arc::new(callback),
        });
        Ok(())
    }

    pub fn internal_functions(&self) -> &[InternalFunction] {
        &self.internal_functions
    }
}

#[cfg(test)]
mod tests;
