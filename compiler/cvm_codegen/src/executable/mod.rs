//! Compiled programs.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use cvm_ir::{Address, ValueKind};
use cvm_types::{FunctionType, InternalCallback};

use crate::Instruction;

/// Name of the synthesised function that runs global initialisers.
pub const INIT_FUNCTION: &str = "__cinit";

/// Bytecode of one function plus the layout of its frame.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledFunction {
    pub code: Vec<Instruction>,
    /// Representation of every frame cell: the receiver (for methods), the
    /// parameters, then locals. Frames are zero-initialised from this.
    pub frame: Vec<ValueKind>,
}

#[derive(Clone)]
pub enum FunctionBody {
    Compiled(CompiledFunction),
    Internal(InternalCallback),
}

impl fmt::Debug for FunctionBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionBody::Compiled(c) => f.debug_tuple("Compiled").field(c).finish(),
            FunctionBody::Internal(_) => f.write_str("Internal"),
        }
    }
}

/// An entry of the function table; its index is the function's address.
#[derive(Clone, Debug)]
pub struct Function {
    /// `name` or `Owner::name`.
    pub name: String,
    pub ty: Arc<FunctionType>,
    pub body: FunctionBody,
}

impl Function {
    pub fn compiled(&self) -> Option<&CompiledFunction> {
        match &self.body {
            FunctionBody::Compiled(c) => Some(c),
            FunctionBody::Internal(_) => None,
        }
    }
}

/// Everything the interpreter needs to run a program.
#[derive(Clone, Debug)]
pub struct Executable {
    pub(crate) functions: Vec<Function>,
    /// Kinds of the global cells. Cell 0 is reserved so that no object lives
    /// at the null address.
    pub(crate) globals: Vec<ValueKind>,
    pub(crate) init: Address,
    pub(crate) int_kind: ValueKind,
    /// Byte width of a data pointer on the target.
    pub(crate) pointer_size: u8,
}

impl Executable {
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn function(&self, address: Address) -> Option<&Function> {
        self.functions.get(address as usize)
    }

    /// Address of the first function named `name`.
    pub fn find_function(&self, name: &str) -> Option<Address> {
        self.functions
            .iter()
            .position(|f| f.name == name)
            .and_then(|i| Address::try_from(i).ok())
    }

    pub fn globals(&self) -> &[ValueKind] {
        &self.globals
    }

    /// Address of the global-initialiser function.
    pub fn init_function(&self) -> Address {
        self.init
    }

    /// Representation of `int` on the target; comparisons produce it.
    pub fn int_kind(&self) -> ValueKind {
        self.int_kind
    }

    /// Byte width of a data pointer; pointer arithmetic wraps at this width.
    pub fn pointer_size(&self) -> u8 {
        self.pointer_size
    }

    /// Human-readable listing of every compiled function.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for (address, function) in self.functions.iter().enumerate() {
            let _ = writeln!(out, "{address:04x} {} : {}", function.name, function.ty);
            match &function.body {
                FunctionBody::Compiled(c) => {
                    for (i, instruction) in c.code.iter().enumerate() {
                        let _ = writeln!(out, "    {i:4}  {instruction}");
                    }
                }
                FunctionBody::Internal(_) => {
                    let _ = writeln!(out, "    <internal>");
                }
            }
        }
        out
    }
}
