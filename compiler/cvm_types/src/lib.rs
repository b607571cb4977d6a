//! Machine model and C type system for cvm.
//!
//! - [`MachineInfo`]: byte widths of the target plus the intrinsic functions
//!   the host provides, declared with C signature strings
//! - [`CType`]: resolved types whose sizes come from the machine model
//! - [`score_conversion`] / [`FunctionType::score_parameter_type_matches`]:
//!   the numeric scoring overload resolution ranks candidates by
//! - [`TypeRegistry`]: struct declarations, field layouts and per-struct
//!   method indexes
//!
//! The [`Host`] trait is the narrow window intrinsics get into a running
//! interpreter. It lives here rather than in the VM so that machine models
//! can be built without depending on the interpreter.

mod conversion;
mod ctype;
mod machine;
mod registry;

pub use conversion::{
    arithmetic_result_type, integer_promotion, is_explicit_conversion_allowed,
    score_conversion, SCORE_CONVERSION, SCORE_EXACT, SCORE_NONE, SCORE_PROMOTION,
};
pub use ctype::{BasicKind, BasicType, CType, FunctionType, Parameter};
pub use machine::{
    parse_signature, Host, HostError, InternalCallback, InternalFunction, MachineError,
    MachineInfo, SignatureError,
};
pub use registry::{StructId, StructMember, StructType, TypeError, TypeRegistry};
