//! Call expressions: overload resolution and call emission.
//!
//! Resolution depends on the shape of the call target:
//!
//! - `target.name(...)` / `ptr->name(...)`: the struct's methods named
//!   `name` are scored against the argument types and the best one wins
//!   (the first declared among equal scores)
//! - `name(...)`: resolved through [`EmitContext::resolve_variable`], which
//!   covers locals, `this` members, globals, functions and intrinsics
//! - anything else is called through its own value
//!
//! Each call node is resolved once; its type and its emission share the
//! result.
//!
//! Emission pushes the arguments (each converted to its parameter type),
//! the defaults of omitted parameters, the receiver for methods, the callee
//! address, then `Call`. A call to a `void` function pushes a 0 afterwards,
//! so every call expression nets exactly one stack slot.

use std::sync::Arc;

use cvm_diagnostic::{ErrorCode, ErrorGuaranteed};
use cvm_ir::{Address, Expr, ExprKind, Value};
use cvm_types::{CType, StructId};
use smallvec::SmallVec;

use super::{emit, emit_pointer, evaluated_type};
use crate::context::{node_key, pick_overload, Symbol};
use crate::{EmitContext, Instruction};

/// How the receiver of a method call is pushed.
#[derive(Copy, Clone, Debug)]
pub enum Receiver<'e> {
    /// `value.method()`: push the address of `value`.
    Address(&'e Expr),
    /// `pointer->method()`: push `pointer`.
    Pointer(&'e Expr),
    /// Implicit `this` inside a method body.
    This,
}

/// What pushing the callee involves.
#[derive(Copy, Clone, Debug)]
pub enum OverloadEmit<'e> {
    Method {
        receiver: Receiver<'e>,
        function: Address,
    },
    Function(Address),
    /// A function-pointer variable or field; its value is the callee.
    Variable(&'e Expr),
    Expression(&'e Expr),
    Nothing,
}

/// A resolved call target.
#[derive(Clone, Debug)]
pub struct Overload<'e> {
    pub ty: CType,
    pub emit: OverloadEmit<'e>,
}

impl<'e> Overload<'e> {
    /// Stands in for a target that failed to resolve: typed `int`, emits
    /// nothing.
    pub fn placeholder(ec: &EmitContext<'_>) -> Self {
        Overload {
            ty: ec.int_type(),
            emit: OverloadEmit::Nothing,
        }
    }

    fn callable(ty: CType, emit: OverloadEmit<'e>) -> Self {
        let ty = match ty.callable() {
            Some(f) => CType::Function(Arc::clone(f)),
            None => ty,
        };
        Overload { ty, emit }
    }

    /// Push the receiver (for methods) and the callee.
    pub fn emit(&self, ec: &mut EmitContext<'e>) {
        match self.emit {
            OverloadEmit::Method { receiver, function } => {
                match receiver {
                    Receiver::Address(target) => emit_pointer(target, ec),
                    Receiver::Pointer(target) => emit(target, ec),
                    Receiver::This => {
                        ec.emit(Instruction::LoadLocal(0));
                    }
                }
                ec.emit(Instruction::LoadConstant(Value::Pointer(function)));
            }
            OverloadEmit::Function(address) => {
                ec.emit(Instruction::LoadConstant(Value::Pointer(address)));
            }
            OverloadEmit::Variable(expr) | OverloadEmit::Expression(expr) => emit(expr, ec),
            OverloadEmit::Nothing => {}
        }
    }
}

/// Resolve what `function` calls given the argument types.
#[tracing::instrument(level = "trace", skip_all, fields(function = %function))]
pub fn resolve_overload<'e>(
    function: &'e Expr,
    arg_types: &[CType],
    ec: &mut EmitContext<'e>,
) -> Result<Overload<'e>, ErrorGuaranteed> {
    match &function.kind {
        ExprKind::Member { target, member } => {
            let target_ty = evaluated_type(target, ec);
            match target_ty.as_struct() {
                Some(owner) => resolve_method(
                    function,
                    owner.clone(),
                    member,
                    arg_types,
                    Receiver::Address(target),
                    ec,
                ),
                None => Err(invalid_receiver(target, ec)),
            }
        }
        ExprKind::Arrow { target, member } => {
            let target_ty = evaluated_type(target, ec);
            match target_ty.pointee().and_then(CType::as_struct) {
                Some(owner) => resolve_method(
                    function,
                    owner.clone(),
                    member,
                    arg_types,
                    Receiver::Pointer(target),
                    ec,
                ),
                None => Err(invalid_receiver(target, ec)),
            }
        }
        ExprKind::Variable(name) => {
            let symbol = ec.resolve_variable(name, Some(arg_types), function.span)?;
            Ok(match symbol {
                Symbol::Function { address, ty } => Overload {
                    ty: CType::Function(ty),
                    emit: OverloadEmit::Function(address),
                },
                Symbol::Method { address, ty } => Overload {
                    ty: CType::Function(ty),
                    emit: OverloadEmit::Method {
                        receiver: Receiver::This,
                        function: address,
                    },
                },
                other => Overload::callable(other.ty(), OverloadEmit::Variable(function)),
            })
        }
        ExprKind::Error => Ok(Overload::placeholder(ec)),
        _ => {
            let ty = evaluated_type(function, ec);
            Ok(Overload::callable(ty, OverloadEmit::Expression(function)))
        }
    }
}

fn resolve_method<'e>(
    function: &'e Expr,
    owner: StructId,
    member: &str,
    arg_types: &[CType],
    receiver: Receiver<'e>,
    ec: &mut EmitContext<'e>,
) -> Result<Overload<'e>, ErrorGuaranteed> {
    let registry = ec.registry();
    let Some(st) = registry.get(&owner) else {
        return Err(not_found(function, member, &owner, ec));
    };

    let candidates = st.methods_named(member);
    if candidates.is_empty() {
        // A function-pointer field is called through its value.
        if let Some((_, ty)) = st.field(member) {
            if ty.callable().is_some() {
                return Ok(Overload::callable(ty.clone(), OverloadEmit::Variable(function)));
            }
        }
        return Err(not_found(function, member, &owner, ec));
    }

    let Some(index) = pick_overload(candidates.iter().map(|f| Arc::as_ref(f)), arg_types) else {
        return Err(ec.mismatch(&function.to_string(), function.span));
    };
    let address = ec.resolve_method_function(&owner, member, index, function.span)?;
    tracing::debug!(%owner, member, index, address, "method overload selected");
    Ok(Overload {
        ty: CType::Function(Arc::clone(candidates[index])),
        emit: OverloadEmit::Method {
            receiver,
            function: address,
        },
    })
}

fn not_found(function: &Expr, member: &str, owner: &StructId, ec: &mut EmitContext<'_>) -> ErrorGuaranteed {
    ec.error(
        ErrorCode::E1061,
        function.span,
        format!("'{member}' not found in '{owner}'"),
    )
}

fn invalid_receiver(target: &Expr, ec: &mut EmitContext<'_>) -> ErrorGuaranteed {
    ec.error(
        ErrorCode::E0119,
        target.span,
        format!("'{target}' is not valid in the given context"),
    )
}

fn argument_types<'a>(arguments: &'a [Expr], ec: &mut EmitContext<'a>) -> SmallVec<[CType; 4]> {
    arguments.iter().map(|arg| evaluated_type(arg, ec)).collect()
}

/// What the call node `call` invokes.
fn call_overload<'a>(
    call: &'a Expr,
    function: &'a Expr,
    arguments: &'a [Expr],
    ec: &mut EmitContext<'a>,
) -> Result<Overload<'a>, ErrorGuaranteed> {
    let key = node_key(call);
    if let Some(overload) = ec.memo().calls.get(&key) {
        return overload.clone();
    }
    let arg_types = argument_types(arguments, ec);
    let overload = resolve_overload(function, &arg_types, ec);
    ec.memo().calls.insert(key, overload.clone());
    overload
}

/// Return type of the call, or `int` when the target does not resolve.
pub(super) fn call_type<'a>(
    call: &'a Expr,
    function: &'a Expr,
    arguments: &'a [Expr],
    ec: &mut EmitContext<'a>,
) -> CType {
    if function.is_error() {
        return ec.int_type();
    }
    let overload = call_overload(call, function, arguments, ec)
        .unwrap_or_else(|_| Overload::placeholder(ec));
    match overload.ty.callable() {
        Some(f) => f.return_type.clone(),
        None => ec.int_type(),
    }
}

pub(super) fn emit_call<'a>(
    call: &'a Expr,
    function: &'a Expr,
    arguments: &'a [Expr],
    ec: &mut EmitContext<'a>,
) {
    if function.is_error() {
        return;
    }
    let arg_types = argument_types(arguments, ec);
    // A failed resolution was reported when the node was first resolved.
    let Ok(overload) = call_overload(call, function, arguments, ec) else {
        return;
    };
    let Some(ty) = overload.ty.callable().cloned() else {
        ec.error(
            ErrorCode::E2064,
            call.span,
            format!(
                "'{function}' does not evaluate to a function taking {} arguments",
                arguments.len()
            ),
        );
        return;
    };

    let provided = arguments.len();
    let required = ty.required_count();
    if provided < required || provided > ty.parameters.len() {
        let expected = if provided < required {
            required
        } else {
            ty.parameters.len()
        };
        ec.error(
            ErrorCode::E1501,
            call.span,
            format!("'{function}' takes {expected} arguments, {provided} provided"),
        );
        return;
    }

    for ((arg, arg_ty), param) in arguments.iter().zip(&arg_types).zip(&ty.parameters) {
        emit(arg, ec);
        ec.emit_cast(arg_ty, &param.ty, arg.span);
    }
    for param in &ty.parameters[provided..] {
        let value = param.default.unwrap_or_else(|| {
            param
                .ty
                .value_kind()
                .map_or(Value::Int32(0), |kind| kind.zero())
        });
        ec.emit(Instruction::LoadConstant(value));
    }

    overload.emit(ec);
    let argc = u32::try_from(ty.parameters.len()).unwrap_or(u32::MAX);
    ec.emit(Instruction::Call(argc));

    if ty.return_type.is_void() {
        let zero = ec.int_kind().zero();
        ec.emit(Instruction::LoadConstant(zero));
    }
}
