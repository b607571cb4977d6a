//! The emission context threaded through expression and statement emission.
//!
//! One `EmitContext` lives for a whole compilation unit. It borrows the
//! machine model, struct registry and unit-level symbol table, owns the code
//! buffer and scopes of the function being emitted, and memoises which
//! address each struct method overload resolved to. Expression nodes are
//! typed and resolved once each; later queries read the [`NodeMemo`].

use std::sync::Arc;

use cvm_diagnostic::{ErrorCode, ErrorGuaranteed, Report};
use cvm_ir::{Address, Expr, Span, TypeName, ValueKind};
use cvm_types::{
    score_conversion, BasicKind, CType, FunctionType, MachineInfo, StructId, StructMember,
    TypeRegistry,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::expr::Overload;
use crate::{CompiledFunction, Instruction};

/// A global variable.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalSymbol {
    pub address: Address,
    pub ty: CType,
}

/// One overload of a free function or intrinsic. Prototypes that never get
/// a body have no address.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionSymbol {
    pub ty: Arc<FunctionType>,
    pub address: Option<Address>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub owner: StructId,
    pub name: String,
}

/// Unit-level names: globals, free functions and method bodies.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    globals: FxHashMap<String, GlobalSymbol>,
    functions: FxHashMap<String, SmallVec<[FunctionSymbol; 2]>>,
    methods: FxHashMap<MethodKey, SmallVec<[(Arc<FunctionType>, Address); 2]>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the name is already a global.
    pub fn add_global(&mut self, name: &str, symbol: GlobalSymbol) -> bool {
        if self.globals.contains_key(name) {
            return false;
        }
        self.globals.insert(name.to_owned(), symbol);
        true
    }

    pub fn global(&self, name: &str) -> Option<&GlobalSymbol> {
        self.globals.get(name)
    }

    /// Overloads of `name` in declaration order.
    pub fn functions_named(&self, name: &str) -> &[FunctionSymbol] {
        self.functions.get(name).map_or(&[], |set| set.as_slice())
    }

    pub(crate) fn overloads_mut(&mut self, name: &str) -> &mut SmallVec<[FunctionSymbol; 2]> {
        self.functions.entry(name.to_owned()).or_default()
    }

    /// Record the body of `owner::name` with type `ty`.
    pub fn add_method(&mut self, owner: StructId, name: &str, ty: Arc<FunctionType>, address: Address) {
        self.methods
            .entry(MethodKey {
                owner,
                name: name.to_owned(),
            })
            .or_default()
            .push((ty, address));
    }

    /// Address of the body defined for a declared method.
    pub fn method_definition(&self, key: &MethodKey, declared: &FunctionType) -> Option<Address> {
        self.methods
            .get(key)?
            .iter()
            .find(|(ty, _)| ty.same_parameter_types(declared))
            .map(|(_, address)| *address)
    }
}

/// What a name resolved to.
#[derive(Clone, Debug, PartialEq)]
pub enum Symbol {
    Local { slot: u32, ty: CType },
    Global { address: Address, ty: CType },
    /// Field of `this` inside a method body.
    Field { offset: u32, ty: CType },
    Function { address: Address, ty: Arc<FunctionType> },
    /// Method of `this` inside a method body.
    Method { address: Address, ty: Arc<FunctionType> },
}

impl Symbol {
    pub fn ty(&self) -> CType {
        match self {
            Symbol::Local { ty, .. } | Symbol::Global { ty, .. } | Symbol::Field { ty, .. } => {
                ty.clone()
            }
            Symbol::Function { ty, .. } | Symbol::Method { ty, .. } => {
                CType::Function(Arc::clone(ty))
            }
        }
    }
}

#[derive(Clone, Debug)]
struct LocalSymbol {
    slot: u32,
    ty: CType,
}

#[derive(Debug)]
struct FunctionState {
    name: String,
    return_type: CType,
    owner: Option<StructId>,
    code: Vec<Instruction>,
    frame: Vec<ValueKind>,
    scopes: Vec<FxHashMap<String, LocalSymbol>>,
}

impl Default for FunctionState {
    fn default() -> Self {
        FunctionState {
            name: String::new(),
            return_type: CType::Void,
            owner: None,
            code: Vec::new(),
            frame: Vec::new(),
            scopes: vec![FxHashMap::default()],
        }
    }
}

/// Index of the best-scoring candidate for `arg_types`.
///
/// Candidates scoring 0 are discarded; among equal scores the first
/// declared wins.
pub fn pick_overload<'f>(
    candidates: impl IntoIterator<Item = &'f FunctionType>,
    arg_types: &[CType],
) -> Option<usize> {
    let mut scored: SmallVec<[(usize, u32); 4]> = candidates
        .into_iter()
        .enumerate()
        .map(|(i, f)| (i, f.score_parameter_type_matches(arg_types)))
        .filter(|&(_, score)| score > 0)
        .collect();
    // Stable, so ties keep declaration order.
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    tracing::trace!(?scored, "overload candidates scored");
    scored.first().map(|&(index, _)| index)
}

/// Key of an expression node in a [`NodeMemo`].
pub(crate) fn node_key(expr: &Expr) -> *const Expr {
    std::ptr::from_ref(expr)
}

/// Per-node results of typing and resolution.
///
/// Keys are node addresses. Every node queried through an
/// `EmitContext<'a>` is borrowed for `'a`, so no address is reused while
/// the memo lives.
#[derive(Default)]
pub(crate) struct NodeMemo<'a> {
    pub(crate) types: FxHashMap<*const Expr, CType>,
    /// Variables that are read or assigned, not called.
    pub(crate) names: FxHashMap<*const Expr, Result<Symbol, ErrorGuaranteed>>,
    /// Cell offset and type of member accesses.
    pub(crate) fields: FxHashMap<*const Expr, Result<(u32, CType), ErrorGuaranteed>>,
    /// Call targets, keyed by the call node.
    pub(crate) calls: FxHashMap<*const Expr, Result<Overload<'a>, ErrorGuaranteed>>,
}

pub struct EmitContext<'a> {
    machine: &'a MachineInfo,
    registry: &'a TypeRegistry,
    symbols: &'a SymbolTable,
    report: &'a mut Report,
    method_addresses: FxHashMap<(MethodKey, usize), Address>,
    memo: NodeMemo<'a>,
    function: FunctionState,
}

impl<'a> EmitContext<'a> {
    pub fn new(
        machine: &'a MachineInfo,
        registry: &'a TypeRegistry,
        symbols: &'a SymbolTable,
        report: &'a mut Report,
    ) -> Self {
        EmitContext {
            machine,
            registry,
            symbols,
            report,
            method_addresses: FxHashMap::default(),
            memo: NodeMemo::default(),
            function: FunctionState::default(),
        }
    }

    pub fn machine(&self) -> &'a MachineInfo {
        self.machine
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    pub fn report(&mut self) -> &mut Report {
        self.report
    }

    pub(crate) fn memo(&mut self) -> &mut NodeMemo<'a> {
        &mut self.memo
    }

    pub fn error(&mut self, code: ErrorCode, span: Span, message: impl Into<String>) -> ErrorGuaranteed {
        self.report.error(code, span, message)
    }

    /// `signed int`; also the type substituted for anything that failed to
    /// type-check.
    pub fn int_type(&self) -> CType {
        CType::int(self.machine)
    }

    pub fn int_kind(&self) -> ValueKind {
        self.int_type().value_kind().unwrap_or(ValueKind::Int32)
    }

    /// Resolve written type syntax, reporting E0246 for unknown names.
    pub fn resolve_type(&mut self, name: &TypeName, span: Span) -> CType {
        match self.registry.resolve(name, self.machine) {
            Ok(ty) => ty,
            Err(err) => {
                self.report.error(ErrorCode::E0246, span, err.to_string());
                self.int_type()
            }
        }
    }

    /// Representation of every cell a value of `ty` occupies.
    pub fn cell_kinds(&self, ty: &CType) -> Vec<ValueKind> {
        cell_kinds(self.registry, ty)
    }

    // Function state

    /// Start emitting a function. Methods get `this` in slot 0, then every
    /// parameter takes one slot.
    pub fn begin_function(
        &mut self,
        name: impl Into<String>,
        ty: &FunctionType,
        owner: Option<StructId>,
        span: Span,
    ) {
        self.function = FunctionState {
            name: name.into(),
            return_type: ty.return_type.clone(),
            owner,
            code: Vec::new(),
            frame: Vec::new(),
            scopes: vec![FxHashMap::default()],
        };
        if ty.is_instance {
            self.function.frame.push(ValueKind::Pointer);
        }
        for param in &ty.parameters {
            self.declare_local(&param.name, param.ty.clone(), span);
        }
    }

    pub fn finish_function(&mut self) -> CompiledFunction {
        let state = std::mem::take(&mut self.function);
        CompiledFunction {
            code: state.code,
            frame: state.frame,
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function.name
    }

    pub fn return_type(&self) -> &CType {
        &self.function.return_type
    }

    /// Struct whose method is being emitted.
    pub fn owner(&self) -> Option<&StructId> {
        self.function.owner.as_ref()
    }

    pub fn push_scope(&mut self) {
        self.function.scopes.push(FxHashMap::default());
    }

    pub fn pop_scope(&mut self) {
        self.function.scopes.pop();
    }

    /// Allocate frame cells for a local; reports E0128 when the innermost
    /// scope already has `name`.
    pub fn declare_local(&mut self, name: &str, ty: CType, span: Span) -> u32 {
        let slot = u32::try_from(self.function.frame.len()).unwrap_or(u32::MAX);
        let mut kinds = self.cell_kinds(&ty);
        if kinds.is_empty() {
            kinds.push(self.int_kind());
        }
        self.function.frame.extend(kinds);

        let duplicate = self
            .function
            .scopes
            .last()
            .is_some_and(|scope| scope.contains_key(name));
        if duplicate {
            self.report.error(
                ErrorCode::E0128,
                span,
                format!("A local variable named '{name}' is already defined in this scope"),
            );
        }
        if let Some(scope) = self.function.scopes.last_mut() {
            scope.insert(name.to_owned(), LocalSymbol { slot, ty });
        }
        slot
    }

    // Code buffer

    /// Append an instruction, returning its index.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        self.function.code.push(instruction);
        self.function.code.len() - 1
    }

    /// Index the next emitted instruction will get.
    pub fn next_index(&self) -> usize {
        self.function.code.len()
    }

    /// Point the jump at `at` to `target`.
    pub fn patch(&mut self, at: usize, target: usize) {
        match self.function.code.get_mut(at) {
            Some(Instruction::Jump(t) | Instruction::BranchIfFalse(t)) => *t = target,
            other => tracing::debug!(?other, at, "patch target is not a jump"),
        }
    }

    pub fn code(&self) -> &[Instruction] {
        &self.function.code
    }

    // Conversions

    /// Implicit conversion of a value of type `from` on the stack to `to`.
    /// Reports E0030 when no implicit conversion exists.
    pub fn emit_cast(&mut self, from: &CType, to: &CType, span: Span) {
        if score_conversion(from, to) == 0 {
            self.report.error(
                ErrorCode::E0030,
                span,
                format!("Cannot convert type '{from}' to '{to}'"),
            );
            return;
        }
        self.emit_conversion(from, to);
    }

    /// Convert the value on the stack without checking that the conversion
    /// is implicit; explicit casts and arithmetic use this.
    pub fn emit_conversion(&mut self, from: &CType, to: &CType) {
        if from == to || to.is_void() {
            return;
        }
        let (Some(from_kind), Some(to_kind)) = (from.value_kind(), to.value_kind()) else {
            return;
        };
        let to_bool = matches!(to, CType::Basic(b) if b.kind() == BasicKind::Bool);
        let from_bool = matches!(from, CType::Basic(b) if b.kind() == BasicKind::Bool);
        if to_bool && !from_bool {
            // Truth value, not truncation.
            self.emit(Instruction::LoadConstant(from_kind.zero()));
            self.emit(Instruction::Ne);
            if self.int_kind() != to_kind {
                self.emit(Instruction::Convert(to_kind));
            }
            return;
        }
        if from_kind != to_kind {
            self.emit(Instruction::Convert(to_kind));
        }
    }

    // Name resolution

    /// Resolve a bare name.
    ///
    /// Looks in the local scopes, then (inside a method) the fields and
    /// methods of `this`, then globals, then free functions and intrinsics.
    /// `arg_types` is given when the name is being called; overloaded
    /// methods and function sets are then ranked by
    /// [`pick_overload`]. A free function with a single overload is taken
    /// as is, so the call reports arity and conversion problems itself.
    pub fn resolve_variable(
        &mut self,
        name: &str,
        arg_types: Option<&[CType]>,
        span: Span,
    ) -> Result<Symbol, ErrorGuaranteed> {
        for scope in self.function.scopes.iter().rev() {
            if let Some(local) = scope.get(name) {
                return Ok(Symbol::Local {
                    slot: local.slot,
                    ty: local.ty.clone(),
                });
            }
        }

        let registry = self.registry;
        if let Some(owner) = self.function.owner.clone() {
            if let Some(st) = registry.get(&owner) {
                if let Some((offset, ty)) = st.field(name) {
                    return Ok(Symbol::Field {
                        offset,
                        ty: ty.clone(),
                    });
                }
                let candidates = st.methods_named(name);
                if !candidates.is_empty() {
                    let index = match arg_types {
                        Some(args) => pick_overload(candidates.iter().map(|f| Arc::as_ref(f)), args),
                        None => Some(0),
                    };
                    let Some(index) = index else {
                        return Err(self.mismatch(name, span));
                    };
                    let ty = Arc::clone(candidates[index]);
                    let address = self.resolve_method_function(&owner, name, index, span)?;
                    return Ok(Symbol::Method { address, ty });
                }
            }
        }

        let symbols = self.symbols;
        if let Some(global) = symbols.global(name) {
            return Ok(Symbol::Global {
                address: global.address,
                ty: global.ty.clone(),
            });
        }

        let overloads = symbols.functions_named(name);
        if !overloads.is_empty() {
            let index = match arg_types {
                Some(args) if overloads.len() > 1 => {
                    pick_overload(overloads.iter().map(|f| &*f.ty), args)
                }
                _ => Some(0),
            };
            let Some(index) = index else {
                return Err(self.mismatch(name, span));
            };
            let symbol = &overloads[index];
            let Some(address) = symbol.address else {
                return Err(self.report.error(
                    ErrorCode::E2019,
                    span,
                    format!("'{name}' is declared but never defined"),
                ));
            };
            tracing::debug!(name, address, "resolved function");
            return Ok(Symbol::Function {
                address,
                ty: Arc::clone(&symbol.ty),
            });
        }

        Err(self.report.error(
            ErrorCode::E0103,
            span,
            format!("The name '{name}' does not exist in the current context"),
        ))
    }

    /// Address of the body of overload `overload` of `owner::name`.
    ///
    /// Results are cached per unit. A method that is declared in its struct
    /// but never defined reports E2019 here.
    pub fn resolve_method_function(
        &mut self,
        owner: &StructId,
        name: &str,
        overload: usize,
        span: Span,
    ) -> Result<Address, ErrorGuaranteed> {
        let key = (
            MethodKey {
                owner: owner.clone(),
                name: name.to_owned(),
            },
            overload,
        );
        if let Some(&address) = self.method_addresses.get(&key) {
            return Ok(address);
        }

        let declared = self
            .registry
            .get(owner)
            .and_then(|st| st.methods_named(name).get(overload).map(|f| Arc::clone(f)));
        let Some(declared) = declared else {
            return Err(self.report.error(
                ErrorCode::E1061,
                span,
                format!("'{name}' not found in '{owner}'"),
            ));
        };

        match self.symbols.method_definition(&key.0, &declared) {
            Some(address) => {
                tracing::debug!(%owner, name, overload, address, "resolved method");
                self.method_addresses.insert(key, address);
                Ok(address)
            }
            None => Err(self.report.error(
                ErrorCode::E2019,
                span,
                format!("'{owner}::{name}' is declared but never defined"),
            )),
        }
    }

    pub(crate) fn mismatch(&mut self, name: &str, span: Span) -> ErrorGuaranteed {
        self.report.error(
            ErrorCode::E1503,
            span,
            format!("'{name}' argument type mismatch"),
        )
    }
}

/// Representation of every cell a value of `ty` occupies, fields of nested
/// structs flattened in order.
pub(crate) fn cell_kinds(registry: &TypeRegistry, ty: &CType) -> Vec<ValueKind> {
    let mut kinds = Vec::new();
    collect_cell_kinds(registry, ty, &mut kinds);
    kinds
}

fn collect_cell_kinds(registry: &TypeRegistry, ty: &CType, out: &mut Vec<ValueKind>) {
    match ty {
        CType::Void => {}
        CType::Struct(id) => {
            if let Some(st) = registry.get(id) {
                for member in st.members() {
                    if let StructMember::Field { ty, .. } = member {
                        collect_cell_kinds(registry, ty, out);
                    }
                }
            }
        }
        other => out.extend(other.value_kind()),
    }
}

#[cfg(test)]
mod tests;
