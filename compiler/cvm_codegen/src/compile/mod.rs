//! Translation-unit assembly.
//!
//! Compiling a unit runs in passes:
//!
//! 1. Structs are declared by name, then defined in order (field layout and
//!    method index)
//! 2. Intrinsics from the machine model take the first function addresses
//! 3. Globals get memory cells; cell 0 stays reserved for null
//! 4. Function and method signatures are registered, pairing prototypes
//!    with their definitions
//! 5. `__cinit` (global initialisers) and every body are emitted
//!
//! All diagnostics of all passes are collected before deciding whether the
//! unit produced an [`Executable`].

use std::sync::Arc;

use cvm_diagnostic::{Diagnostic, ErrorCode, Report, ReportConfig};
use cvm_ir::{Address, FunctionDef, GlobalDecl, MemberDecl, Span, TranslationUnit, ValueKind};
use cvm_types::{
    CType, FunctionType, MachineError, MachineInfo, StructId, StructMember, TypeRegistry,
};

use crate::context::{cell_kinds, FunctionSymbol, GlobalSymbol, MethodKey, SymbolTable};
use crate::executable::{CompiledFunction, Function, FunctionBody, INIT_FUNCTION};
use crate::expr::{emit, evaluated_type, struct_value};
use crate::stmt::{emit_block, emit_implicit_return};
use crate::{EmitContext, Executable, Instruction};

/// Why a unit produced no executable.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("invalid machine model: {0}")]
    Machine(#[from] MachineError),
    #[error("compilation failed with {} error(s)", .diagnostics.len())]
    Diagnostics { diagnostics: Vec<Diagnostic> },
}

impl CompileError {
    /// Every diagnostic of the failed unit, in report order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CompileError::Machine(_) => &[],
            CompileError::Diagnostics { diagnostics } => diagnostics,
        }
    }
}

/// A function definition waiting for its body to be emitted.
struct PendingBody<'u> {
    def: &'u FunctionDef,
    ty: Arc<FunctionType>,
    owner: Option<StructId>,
    address: Address,
}

struct GlobalInit<'u> {
    decl: &'u GlobalDecl,
    address: Address,
    ty: CType,
}

/// Compile a unit for `machine`.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(
        structs = unit.structs.len(),
        globals = unit.globals.len(),
        functions = unit.functions.len(),
    )
)]
pub fn compile(
    unit: &TranslationUnit,
    machine: &MachineInfo,
    config: ReportConfig,
) -> Result<Executable, CompileError> {
    machine.validate()?;
    let mut report = Report::with_config(config);

    let registry = register_structs(unit, machine, &mut report);
    let mut symbols = SymbolTable::new();
    let mut functions: Vec<Function> = Vec::new();

    for intrinsic in machine.internal_functions() {
        let ty = match registry.resolve_signature(&intrinsic.signature, machine) {
            Ok(ty) => Arc::new(ty),
            Err(err) => {
                report.error(ErrorCode::E0246, Span::DUMMY, err.to_string());
                continue;
            }
        };
        let address = next_address(&functions);
        symbols.overloads_mut(&intrinsic.name).push(FunctionSymbol {
            ty: Arc::clone(&ty),
            address: Some(address),
        });
        functions.push(Function {
            name: intrinsic.name.clone(),
            ty,
            body: FunctionBody::Internal(Arc::clone(&intrinsic.callback)),
        });
    }

    let (globals, inits) = allocate_globals(unit, machine, &registry, &mut symbols, &mut report);
    let pending = declare_functions(
        unit,
        machine,
        &registry,
        &mut symbols,
        &mut functions,
        &mut report,
    );

    let init_ty = Arc::new(FunctionType::new(CType::Void, Vec::new()));
    let init = next_address(&functions);
    functions.push(placeholder(INIT_FUNCTION.to_owned(), Arc::clone(&init_ty)));

    {
        let mut ec = EmitContext::new(machine, &registry, &symbols, &mut report);

        ec.begin_function(INIT_FUNCTION, &init_ty, None, Span::DUMMY);
        for global in &inits {
            let Some(value) = &global.decl.init else {
                continue;
            };
            if global.ty.is_struct() {
                struct_value(value, &mut ec);
                continue;
            }
            let value_ty = evaluated_type(value, &mut ec);
            emit(value, &mut ec);
            ec.emit_cast(&value_ty, &global.ty, value.span);
            ec.emit(Instruction::StoreGlobal(global.address));
        }
        ec.emit(Instruction::Return);
        set_body(&mut functions, init, ec.finish_function());

        for body in &pending {
            let Some(block) = &body.def.body else {
                continue;
            };
            tracing::debug!(function = %body.def.qualified_name(), address = body.address, "emitting body");
            ec.begin_function(
                body.def.qualified_name(),
                &body.ty,
                body.owner.clone(),
                body.def.span,
            );
            emit_block(block, &mut ec);
            emit_implicit_return(&body.ty.return_type, &mut ec);
            set_body(&mut functions, body.address, ec.finish_function());
        }
    }

    if report.has_errors() {
        tracing::debug!(errors = report.error_count(), "unit failed to compile");
        return Err(CompileError::Diagnostics {
            diagnostics: report.into_diagnostics(),
        });
    }

    tracing::debug!(
        functions = functions.len(),
        global_cells = globals.len(),
        "unit compiled"
    );
    Ok(Executable {
        functions,
        globals,
        init,
        int_kind: CType::int(machine).value_kind().unwrap_or(ValueKind::Int32),
        pointer_size: machine.pointer_size,
    })
}

fn next_address(functions: &[Function]) -> Address {
    Address::try_from(functions.len()).unwrap_or(Address::MAX)
}

fn placeholder(name: String, ty: Arc<FunctionType>) -> Function {
    Function {
        name,
        ty,
        body: FunctionBody::Compiled(CompiledFunction {
            code: Vec::new(),
            frame: Vec::new(),
        }),
    }
}

fn set_body(functions: &mut [Function], address: Address, body: CompiledFunction) {
    if let Some(function) = functions.get_mut(address as usize) {
        function.body = FunctionBody::Compiled(body);
    }
}

/// Struct parameters and results are passed by pointer only.
fn check_by_value(name: &str, ty: &FunctionType, span: Span, report: &mut Report) {
    if ty.return_type.is_struct() {
        report.error(
            ErrorCode::E0020,
            span,
            format!("'{name}' is a struct value; take its address instead"),
        );
    }
    for param in ty.parameters.iter().filter(|p| p.ty.is_struct()) {
        report.error(
            ErrorCode::E0020,
            span,
            format!("'{}' is a struct value; take its address instead", param.name),
        );
    }
}

fn register_structs(
    unit: &TranslationUnit,
    machine: &MachineInfo,
    report: &mut Report,
) -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    let mut first_decl = Vec::with_capacity(unit.structs.len());
    for decl in &unit.structs {
        let duplicate = registry.lookup(&decl.name).is_some();
        if duplicate {
            report.error(
                ErrorCode::E0111,
                decl.span,
                format!("'{}' is already defined", decl.name),
            );
        }
        registry.declare(&decl.name);
        first_decl.push(!duplicate);
    }

    for (decl, _) in unit.structs.iter().zip(first_decl).filter(|(_, first)| *first) {
        let id = registry.declare(&decl.name);
        let mut members: Vec<StructMember> = Vec::with_capacity(decl.members.len());
        for member in &decl.members {
            match member {
                MemberDecl::Field { name, ty } => {
                    if members.iter().any(|m| m.name() == name) {
                        report.error(
                            ErrorCode::E0111,
                            decl.span,
                            format!("'{}::{name}' is already defined", decl.name),
                        );
                        continue;
                    }
                    match registry.resolve(ty, machine) {
                        Ok(ty) => members.push(StructMember::Field {
                            name: name.clone(),
                            ty,
                        }),
                        Err(err) => {
                            report.error(ErrorCode::E0246, decl.span, err.to_string());
                        }
                    }
                }
                MemberDecl::Method { name, signature } => {
                    let ty = match registry.resolve_signature(signature, machine) {
                        Ok(ty) => ty.into_instance(),
                        Err(err) => {
                            report.error(ErrorCode::E0246, decl.span, err.to_string());
                            continue;
                        }
                    };
                    let qualified = format!("{}::{name}", decl.name);
                    check_by_value(&qualified, &ty, decl.span, report);
                    let duplicate = members.iter().any(|m| match m {
                        StructMember::Method { name: n, ty: other } => {
                            n == name && other.same_parameter_types(&ty)
                        }
                        StructMember::Field { .. } => false,
                    });
                    if duplicate {
                        report.error(
                            ErrorCode::E0111,
                            decl.span,
                            format!("'{qualified}' is already defined with the same parameter types"),
                        );
                        continue;
                    }
                    members.push(StructMember::Method {
                        name: name.clone(),
                        ty: Arc::new(ty),
                    });
                }
            }
        }
        if let Err(err) = registry.define(&id, members) {
            report.error(ErrorCode::E0246, decl.span, err.to_string());
        }
    }
    registry
}

fn allocate_globals<'u>(
    unit: &'u TranslationUnit,
    machine: &MachineInfo,
    registry: &TypeRegistry,
    symbols: &mut SymbolTable,
    report: &mut Report,
) -> (Vec<ValueKind>, Vec<GlobalInit<'u>>) {
    // Cell 0 is the null address.
    let mut cells = vec![ValueKind::Pointer];
    let mut inits = Vec::new();
    for decl in &unit.globals {
        let ty = match registry.resolve(&decl.ty, machine) {
            Ok(ty) => ty,
            Err(err) => {
                report.error(ErrorCode::E0246, decl.span, err.to_string());
                continue;
            }
        };
        let address = Address::try_from(cells.len()).unwrap_or(Address::MAX);
        let symbol = GlobalSymbol {
            address,
            ty: ty.clone(),
        };
        if !symbols.add_global(&decl.name, symbol) {
            report.error(
                ErrorCode::E0111,
                decl.span,
                format!("'{}' is already defined", decl.name),
            );
            continue;
        }
        let mut kinds = cell_kinds(registry, &ty);
        if kinds.is_empty() {
            kinds.extend(CType::int(machine).value_kind());
        }
        tracing::trace!(name = %decl.name, address, cells = kinds.len(), "global allocated");
        cells.extend(kinds);
        if decl.init.is_some() {
            inits.push(GlobalInit { decl, address, ty });
        }
    }
    (cells, inits)
}

fn declare_functions<'u>(
    unit: &'u TranslationUnit,
    machine: &MachineInfo,
    registry: &TypeRegistry,
    symbols: &mut SymbolTable,
    functions: &mut Vec<Function>,
    report: &mut Report,
) -> Vec<PendingBody<'u>> {
    let mut pending = Vec::new();
    for def in &unit.functions {
        let ty = match registry.resolve_signature(&def.signature, machine) {
            Ok(ty) => ty,
            Err(err) => {
                report.error(ErrorCode::E0246, def.span, err.to_string());
                continue;
            }
        };
        let qualified = def.qualified_name();
        check_by_value(&qualified, &ty, def.span, report);

        match &def.owner {
            Some(owner_name) => {
                let Some(owner) = registry.lookup(owner_name) else {
                    report.error(
                        ErrorCode::E0246,
                        def.span,
                        format!("The type '{owner_name}' could not be found"),
                    );
                    continue;
                };
                let ty = Arc::new(ty.into_instance());
                let declared = registry.get(&owner).is_some_and(|st| {
                    st.methods_named(&def.name)
                        .iter()
                        .any(|m| m.same_parameter_types(&ty))
                });
                if !declared {
                    report.error(
                        ErrorCode::E1061,
                        def.span,
                        format!("'{}' not found in '{owner}'", def.name),
                    );
                    continue;
                }
                if def.body.is_none() {
                    continue;
                }
                let key = MethodKey {
                    owner: owner.clone(),
                    name: def.name.clone(),
                };
                if symbols.method_definition(&key, &ty).is_some() {
                    report.error(
                        ErrorCode::E0111,
                        def.span,
                        format!("'{qualified}' is already defined with the same parameter types"),
                    );
                    continue;
                }
                let address = next_address(functions);
                functions.push(placeholder(qualified, Arc::clone(&ty)));
                symbols.add_method(owner.clone(), &def.name, Arc::clone(&ty), address);
                pending.push(PendingBody {
                    def,
                    ty,
                    owner: Some(owner),
                    address,
                });
            }
            None => {
                let ty = Arc::new(ty);
                let overloads = symbols.overloads_mut(&def.name);
                let existing = overloads
                    .iter()
                    .position(|f| f.ty.same_parameter_types(&ty));
                if def.body.is_none() {
                    if existing.is_none() {
                        overloads.push(FunctionSymbol { ty, address: None });
                    }
                    continue;
                }
                if existing.is_some_and(|i| overloads[i].address.is_some()) {
                    report.error(
                        ErrorCode::E0111,
                        def.span,
                        format!("'{qualified}' is already defined with the same parameter types"),
                    );
                    continue;
                }
                let address = next_address(functions);
                match existing {
                    Some(i) => overloads[i].address = Some(address),
                    None => overloads.push(FunctionSymbol {
                        ty: Arc::clone(&ty),
                        address: Some(address),
                    }),
                }
                functions.push(placeholder(qualified, Arc::clone(&ty)));
                pending.push(PendingBody {
                    def,
                    ty,
                    owner: None,
                    address,
                });
            }
        }
    }
    pending
}
