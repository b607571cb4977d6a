#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use cvm_ir::{BasicTypeName, Signedness};
use cvm_types::Parameter;
use pretty_assertions::assert_eq;

fn function(params: Vec<CType>) -> FunctionType {
    let params = params
        .into_iter()
        .enumerate()
        .map(|(i, ty)| Parameter::new(format!("p{i}"), ty))
        .collect();
    FunctionType::new(CType::Void, params)
}

fn with_context<R>(
    registry: &TypeRegistry,
    symbols: &SymbolTable,
    owner: Option<StructId>,
    f: impl FnOnce(&mut EmitContext<'_>) -> R,
) -> (R, Report) {
    let machine = MachineInfo::default();
    let mut report = Report::new();
    let result = {
        let mut ec = EmitContext::new(&machine, registry, symbols, &mut report);
        let mut ty = FunctionType::new(CType::Void, Vec::new());
        if owner.is_some() {
            ty = ty.into_instance();
        }
        ec.begin_function("test", &ty, owner, Span::DUMMY);
        f(&mut ec)
    };
    (result, report)
}

#[test]
fn test_pick_overload_prefers_higher_score() {
    let m = MachineInfo::default();
    let candidates = [function(vec![CType::int(&m)]), function(vec![CType::double(&m)])];
    assert_eq!(pick_overload(&candidates, &[CType::double(&m)]), Some(1));
    assert_eq!(pick_overload(&candidates, &[CType::int(&m)]), Some(0));
}

#[test]
fn test_pick_overload_ties_keep_declaration_order() {
    let m = MachineInfo::default();
    let short = CType::basic(BasicTypeName::ShortInt, Signedness::Signed, &m);
    let long_long = CType::basic(BasicTypeName::LongLongInt, Signedness::Signed, &m);
    let candidates = [function(vec![long_long]), function(vec![short])];
    assert_eq!(pick_overload(&candidates, &[CType::char(&m)]), Some(0));
}

#[test]
fn test_pick_overload_rejects_zero_scores() {
    let m = MachineInfo::default();
    let candidates = [function(vec![CType::int(&m).pointer_to()]), function(vec![])];
    assert_eq!(pick_overload(&candidates, &[CType::double(&m)]), None);
}

#[test]
fn test_locals_shadow_globals() {
    let m = MachineInfo::default();
    let mut symbols = SymbolTable::new();
    symbols.add_global(
        "x",
        GlobalSymbol {
            address: 1,
            ty: CType::char(&m),
        },
    );
    let registry = TypeRegistry::new();
    let (symbols_seen, report) = with_context(&registry, &symbols, None, |ec| {
        let outer = ec.resolve_variable("x", None, Span::DUMMY).unwrap();
        ec.push_scope();
        ec.declare_local("x", CType::int(&m), Span::DUMMY);
        let inner = ec.resolve_variable("x", None, Span::DUMMY).unwrap();
        ec.pop_scope();
        let after = ec.resolve_variable("x", None, Span::DUMMY).unwrap();
        (outer, inner, after)
    });
    assert!(!report.has_errors());
    let (outer, inner, after) = symbols_seen;
    assert!(matches!(outer, Symbol::Global { address: 1, .. }));
    assert_eq!(
        inner,
        Symbol::Local {
            slot: 0,
            ty: CType::int(&m)
        }
    );
    assert_eq!(after, outer);
}

#[test]
fn test_unknown_name_reports_once_per_site() {
    let registry = TypeRegistry::new();
    let symbols = SymbolTable::new();
    let (_, report) = with_context(&registry, &symbols, None, |ec| {
        assert!(ec.resolve_variable("y", None, Span::new(3, 4)).is_err());
        assert!(ec.resolve_variable("y", None, Span::new(3, 4)).is_err());
    });
    assert_eq!(report.count_of(ErrorCode::E0103), 1);
}

#[test]
fn test_redeclared_local_in_same_scope() {
    let m = MachineInfo::default();
    let registry = TypeRegistry::new();
    let symbols = SymbolTable::new();
    let (slots, report) = with_context(&registry, &symbols, None, |ec| {
        let a = ec.declare_local("a", CType::int(&m), Span::DUMMY);
        let b = ec.declare_local("a", CType::int(&m), Span::DUMMY);
        (a, b)
    });
    assert_eq!(slots, (0, 1));
    assert_eq!(report.count_of(ErrorCode::E0128), 1);
}

#[test]
fn test_single_free_function_is_not_scored() {
    let m = MachineInfo::default();
    let mut symbols = SymbolTable::new();
    symbols.overloads_mut("f").push(FunctionSymbol {
        ty: Arc::new(function(vec![CType::int(&m), CType::int(&m)])),
        address: Some(4),
    });
    let registry = TypeRegistry::new();
    let (symbol, report) = with_context(&registry, &symbols, None, |ec| {
        ec.resolve_variable("f", Some(&[CType::int(&m)]), Span::DUMMY)
    });
    assert!(matches!(symbol, Ok(Symbol::Function { address: 4, .. })));
    assert!(!report.has_errors());
}

#[test]
fn test_function_set_without_match() {
    let m = MachineInfo::default();
    let mut symbols = SymbolTable::new();
    for (address, ty) in [(0, CType::int(&m).pointer_to()), (1, CType::void_pointer())] {
        symbols.overloads_mut("f").push(FunctionSymbol {
            ty: Arc::new(function(vec![ty])),
            address: Some(address),
        });
    }
    let registry = TypeRegistry::new();
    let (symbol, report) = with_context(&registry, &symbols, None, |ec| {
        ec.resolve_variable("f", Some(&[CType::double(&m)]), Span::DUMMY)
    });
    assert!(symbol.is_err());
    assert_eq!(report.count_of(ErrorCode::E1503), 1);
}

#[test]
fn test_prototype_without_definition() {
    let mut symbols = SymbolTable::new();
    symbols.overloads_mut("f").push(FunctionSymbol {
        ty: Arc::new(function(vec![])),
        address: None,
    });
    let registry = TypeRegistry::new();
    let (symbol, report) = with_context(&registry, &symbols, None, |ec| {
        ec.resolve_variable("f", Some(&[]), Span::DUMMY)
    });
    assert!(symbol.is_err());
    assert_eq!(report.count_of(ErrorCode::E2019), 1);
}

fn counter(registry: &mut TypeRegistry) -> StructId {
    let m = MachineInfo::default();
    let id = registry.declare("Counter");
    let bump = |params| {
        StructMember::Method {
            name: "bump".into(),
            ty: Arc::new(function(params).into_instance()),
        }
    };
    registry
        .define(
            &id,
            vec![
                StructMember::Field {
                    name: "n".into(),
                    ty: CType::int(&m),
                },
                bump(vec![]),
                bump(vec![CType::int(&m)]),
            ],
        )
        .unwrap();
    id
}

#[test]
fn test_this_members_resolve_before_globals() {
    let m = MachineInfo::default();
    let mut registry = TypeRegistry::new();
    let id = counter(&mut registry);
    let mut symbols = SymbolTable::new();
    symbols.add_global(
        "n",
        GlobalSymbol {
            address: 1,
            ty: CType::char(&m),
        },
    );
    symbols.add_method(id.clone(), "bump", Arc::new(function(vec![]).into_instance()), 7);
    symbols.add_method(
        id.clone(),
        "bump",
        Arc::new(function(vec![CType::int(&m)]).into_instance()),
        8,
    );
    let ((field, method), report) = with_context(&registry, &symbols, Some(id), |ec| {
        let field = ec.resolve_variable("n", None, Span::DUMMY).unwrap();
        let method = ec
            .resolve_variable("bump", Some(&[CType::int(&m)]), Span::DUMMY)
            .unwrap();
        (field, method)
    });
    assert!(!report.has_errors());
    assert_eq!(
        field,
        Symbol::Field {
            offset: 0,
            ty: CType::int(&m)
        }
    );
    assert!(matches!(method, Symbol::Method { address: 8, .. }));
}

#[test]
fn test_method_addresses_are_cached() {
    let mut registry = TypeRegistry::new();
    let id = counter(&mut registry);
    let mut symbols = SymbolTable::new();
    symbols.add_method(id.clone(), "bump", Arc::new(function(vec![]).into_instance()), 3);
    let (addresses, report) = with_context(&registry, &symbols, None, |ec| {
        let first = ec.resolve_method_function(&id, "bump", 0, Span::DUMMY);
        let second = ec.resolve_method_function(&id, "bump", 0, Span::DUMMY);
        let undefined = ec.resolve_method_function(&id, "bump", 1, Span::DUMMY);
        (first, second, undefined)
    });
    assert_eq!(addresses.0, Ok(3));
    assert_eq!(addresses.1, Ok(3));
    assert!(addresses.2.is_err());
    assert_eq!(report.count_of(ErrorCode::E2019), 1);
}

#[test]
fn test_implicit_conversion_rules() {
    let m = MachineInfo::default();
    let registry = TypeRegistry::new();
    let symbols = SymbolTable::new();
    let (code, report) = with_context(&registry, &symbols, None, |ec| {
        ec.emit_cast(&CType::int(&m), &CType::int(&m), Span::DUMMY);
        ec.emit_cast(&CType::int(&m), &CType::bool(&m), Span::DUMMY);
        ec.emit_cast(&CType::double(&m), &CType::int(&m).pointer_to(), Span::DUMMY);
        ec.code().to_vec()
    });
    assert_eq!(
        code,
        vec![
            Instruction::LoadConstant(cvm_ir::Value::Int32(0)),
            Instruction::Ne,
            Instruction::Convert(ValueKind::UInt8),
        ]
    );
    assert_eq!(report.count_of(ErrorCode::E0030), 1);
}
