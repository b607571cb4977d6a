use super::*;
use cvm_ir::BasicTypeName;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::{FunctionType, Parameter};

fn basic(name: BasicTypeName, signedness: Signedness) -> CType {
    CType::basic(name, signedness, &MachineInfo::default())
}

fn s(name: BasicTypeName) -> CType {
    basic(name, Signedness::Signed)
}

fn u(name: BasicTypeName) -> CType {
    basic(name, Signedness::Unsigned)
}

#[test]
fn test_exact() {
    assert_eq!(score_conversion(&s(BasicTypeName::Int), &s(BasicTypeName::Int)), SCORE_EXACT);
    assert_eq!(
        score_conversion(&CType::void_pointer(), &CType::void_pointer()),
        SCORE_EXACT
    );
}

#[test]
fn test_widening() {
    assert_eq!(
        score_conversion(&s(BasicTypeName::Char), &s(BasicTypeName::Int)),
        SCORE_PROMOTION
    );
    assert_eq!(
        score_conversion(&s(BasicTypeName::Float), &s(BasicTypeName::Double)),
        SCORE_PROMOTION
    );
    assert_eq!(
        score_conversion(&u(BasicTypeName::ShortInt), &u(BasicTypeName::LongLongInt)),
        SCORE_PROMOTION
    );
}

#[test]
fn test_conversions() {
    let cases = [
        (s(BasicTypeName::Int), s(BasicTypeName::Char)),
        (s(BasicTypeName::Int), u(BasicTypeName::Int)),
        (u(BasicTypeName::Char), s(BasicTypeName::Int)),
        (s(BasicTypeName::Int), s(BasicTypeName::Double)),
        (s(BasicTypeName::Double), s(BasicTypeName::Int)),
        (s(BasicTypeName::Int), CType::bool(&MachineInfo::default())),
        (s(BasicTypeName::Char).pointer_to(), CType::void_pointer()),
        (CType::void_pointer(), s(BasicTypeName::Int).pointer_to()),
    ];
    for (from, to) in cases {
        assert_eq!(score_conversion(&from, &to), SCORE_CONVERSION, "{from} -> {to}");
    }
}

#[test]
fn test_incompatible() {
    let m = MachineInfo::default();
    let mut registry = crate::TypeRegistry::new();
    let point = CType::Struct(registry.declare("Point"));
    let other = CType::Struct(registry.declare("Other"));
    let int = CType::int(&m);

    let cases = [
        (point.clone(), int.clone()),
        (int.clone(), point.clone()),
        (point.clone(), other),
        (int.clone(), CType::void_pointer()),
        (CType::void_pointer(), int.clone()),
        (int.pointer_to(), CType::char(&m).pointer_to()),
        (CType::Void, CType::int(&m)),
    ];
    for (from, to) in cases {
        assert_eq!(score_conversion(&from, &to), SCORE_NONE, "{from} -> {to}");
    }
    assert_eq!(score_conversion(&point, &point), SCORE_EXACT);
}

#[test]
fn test_function_decays_to_pointer() {
    let m = MachineInfo::default();
    let f = CType::function(FunctionType::new(CType::Void, Vec::new()));
    let g = CType::function(FunctionType::new(CType::int(&m), Vec::new()));
    assert_eq!(score_conversion(&f, &f.clone().pointer_to()), SCORE_EXACT);
    assert_eq!(score_conversion(&g, &f.pointer_to()), SCORE_NONE);
}

#[test]
fn test_function_pointers_ignore_parameter_names() {
    let m = MachineInfo::default();
    let twice = CType::function(FunctionType::new(
        CType::int(&m),
        vec![Parameter::new("x", CType::int(&m)).with_default(cvm_ir::Value::Int32(1))],
    ));
    let slot = CType::function(FunctionType::new(
        CType::int(&m),
        vec![Parameter::new("", CType::int(&m))],
    ))
    .pointer_to();
    let other = CType::function(FunctionType::new(
        CType::int(&m),
        vec![Parameter::new("", CType::double(&m))],
    ))
    .pointer_to();
    assert_eq!(score_conversion(&twice, &slot), SCORE_EXACT);
    assert_eq!(score_conversion(&twice.clone().pointer_to(), &slot), SCORE_EXACT);
    assert_eq!(score_conversion(&twice, &other), SCORE_NONE);
    assert_eq!(score_conversion(&slot, &other), SCORE_NONE);
    assert_eq!(score_conversion(&slot, &CType::void_pointer()), SCORE_CONVERSION);
}

#[test]
fn test_explicit_casts() {
    let m = MachineInfo::default();
    let int = CType::int(&m);
    assert!(is_explicit_conversion_allowed(&int, &CType::char(&m)));
    assert!(is_explicit_conversion_allowed(&int, &CType::void_pointer()));
    assert!(is_explicit_conversion_allowed(&CType::void_pointer(), &int));
    assert!(is_explicit_conversion_allowed(&int, &CType::Void));
    assert!(!is_explicit_conversion_allowed(
        &CType::double(&m),
        &CType::void_pointer()
    ));
    let mut registry = crate::TypeRegistry::new();
    let point = CType::Struct(registry.declare("Point"));
    assert!(!is_explicit_conversion_allowed(&point, &int));
}

#[test]
fn test_integer_promotion() {
    let m = MachineInfo::arduino();
    let char = BasicType::new(BasicTypeName::Char, Signedness::Unsigned, &m);
    let promoted = integer_promotion(char, &m);
    assert_eq!(CType::Basic(promoted), CType::int(&m));

    let ulong = BasicType::new(BasicTypeName::LongInt, Signedness::Unsigned, &m);
    assert_eq!(integer_promotion(ulong, &m), ulong);
}

#[test]
fn test_arithmetic_result_type() {
    let m = MachineInfo::arduino();
    let b = |name, signedness| BasicType::new(name, signedness, &m);
    let char = b(BasicTypeName::Char, Signedness::Signed);
    let int = b(BasicTypeName::Int, Signedness::Signed);
    let uint = b(BasicTypeName::Int, Signedness::Unsigned);
    let long = b(BasicTypeName::LongInt, Signedness::Signed);
    let float = b(BasicTypeName::Float, Signedness::Signed);

    assert_eq!(arithmetic_result_type(char, char, &m), int);
    assert_eq!(arithmetic_result_type(int, uint, &m), uint);
    assert_eq!(arithmetic_result_type(int, long, &m), long);
    assert_eq!(arithmetic_result_type(long, float, &m), float);
}

fn any_basic() -> impl Strategy<Value = CType> {
    let names = prop::sample::select(vec![
        BasicTypeName::Bool,
        BasicTypeName::Char,
        BasicTypeName::ShortInt,
        BasicTypeName::Int,
        BasicTypeName::LongInt,
        BasicTypeName::LongLongInt,
        BasicTypeName::Float,
        BasicTypeName::Double,
    ]);
    (names, any::<bool>()).prop_map(|(name, signed)| {
        basic(
            name,
            if signed {
                Signedness::Signed
            } else {
                Signedness::Unsigned
            },
        )
    })
}

proptest! {
    #[test]
    fn prop_scores_are_bounded(from in any_basic(), to in any_basic()) {
        let score = score_conversion(&from, &to);
        prop_assert!((SCORE_CONVERSION..=SCORE_EXACT).contains(&score));
        prop_assert_eq!(score == SCORE_EXACT, from == to);
    }

    #[test]
    fn prop_parameter_scoring_is_deterministic(
        params in prop::collection::vec(any_basic(), 0..4),
        args in prop::collection::vec(any_basic(), 0..5),
    ) {
        let f = FunctionType::new(
            CType::Void,
            params.into_iter().map(|ty| crate::Parameter::new("p", ty)).collect(),
        );
        let first = f.score_parameter_type_matches(&args);
        prop_assert_eq!(first, f.score_parameter_type_matches(&args));
        if args.len() == f.parameters.len() {
            prop_assert!(first >= 1 + u32::try_from(args.len()).unwrap_or(0));
        } else {
            prop_assert_eq!(first, 0);
        }
    }

    #[test]
    fn prop_exact_arguments_score_best(params in prop::collection::vec(any_basic(), 0..4)) {
        let f = FunctionType::new(
            CType::Void,
            params.iter().cloned().map(|ty| crate::Parameter::new("p", ty)).collect(),
        );
        let expected = 1 + SCORE_EXACT * u32::try_from(params.len()).unwrap_or(0);
        prop_assert_eq!(f.score_parameter_type_matches(&params), expected);
    }
}
