//! End-to-end programs on the 16-bit test target.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::sync::Arc;

use cvm_ir::{
    BasicTypeName, BinaryOp, Block, Expr, FunctionDef, GlobalDecl, ParamDecl, Signature, Stmt,
    StructDecl, TranslationUnit, TypeName, UnaryOp,
};
use cvmc::testing::{test_machine, PrintBuffer};
use cvmc::{CompileError, Error, ErrorCode, HostError, MachineInfo, Value, VmError};
use pretty_assertions::assert_eq;

struct Harness {
    machine: MachineInfo,
    output: Arc<PrintBuffer>,
}

fn harness() -> Harness {
    cvmc::init_tracing();
    let output = PrintBuffer::new();
    let machine = test_machine(&output).unwrap();
    Harness { machine, output }
}

impl Harness {
    fn run(&self, unit: &TranslationUnit) -> Result<Option<Value>, Error> {
        cvmc::run(unit, &self.machine, "main")
    }

    fn error_codes(&self, unit: &TranslationUnit) -> Vec<ErrorCode> {
        match cvmc::compile(unit, &self.machine) {
            Err(CompileError::Diagnostics { diagnostics }) => diagnostics.iter().map(|d| d.code).collect(),
            Err(other) => panic!("unexpected failure: {other}"),
            Ok(_) => Vec::new(),
        }
    }
}

fn sig(return_type: TypeName, params: Vec<ParamDecl>) -> Signature {
    Signature::new(return_type, params)
}

fn int(name: &str) -> ParamDecl {
    ParamDecl::new(name, TypeName::int())
}

fn call(name: &str, arguments: Vec<Expr>) -> Expr {
    Expr::call(Expr::var(name), arguments)
}

fn check(name: &str, expected: Expr, actual: Expr) -> Stmt {
    Stmt::expr(call(name, vec![expected, actual]))
}

fn main_fn(mut statements: Vec<Stmt>) -> FunctionDef {
    statements.push(Stmt::ret(Some(Expr::int(0))));
    FunctionDef::new("main", sig(TypeName::int(), vec![]), Block::new(statements))
}

fn point_with_moves() -> TranslationUnit {
    let move_one = sig(TypeName::Void, vec![int("dx")]);
    let move_two = sig(TypeName::Void, vec![int("dx"), int("dy")]);
    let add_to = |field: &str, param: &str| {
        Stmt::expr(Expr::assign(
            Expr::var(field),
            Expr::binary(BinaryOp::Add, Expr::var(field), Expr::var(param)),
        ))
    };
    TranslationUnit::new()
        .with_struct(
            StructDecl::new("Point")
                .field("x", TypeName::int())
                .field("y", TypeName::int())
                .method("move", move_one.clone())
                .method("move", move_two.clone()),
        )
        .with_function(FunctionDef::method(
            "Point",
            "move",
            move_one,
            Block::new(vec![add_to("x", "dx")]),
        ))
        .with_function(FunctionDef::method(
            "Point",
            "move",
            move_two,
            Block::new(vec![add_to("x", "dx"), add_to("y", "dy")]),
        ))
}

#[test]
fn test_method_overload_chosen_by_arity() {
    let h = harness();
    let unit = point_with_moves().with_function(main_fn(vec![
        Stmt::var("p", TypeName::named("Point"), None),
        Stmt::expr(Expr::call(Expr::member(Expr::var("p"), "move"), vec![Expr::int(5)])),
        Stmt::expr(call("print", vec![Expr::member(Expr::var("p"), "x")])),
        Stmt::expr(call("print", vec![Expr::member(Expr::var("p"), "y")])),
        Stmt::expr(Expr::call(
            Expr::member(Expr::var("p"), "move"),
            vec![Expr::int(1), Expr::int(2)],
        )),
        Stmt::expr(call("print", vec![Expr::member(Expr::var("p"), "x")])),
        Stmt::expr(call("print", vec![Expr::member(Expr::var("p"), "y")])),
    ]));
    assert_eq!(h.run(&unit).unwrap(), Some(Value::Int16(0)));
    assert_eq!(h.output.output(), "5\n0\n6\n2\n");
}

#[test]
fn test_method_called_through_pointer() {
    let h = harness();
    let unit = point_with_moves().with_function(main_fn(vec![
        Stmt::var("p", TypeName::named("Point"), None),
        Stmt::var(
            "q",
            TypeName::named("Point").pointer(),
            Some(Expr::address_of(Expr::var("p"))),
        ),
        Stmt::expr(Expr::call(Expr::arrow(Expr::var("q"), "move"), vec![Expr::int(3), Expr::int(4)])),
        check("assertAreEqual", Expr::int(3), Expr::member(Expr::var("p"), "x")),
        check("assertAreEqual", Expr::int(4), Expr::member(Expr::var("p"), "y")),
    ]));
    assert_eq!(h.run(&unit).unwrap(), Some(Value::Int16(0)));
}

#[test]
fn test_undefined_function_reports_only_the_name() {
    let h = harness();
    let unit = TranslationUnit::new().with_function(main_fn(vec![Stmt::expr(call(
        "foo",
        vec![Expr::int(1), Expr::int(2)],
    ))]));
    assert_eq!(h.error_codes(&unit), vec![ErrorCode::E0103]);
}

#[test]
fn test_char_cast_truncates_to_one_byte() {
    let h = harness();
    let unit = TranslationUnit::new().with_function(main_fn(vec![check(
        "assertAreEqual",
        Expr::character(b' '),
        Expr::cast(TypeName::char(), Expr::int(0x2020)),
    )]));
    assert_eq!(h.run(&unit).unwrap(), Some(Value::Int16(0)));
}

#[test]
fn test_struct_argument_matches_no_primitive_overload() {
    let h = harness();
    let unit = TranslationUnit::new()
        .with_struct(StructDecl::new("Point").field("x", TypeName::int()))
        .with_function(FunctionDef::new(
            "f",
            sig(TypeName::Void, vec![int("a")]),
            Block::new(vec![]),
        ))
        .with_function(FunctionDef::new(
            "f",
            sig(
                TypeName::Void,
                vec![ParamDecl::new("a", TypeName::signed(BasicTypeName::Double))],
            ),
            Block::new(vec![]),
        ))
        .with_function(main_fn(vec![
            Stmt::var("p", TypeName::named("Point"), None),
            Stmt::expr(call("f", vec![Expr::var("p")])),
        ]));
    assert_eq!(h.error_codes(&unit), vec![ErrorCode::E1503]);
}

#[test]
fn test_omitted_defaults_match_explicit_arguments() {
    let h = harness();
    let unit = TranslationUnit::new()
        .with_function(FunctionDef::new(
            "scale",
            sig(
                TypeName::int(),
                vec![int("a"), int("by").with_default(Value::Int64(7))],
            ),
            Block::new(vec![Stmt::ret(Some(Expr::binary(
                BinaryOp::Mul,
                Expr::var("a"),
                Expr::var("by"),
            )))]),
        ))
        .with_function(main_fn(vec![
            check(
                "assertAreEqual",
                call("scale", vec![Expr::int(3), Expr::int(7)]),
                call("scale", vec![Expr::int(3)]),
            ),
            Stmt::expr(call("print", vec![call("scale", vec![Expr::int(3)])])),
        ]));
    assert_eq!(h.run(&unit).unwrap(), Some(Value::Int16(0)));
    assert_eq!(h.output.output(), "21\n");
}

#[test]
fn test_failed_assertion_stops_the_program() {
    let h = harness();
    let unit = TranslationUnit::new().with_function(main_fn(vec![
        check("assertAreEqual", Expr::int(1), Expr::int(2)),
        Stmt::expr(call("print", vec![Expr::int(9)])),
    ]));
    let err = h.run(&unit).unwrap_err();
    assert!(matches!(
        err,
        Error::Vm(VmError::Host(HostError::AssertionFailed { ref expected, ref actual }))
            if expected == "1" && actual == "2"
    ));
    assert_eq!(h.output.output(), "");
}

#[test]
fn test_globals_shared_across_calls() {
    let h = harness();
    let unit = TranslationUnit::new()
        .with_global(GlobalDecl::new("counter", TypeName::int(), Some(Expr::int(3))))
        .with_function(FunctionDef::new(
            "bump",
            sig(TypeName::Void, vec![]),
            Block::new(vec![Stmt::expr(Expr::assign(
                Expr::var("counter"),
                Expr::binary(BinaryOp::Add, Expr::var("counter"), Expr::int(1)),
            ))]),
        ))
        .with_function(main_fn(vec![
            Stmt::expr(call("bump", vec![])),
            Stmt::expr(call("bump", vec![])),
            Stmt::expr(call("print", vec![Expr::var("counter")])),
        ]));
    assert_eq!(h.run(&unit).unwrap(), Some(Value::Int16(0)));
    assert_eq!(h.output.output(), "5\n");
}

#[test]
fn test_void_calls_leave_the_stack_balanced() {
    let h = harness();
    let unit = TranslationUnit::new()
        .with_function(FunctionDef::new("nothing", sig(TypeName::Void, vec![]), Block::new(vec![])))
        .with_function(main_fn(vec![
            Stmt::expr(call("nothing", vec![])),
            Stmt::expr(call("print", vec![Expr::int(1)])),
            Stmt::expr(call("nothing", vec![])),
        ]));
    let mut vm = cvmc::create_interpreter(&unit, &h.machine).unwrap();
    vm.reset("main").unwrap();
    assert_eq!(vm.run().unwrap(), Some(Value::Int16(0)));
    assert!(vm.stack().is_empty());
    assert_eq!(h.output.output(), "1\n");
}

#[test]
fn test_memcmp_compares_byte_cells() {
    let h = harness();
    let void_ptr = |name: &str| Expr::cast(TypeName::Void.pointer(), Expr::address_of(Expr::var(name)));
    let unit = TranslationUnit::new().with_function(main_fn(vec![
        Stmt::var("a", TypeName::int(), Some(Expr::int(5))),
        Stmt::var("b", TypeName::int(), Some(Expr::int(3))),
        Stmt::var("c", TypeName::int(), Some(Expr::int(5))),
        check(
            "assertAreEqual",
            Expr::int(2),
            call("memcmp", vec![void_ptr("a"), void_ptr("b"), Expr::int(1)]),
        ),
        check(
            "assertAreEqual",
            Expr::int(0),
            call("memcmp", vec![void_ptr("a"), void_ptr("c"), Expr::int(1)]),
        ),
    ]));
    assert_eq!(h.run(&unit).unwrap(), Some(Value::Int16(0)));
}

#[test]
fn test_width_specific_assertions() {
    let h = harness();
    let unit = TranslationUnit::new().with_function(main_fn(vec![
        check(
            "assertU16AreEqual",
            Expr::int(65535),
            Expr::cast(
                TypeName::unsigned(BasicTypeName::Int),
                Expr::unary(UnaryOp::Neg, Expr::int(1)),
            ),
        ),
        check(
            "assert32AreEqual",
            Expr::int(100_000),
            Expr::binary(
                BinaryOp::Mul,
                Expr::cast(TypeName::signed(BasicTypeName::LongInt), Expr::int(1000)),
                Expr::int(100),
            ),
        ),
        check(
            "assertDoublesAreEqual",
            Expr::float(0.3),
            Expr::binary(BinaryOp::Add, Expr::float(0.1), Expr::float(0.2)),
        ),
        check(
            "assertBoolsAreEqual",
            Expr::binary(BinaryOp::Lt, Expr::int(1), Expr::int(2)),
            Expr::int(1),
        ),
    ]));
    assert_eq!(h.run(&unit).unwrap(), Some(Value::Int16(0)));
}

#[test]
fn test_memset_fills_struct_cells() {
    let h = harness();
    let unit = TranslationUnit::new()
        .with_struct(
            StructDecl::new("Pixel")
                .field("r", TypeName::char())
                .field("g", TypeName::char())
                .field("level", TypeName::int()),
        )
        .with_function(main_fn(vec![
            Stmt::var("px", TypeName::named("Pixel"), None),
            Stmt::expr(call(
                "memset",
                vec![Expr::address_of(Expr::var("px")), Expr::int(0x1FF), Expr::int(2)],
            )),
            check("assertAreEqual", Expr::int(-1), Expr::member(Expr::var("px"), "r")),
            check("assertAreEqual", Expr::int(-1), Expr::member(Expr::var("px"), "g")),
            check("assertAreEqual", Expr::int(0), Expr::member(Expr::var("px"), "level")),
            Stmt::expr(call(
                "memset",
                vec![Expr::address_of(Expr::var("px")), Expr::int(3), Expr::int(3)],
            )),
            Stmt::expr(call("print", vec![Expr::member(Expr::var("px"), "level")])),
        ]));
    assert_eq!(h.run(&unit).unwrap(), Some(Value::Int16(0)));
    assert_eq!(h.output.output(), "3\n");
}

fn twice_and_thrice() -> TranslationUnit {
    let times = |name: &str, factor: i64| {
        FunctionDef::new(
            name,
            sig(TypeName::int(), vec![int("x")]),
            Block::new(vec![Stmt::ret(Some(Expr::binary(
                BinaryOp::Mul,
                Expr::var("x"),
                Expr::int(factor),
            )))]),
        )
    };
    TranslationUnit::new()
        .with_function(times("twice", 2))
        .with_function(times("thrice", 3))
}

fn int_to_int() -> TypeName {
    TypeName::function(TypeName::int(), vec![TypeName::int()]).pointer()
}

#[test]
fn test_identical_failing_calls_each_report() {
    let h = harness();
    let unit = TranslationUnit::new().with_function(main_fn(vec![
        Stmt::expr(call("foo", vec![Expr::int(1), Expr::int(2)])),
        Stmt::expr(call("foo", vec![Expr::int(1), Expr::int(2)])),
    ]));
    assert_eq!(h.error_codes(&unit), vec![ErrorCode::E0103, ErrorCode::E0103]);
}

#[test]
fn test_method_call_on_scalar_is_invalid() {
    let h = harness();
    let unit = point_with_moves().with_function(main_fn(vec![
        Stmt::var("n", TypeName::int(), Some(Expr::int(1))),
        Stmt::expr(Expr::call(Expr::member(Expr::var("n"), "move"), vec![Expr::int(5)])),
    ]));
    assert_eq!(h.error_codes(&unit), vec![ErrorCode::E0119]);
}

#[test]
fn test_call_through_function_pointer_local() {
    let h = harness();
    let unit = twice_and_thrice().with_function(main_fn(vec![
        Stmt::var("fp", int_to_int(), Some(Expr::var("twice"))),
        Stmt::expr(call("print", vec![call("fp", vec![Expr::int(21)])])),
        Stmt::expr(Expr::assign(
            Expr::var("fp"),
            Expr::address_of(Expr::var("thrice")),
        )),
        Stmt::expr(call("print", vec![call("fp", vec![Expr::int(3)])])),
    ]));
    assert_eq!(h.run(&unit).unwrap(), Some(Value::Int16(0)));
    assert_eq!(h.output.output(), "42\n9\n");
}

#[test]
fn test_call_through_function_pointer_field() {
    let h = harness();
    let unit = twice_and_thrice()
        .with_struct(
            StructDecl::new("Handler")
                .field("bias", TypeName::int())
                .field("cb", int_to_int()),
        )
        .with_function(main_fn(vec![
            Stmt::var("h", TypeName::named("Handler"), None),
            Stmt::var(
                "hp",
                TypeName::named("Handler").pointer(),
                Some(Expr::address_of(Expr::var("h"))),
            ),
            Stmt::expr(Expr::assign(Expr::member(Expr::var("h"), "cb"), Expr::var("twice"))),
            Stmt::expr(call(
                "print",
                vec![Expr::call(Expr::member(Expr::var("h"), "cb"), vec![Expr::int(4)])],
            )),
            Stmt::expr(Expr::assign(Expr::arrow(Expr::var("hp"), "cb"), Expr::var("thrice"))),
            Stmt::expr(call(
                "print",
                vec![Expr::call(Expr::arrow(Expr::var("hp"), "cb"), vec![Expr::int(5)])],
            )),
        ]));
    assert_eq!(h.run(&unit).unwrap(), Some(Value::Int16(0)));
    assert_eq!(h.output.output(), "8\n15\n");
}

#[test]
fn test_function_pointer_with_wrong_signature_is_rejected() {
    let h = harness();
    let unit = twice_and_thrice().with_function(main_fn(vec![Stmt::var(
        "fp",
        TypeName::function(TypeName::Void, vec![TypeName::int()]).pointer(),
        Some(Expr::var("twice")),
    )]));
    assert_eq!(h.error_codes(&unit), vec![ErrorCode::E0030]);
}

#[test]
fn test_call_through_address_and_dereference() {
    let h = harness();
    let unit = twice_and_thrice().with_function(main_fn(vec![
        Stmt::expr(call(
            "print",
            vec![Expr::call(Expr::address_of(Expr::var("twice")), vec![Expr::int(21)])],
        )),
        Stmt::expr(call(
            "print",
            vec![Expr::call(
                Expr::deref(Expr::address_of(Expr::var("twice"))),
                vec![Expr::int(4)],
            )],
        )),
    ]));
    assert_eq!(h.run(&unit).unwrap(), Some(Value::Int16(0)));
    assert_eq!(h.output.output(), "42\n8\n");
}
