use super::*;
use crate::Value;
use pretty_assertions::assert_eq;

#[test]
fn test_call_display_lists_arguments() {
    let call = Expr::call(
        Expr::member(Expr::var("p"), "move"),
        vec![Expr::int(5), Expr::var("dy")],
    );
    assert_eq!(call.to_string(), "p.move(5, dy)");
}

#[test]
fn test_nested_display() {
    let e = Expr::assign(
        Expr::arrow(Expr::var("q"), "x"),
        Expr::binary(
            BinaryOp::Add,
            Expr::deref(Expr::var("ptr")),
            Expr::cast(TypeName::char(), Expr::int(0x2020)),
        ),
    );
    assert_eq!(e.to_string(), "q->x = (*ptr + ((char)8224))");
    assert_eq!(Expr::character(b' ').to_string(), "' '");
    assert_eq!(Expr::error().to_string(), "<error>");
}

#[test]
fn test_type_name_display() {
    assert_eq!(TypeName::unsigned(BasicTypeName::LongInt).to_string(), "unsigned long");
    assert_eq!(TypeName::Void.pointer().to_string(), "void*");
    assert_eq!(TypeName::named("Point").pointer().to_string(), "Point*");
    assert_eq!(TypeName::bool().to_string(), "bool");
    assert_eq!(
        TypeName::function(TypeName::int(), vec![TypeName::int(), TypeName::char().pointer()])
            .pointer()
            .to_string(),
        "int (int, char*)*"
    );
}

#[test]
fn test_signature_display_shows_defaults() {
    let sig = Signature::new(
        TypeName::Void,
        vec![
            ParamDecl::new("dx", TypeName::int()),
            ParamDecl::new("dy", TypeName::int()).with_default(Value::Int16(0)),
        ],
    );
    assert_eq!(sig.to_string(), "void (int dx, int dy = 0)");
}

#[test]
fn test_qualified_name() {
    let body = Block::default();
    let free = FunctionDef::new("main", Signature::new(TypeName::Void, vec![]), body.clone());
    let method = FunctionDef::method("Point", "move", Signature::new(TypeName::Void, vec![]), body);
    assert_eq!(free.qualified_name(), "main");
    assert_eq!(method.qualified_name(), "Point::move");
}

#[test]
fn test_struct_builder_keeps_declaration_order() {
    let decl = StructDecl::new("Point")
        .field("x", TypeName::int())
        .method("move", Signature::new(TypeName::Void, vec![]))
        .field("y", TypeName::int());
    let names: Vec<&str> = decl
        .members
        .iter()
        .map(|m| match m {
            MemberDecl::Field { name, .. } | MemberDecl::Method { name, .. } => name.as_str(),
        })
        .collect();
    assert_eq!(names, vec!["x", "move", "y"]);
}
