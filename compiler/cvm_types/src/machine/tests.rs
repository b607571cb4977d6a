#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use super::*;
use pretty_assertions::assert_eq;

fn noop(_: &mut dyn Host) -> Result<(), HostError> {
    Ok(())
}

#[test]
fn test_arduino_widths() {
    let m = MachineInfo::arduino();
    assert_eq!(m.size_of(BasicTypeName::Char), 1);
    assert_eq!(m.size_of(BasicTypeName::Int), 2);
    assert_eq!(m.size_of(BasicTypeName::LongInt), 4);
    assert_eq!(m.size_of(BasicTypeName::Double), 4);
    assert_eq!(m.pointer_size, 2);
    assert!(m.validate().is_ok());
}

#[test]
fn test_default_is_valid() {
    assert!(MachineInfo::default().validate().is_ok());
    assert_eq!(MachineInfo::default().size_of(BasicTypeName::Int), 4);
}

#[test]
fn test_bool_takes_char_width() {
    let m = MachineInfo {
        char_size: 2,
        short_int_size: 2,
        ..MachineInfo::default()
    };
    assert_eq!(m.size_of(BasicTypeName::Bool), 2);
}

#[test]
fn test_validate_rejects_odd_widths() {
    let m = MachineInfo {
        int_size: 3,
        ..MachineInfo::default()
    };
    assert_eq!(
        m.validate(),
        Err(MachineError::IntegerWidth { ty: "int", size: 3 })
    );

    let m = MachineInfo {
        double_size: 2,
        ..MachineInfo::default()
    };
    assert_eq!(
        m.validate(),
        Err(MachineError::FloatWidth {
            ty: "double",
            size: 2
        })
    );
}

#[test]
fn test_validate_rejects_shrinking_integers() {
    let m = MachineInfo {
        long_int_size: 2,
        ..MachineInfo::default()
    };
    assert_eq!(
        m.validate(),
        Err(MachineError::Ordering {
            narrower: "int",
            narrower_size: 4,
            wider: "long",
            wider_size: 2,
        })
    );
}

#[test]
fn test_add_internal_function_registers_overloads() {
    let mut m = MachineInfo::arduino();
    m.add_internal_function("void assertAreEqual (int expected, int actual)", noop)
        .unwrap();
    m.add_internal_function("void assertAreEqual (long expected, long actual)", noop)
        .unwrap();
    let names: Vec<&str> = m.internal_functions().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["assertAreEqual", "assertAreEqual"]);
    assert_eq!(m.internal_functions()[1].signature.params[0].ty.to_string(), "long");
}

#[test]
fn test_add_internal_function_rejects_garbage() {
    let mut m = MachineInfo::default();
    let err = m.add_internal_function("int (", noop);
    assert!(err.is_err());
    assert!(m.internal_functions().is_empty());
}

#[test]
fn test_callbacks_are_shared_on_clone() {
    let mut m = MachineInfo::default();
    m.add_internal_function("void f ()", noop)
        .unwrap();
    let copy = m.clone();
    assert!(std::sync::Arc::ptr_eq(
        &m.internal_functions()[0].callback,
        &copy.internal_functions()[0].callback
    ));
}

#[test]
fn test_host_error_messages() {
    assert_eq!(
        HostError::InvalidAddress(0x2a).to_string(),
        "invalid memory address 0x002a"
    );
    assert_eq!(
        HostError::AssertionFailed {
            expected: "32".into(),
            actual: "33".into()
        }
        .to_string(),
        "assertion failed: expected 32, got 33"
    );
}
