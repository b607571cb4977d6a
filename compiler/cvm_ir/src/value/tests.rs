use super::*;
use proptest::prelude::*;

#[test]
fn test_convert_truncates_to_low_byte() {
    assert_eq!(Value::Int16(0x2020).convert(ValueKind::Int8), Value::Int8(0x20));
    assert_eq!(Value::Int32(0x1ff).convert(ValueKind::UInt8), Value::UInt8(0xff));
    assert_eq!(Value::Int32(0x1ff).convert(ValueKind::Int8), Value::Int8(-1));
}

#[test]
fn test_convert_sign_and_zero_extension() {
    assert_eq!(Value::Int8(-2).convert(ValueKind::Int32), Value::Int32(-2));
    assert_eq!(Value::UInt8(0xfe).convert(ValueKind::Int32), Value::Int32(0xfe));
    assert_eq!(Value::Int8(-1).convert(ValueKind::UInt16), Value::UInt16(0xffff));
}

#[test]
fn test_convert_float_and_integer() {
    assert_eq!(Value::Float64(3.9).convert(ValueKind::Int16), Value::Int16(3));
    assert_eq!(Value::Float32(-2.5).convert(ValueKind::Int32), Value::Int32(-2));
    assert_eq!(Value::UInt32(u32::MAX).convert(ValueKind::Float64), Value::Float64(4_294_967_295.0));
    assert_eq!(Value::Int16(-7).convert(ValueKind::Float32), Value::Float32(-7.0));
}

#[test]
fn test_pointer_conversions() {
    assert_eq!(Value::Int16(0x40).convert(ValueKind::Pointer), Value::Pointer(0x40));
    assert_eq!(Value::Pointer(0x1234).convert(ValueKind::UInt8), Value::UInt8(0x34));
    assert_eq!(Value::NULL.as_pointer(), 0);
}

#[test]
fn test_equality_requires_same_representation() {
    assert_ne!(Value::Int16(1), Value::Int32(1));
    assert_eq!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));
    assert_ne!(Value::Float32(0.0), Value::Float32(-0.0));
}

#[test]
fn test_truthiness() {
    assert!(!Value::Int8(0).is_truthy());
    assert!(Value::UInt64(1 << 40).is_truthy());
    assert!(!Value::Float64(0.0).is_truthy());
    assert!(Value::Float32(0.5).is_truthy());
    assert!(!Value::NULL.is_truthy());
}

#[test]
fn test_kind_for_width() {
    assert_eq!(ValueKind::integer(2, true), Some(ValueKind::Int16));
    assert_eq!(ValueKind::integer(8, false), Some(ValueKind::UInt64));
    assert_eq!(ValueKind::integer(3, true), None);
    assert_eq!(ValueKind::float(4), Some(ValueKind::Float32));
    assert_eq!(ValueKind::float(2), None);
    assert_eq!(ValueKind::UInt32.zero(), Value::UInt32(0));
}

#[test]
fn test_display() {
    assert_eq!(Value::Int16(-3).to_string(), "-3");
    assert_eq!(Value::Pointer(0x2a).to_string(), "0x002a");
}

proptest! {
    #[test]
    fn prop_char_conversion_keeps_low_byte(v in any::<i32>()) {
        let converted = Value::Int32(v).convert(ValueKind::Int8);
        prop_assert_eq!(converted.to_bits(), u64::from(v.to_le_bytes()[0]));
    }

    #[test]
    fn prop_widening_is_reversible(v in any::<i16>()) {
        let wide = Value::Int16(v).convert(ValueKind::Int64);
        prop_assert_eq!(wide.convert(ValueKind::Int16), Value::Int16(v));
    }
}
