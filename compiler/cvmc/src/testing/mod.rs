//! A test target with assertion intrinsics.
//!
//! [`test_machine`] builds a 16-bit-int machine (1, 2, 2, 4, 8, 4, 8, 8, 2)
//! whose intrinsics let C programs check themselves:
//!
//! - `assertAreEqual`, `assertU16AreEqual`, `assert32AreEqual`,
//!   `assertU32AreEqual`, `assertBoolsAreEqual` compare at a fixed width
//! - `assertFloatsAreEqual` and `assertDoublesAreEqual` compare within a
//!   tolerance
//! - `memcmp` compares byte cells and `memset` fills them
//! - `print` appends a value to a shared [`PrintBuffer`]
//!
//! A failed assertion stops the interpreter with
//! [`HostError::AssertionFailed`].

use std::sync::Arc;

use cvm_ir::{Value, ValueKind};
use cvm_types::{Host, HostError, MachineInfo, SignatureError};
use parking_lot::Mutex;

/// Output captured from `print` calls.
#[derive(Debug, Default)]
pub struct PrintBuffer {
    buffer: Mutex<String>,
}

impl PrintBuffer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_line(&self, line: &str) {
        let mut buffer = self.buffer.lock();
        buffer.push_str(line);
        buffer.push('\n');
    }

    /// Everything printed so far.
    pub fn output(&self) -> String {
        self.buffer.lock().clone()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

fn assert_same_at(host: &dyn Host, kind: ValueKind) -> Result<(), HostError> {
    let expected = host.read_arg(0)?.convert(kind);
    let actual = host.read_arg(1)?.convert(kind);
    if expected == actual {
        Ok(())
    } else {
        Err(HostError::AssertionFailed {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

fn assert_close(host: &dyn Host, tolerance: f64) -> Result<(), HostError> {
    let expected = host.read_arg(0)?.as_f64();
    let actual = host.read_arg(1)?.as_f64();
    if (expected - actual).abs() <= tolerance {
        Ok(())
    } else {
        Err(HostError::AssertionFailed {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Compare `n` byte cells starting at two addresses.
///
/// Returns the difference of the first unequal pair, or zero.
fn memcmp(host: &dyn Host) -> Result<i64, HostError> {
    let left = host.read_arg(0)?.as_pointer();
    let right = host.read_arg(1)?.as_pointer();
    let count = host.read_arg(2)?.as_i64();
    let mut offset = 0;
    while i64::from(offset) < count {
        let a = host.read_memory(left + offset)?.convert(ValueKind::UInt8).as_i64();
        let b = host.read_memory(right + offset)?.convert(ValueKind::UInt8).as_i64();
        if a != b {
            return Ok(a - b);
        }
        offset += 1;
    }
    Ok(0)
}

/// Store `c` into `n` cells starting at an address.
///
/// Each cell keeps its representation; `c` is converted to it.
fn memset(host: &mut dyn Host) -> Result<(), HostError> {
    let start = host.read_arg(0)?.as_pointer();
    let fill = host.read_arg(1)?;
    let count = host.read_arg(2)?.as_i64();
    let mut offset = 0;
    while i64::from(offset) < count {
        let cell = host.read_memory(start + offset)?;
        host.write_memory(start + offset, fill.convert(cell.kind()))?;
        offset += 1;
    }
    Ok(())
}

/// The test target, with `print` writing into `output`.
pub fn test_machine(output: &Arc<PrintBuffer>) -> Result<MachineInfo, SignatureError> {
    let mut machine = MachineInfo::default();
    machine.int_size = 2;
    machine.long_int_size = 4;
    machine.pointer_size = 2;

    let int_kind = ValueKind::integer(machine.int_size, true).unwrap_or(ValueKind::Int16);

    machine.add_internal_function("void assertAreEqual (int expected, int actual)", |host| {
        assert_same_at(host, ValueKind::Int16)
    })?;
    machine.add_internal_function(
        "void assertU16AreEqual (unsigned int expected, unsigned int actual)",
        |host| assert_same_at(host, ValueKind::UInt16),
    )?;
    machine.add_internal_function("void assert32AreEqual (long expected, long actual)", |host| {
        assert_same_at(host, ValueKind::Int32)
    })?;
    machine.add_internal_function(
        "void assertU32AreEqual (unsigned long expected, unsigned long actual)",
        |host| assert_same_at(host, ValueKind::UInt32),
    )?;
    machine.add_internal_function("void assertBoolsAreEqual (bool expected, bool actual)", |host| {
        assert_same_at(host, ValueKind::Int32)
    })?;
    machine.add_internal_function(
        "void assertFloatsAreEqual (float expected, float actual)",
        |host| assert_close(host, 1.0e-6),
    )?;
    machine.add_internal_function(
        "void assertDoublesAreEqual (double expected, double actual)",
        |host| assert_close(host, 1.0e-12),
    )?;
    machine.add_internal_function("int memcmp (void* s1, void* s2, int n)", move |host| {
        let difference = memcmp(host)?;
        host.push(Value::Int64(difference).convert(int_kind));
        Ok(())
    })?;
    machine.add_internal_function("void memset (void* s, int c, int n)", memset)?;

    let output = Arc::clone(output);
    machine.add_internal_function("void print (long value)", move |host| {
        let value = host.read_arg(0)?;
        output.push_line(&value.to_string());
        Ok(())
    })?;

    Ok(machine)
}
