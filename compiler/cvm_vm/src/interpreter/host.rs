//! The window intrinsics get into a running interpreter.

use cvm_ir::{Address, Value};
use cvm_types::{Host, HostError};

/// Arguments of one intrinsic call plus mutable access to memory and the
/// operand stack.
pub(super) struct HostCall<'i> {
    pub(super) args: &'i [Value],
    pub(super) memory: &'i mut [Value],
    pub(super) stack: &'i mut Vec<Value>,
}

impl HostCall<'_> {
    fn check(&self, address: Address) -> Result<usize, HostError> {
        let index = address as usize;
        if address == 0 || index >= self.memory.len() {
            return Err(HostError::InvalidAddress(address));
        }
        Ok(index)
    }
}

impl Host for HostCall<'_> {
    fn read_arg(&self, index: usize) -> Result<Value, HostError> {
        self.args
            .get(index)
            .copied()
            .ok_or(HostError::ArgumentOutOfRange {
                index,
                count: self.args.len(),
            })
    }

    fn read_memory(&self, address: Address) -> Result<Value, HostError> {
        let index = self.check(address)?;
        Ok(self.memory[index])
    }

    fn write_memory(&mut self, address: Address, value: Value) -> Result<(), HostError> {
        let index = self.check(address)?;
        self.memory[index] = value;
        Ok(())
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }
}
