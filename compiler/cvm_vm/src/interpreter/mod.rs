//! The bytecode interpreter.
//!
//! # Calls
//!
//! `Call(argc)` pops, in order:
//!
//! 1. the callee address
//! 2. the receiver pointer, for instance methods
//! 3. `argc` arguments, last argument first
//!
//! A compiled callee gets a fresh zeroed frame directly above its caller's,
//! with the receiver in slot 0 and the arguments in the parameter slots. An
//! intrinsic runs on the spot against a [`Host`](cvm_types::Host) view of
//! the arguments, memory and operand stack.
//!
//! `Return` pops the result (for non-`void` functions), discards whatever
//! the callee left on the operand stack and pushes the result back for the
//! caller.

mod host;

use cvm_codegen::{Executable, FunctionBody, Instruction};
use cvm_ir::{Address, Value};
use cvm_types::InternalCallback;
use smallvec::SmallVec;

use crate::operators::{self, Arith, Compare};
use crate::VmError;
use host::HostCall;

/// Interpreter limits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Maximum call depth, including the entry frame.
    pub max_frames: usize,
    /// Cells reserved for frames above the globals.
    pub stack_cells: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_frames: 256,
            stack_cells: 16 * 1024,
        }
    }
}

/// Whether the entry function has returned.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Running,
    Finished,
}

#[derive(Clone, Debug)]
struct Frame {
    function: Address,
    ip: usize,
    /// Memory address of slot 0.
    base: Address,
    /// First memory cell above this frame.
    end: Address,
    /// Operand stack height when the frame was entered.
    stack_base: usize,
}

pub struct Interpreter {
    executable: Executable,
    config: InterpreterConfig,
    memory: Vec<Value>,
    stack: Vec<Value>,
    frames: Vec<Frame>,
    result: Option<Value>,
    steps: u64,
}

impl Interpreter {
    pub fn new(executable: Executable, config: InterpreterConfig) -> Self {
        let mut interpreter = Interpreter {
            executable,
            config,
            memory: Vec::new(),
            stack: Vec::new(),
            frames: Vec::new(),
            result: None,
            steps: 0,
        };
        interpreter.clear_memory();
        interpreter
    }

    pub fn executable(&self) -> &Executable {
        &self.executable
    }

    pub fn memory(&self) -> &[Value] {
        &self.memory
    }

    /// Operand stack, bottom first.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Current call depth.
    pub fn frames(&self) -> usize {
        self.frames.len()
    }

    /// Value returned by the entry function of the last completed run.
    pub fn result(&self) -> Option<Value> {
        self.result
    }

    /// Instructions executed since the last reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn clear_memory(&mut self) {
        self.memory.clear();
        self.memory
            .extend(self.executable.globals().iter().map(|kind| kind.zero()));
        self.memory
            .resize(self.memory.len() + self.config.stack_cells, Value::default());
    }

    /// Prepare to run `entry`: globals are zeroed and the global
    /// initialisers are scheduled ahead of the entry function.
    pub fn reset(&mut self, entry: &str) -> Result<(), VmError> {
        let address = self
            .executable
            .find_function(entry)
            .ok_or_else(|| VmError::EntryNotFound(entry.to_owned()))?;
        let is_compiled = self
            .executable
            .function(address)
            .is_some_and(|f| f.compiled().is_some() && !f.ty.is_instance);
        if !is_compiled {
            return Err(VmError::NotCallable(Value::Pointer(address)));
        }

        self.clear_memory();
        self.stack.clear();
        self.frames.clear();
        self.result = None;
        self.steps = 0;

        self.push_frame(address, None, &[])?;
        let init = self.executable.init_function();
        self.push_frame(init, None, &[])?;
        tracing::debug!(entry, address, "interpreter reset");
        Ok(())
    }

    /// Run until the entry function returns.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(&mut self) -> Result<Option<Value>, VmError> {
        while self.step()? == Status::Running {}
        Ok(self.result)
    }

    /// Run at most `limit` more instructions.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn run_with_limit(&mut self, limit: u64) -> Result<Option<Value>, VmError> {
        for _ in 0..limit {
            if self.step()? == Status::Finished {
                return Ok(self.result);
            }
        }
        if self.frames.is_empty() {
            return Ok(self.result);
        }
        Err(VmError::StepLimit(limit))
    }

    /// Execute one instruction.
    pub fn step(&mut self) -> Result<Status, VmError> {
        let frame = self.frames.last_mut().ok_or(VmError::NotRunning)?;
        let function = frame.function;
        let ip = frame.ip;
        frame.ip += 1;
        let instruction = self
            .executable
            .function(function)
            .and_then(|f| f.compiled())
            .and_then(|c| c.code.get(ip))
            .cloned();
        let Some(instruction) = instruction else {
            let name = self
                .executable
                .function(function)
                .map(|f| f.name.clone())
                .unwrap_or_default();
            return Err(VmError::MissingReturn { function: name });
        };
        self.steps += 1;
        tracing::trace!(function, ip, %instruction, "step");
        self.execute(instruction)
    }

    fn execute(&mut self, instruction: Instruction) -> Result<Status, VmError> {
        match instruction {
            Instruction::LoadConstant(value) => self.stack.push(value),
            Instruction::LoadLocal(slot) => {
                let address = self.local(slot)?;
                let value = self.load(address)?;
                self.stack.push(value);
            }
            Instruction::StoreLocal(slot) => {
                let address = self.local(slot)?;
                let value = self.pop()?;
                self.store(address, value)?;
            }
            Instruction::LoadLocalAddress(slot) => {
                let address = self.local(slot)?;
                self.stack.push(Value::Pointer(address));
            }
            Instruction::LoadGlobal(address) => {
                let value = self.load(address)?;
                self.stack.push(value);
            }
            Instruction::StoreGlobal(address) => {
                let value = self.pop()?;
                self.store(address, value)?;
            }
            Instruction::LoadGlobalAddress(address) => {
                self.stack.push(Value::Pointer(address));
            }
            Instruction::LoadPointer => {
                let address = self.pop_address()?;
                let value = self.load(address)?;
                self.stack.push(value);
            }
            Instruction::StorePointer => {
                let address = self.pop_address()?;
                let value = self.pop()?;
                self.store(address, value)?;
            }
            Instruction::OffsetPointer(cells) => {
                let pointer = self.pop()?;
                let width = self.executable.pointer_size();
                self.stack
                    .push(operators::offset_pointer(pointer, i64::from(cells), width)?);
            }
            Instruction::AddPointer(stride) | Instruction::SubPointer(stride) => {
                let offset = self.pop()?.as_i64().wrapping_mul(i64::from(stride));
                let pointer = self.pop()?;
                let offset = if matches!(instruction, Instruction::SubPointer(_)) {
                    offset.wrapping_neg()
                } else {
                    offset
                };
                let width = self.executable.pointer_size();
                self.stack.push(operators::offset_pointer(pointer, offset, width)?);
            }
            Instruction::Dup => {
                let value = *self.stack.last().ok_or(VmError::StackUnderflow)?;
                self.stack.push(value);
            }
            Instruction::Pop => {
                self.pop()?;
            }
            Instruction::Convert(kind) => {
                let value = self.pop()?;
                self.stack.push(value.convert(kind));
            }
            Instruction::Add => self.arithmetic(Arith::Add)?,
            Instruction::Sub => self.arithmetic(Arith::Sub)?,
            Instruction::Mul => self.arithmetic(Arith::Mul)?,
            Instruction::Div => self.arithmetic(Arith::Div)?,
            Instruction::Mod => self.arithmetic(Arith::Mod)?,
            Instruction::BitAnd => self.arithmetic(Arith::BitAnd)?,
            Instruction::BitOr => self.arithmetic(Arith::BitOr)?,
            Instruction::BitXor => self.arithmetic(Arith::BitXor)?,
            Instruction::Shl => self.arithmetic(Arith::Shl)?,
            Instruction::Shr => self.arithmetic(Arith::Shr)?,
            Instruction::Eq => self.compare(Compare::Eq)?,
            Instruction::Ne => self.compare(Compare::Ne)?,
            Instruction::Lt => self.compare(Compare::Lt)?,
            Instruction::Le => self.compare(Compare::Le)?,
            Instruction::Gt => self.compare(Compare::Gt)?,
            Instruction::Ge => self.compare(Compare::Ge)?,
            Instruction::Neg => {
                let value = self.pop()?;
                self.stack.push(operators::negate(value)?);
            }
            Instruction::BitNot => {
                let value = self.pop()?;
                self.stack.push(operators::bit_not(value)?);
            }
            Instruction::LogicalNot => {
                let value = self.pop()?;
                self.stack
                    .push(operators::logical_not(value, self.executable.int_kind()));
            }
            Instruction::Jump(target) => self.jump(target),
            Instruction::BranchIfFalse(target) => {
                if !self.pop()?.is_truthy() {
                    self.jump(target);
                }
            }
            Instruction::Call(argc) => self.call(argc)?,
            Instruction::Return => return self.ret(),
        }
        Ok(Status::Running)
    }

    // Operand stack

    fn pop(&mut self) -> Result<Value, VmError> {
        let frame_floor = self.frames.last().map_or(0, |f| f.stack_base);
        if self.stack.len() <= frame_floor {
            return Err(VmError::StackUnderflow);
        }
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    fn pop_address(&mut self) -> Result<Address, VmError> {
        Ok(self.pop()?.as_pointer())
    }

    fn arithmetic(&mut self, op: Arith) -> Result<(), VmError> {
        let right = self.pop()?;
        let left = self.pop()?;
        self.stack.push(operators::arithmetic(op, left, right)?);
        Ok(())
    }

    fn compare(&mut self, op: Compare) -> Result<(), VmError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let result = operators::compare(op, left, right, self.executable.int_kind())?;
        self.stack.push(result);
        Ok(())
    }

    fn jump(&mut self, target: usize) {
        if let Some(frame) = self.frames.last_mut() {
            frame.ip = target;
        }
    }

    // Memory

    fn local(&self, slot: u32) -> Result<Address, VmError> {
        let frame = self.frames.last().ok_or(VmError::NotRunning)?;
        let address = frame.base.saturating_add(slot);
        if address >= frame.end {
            return Err(VmError::InvalidAddress(address));
        }
        Ok(address)
    }

    fn load(&self, address: Address) -> Result<Value, VmError> {
        if address == 0 {
            return Err(VmError::InvalidAddress(address));
        }
        self.memory
            .get(address as usize)
            .copied()
            .ok_or(VmError::InvalidAddress(address))
    }

    fn store(&mut self, address: Address, value: Value) -> Result<(), VmError> {
        if address == 0 {
            return Err(VmError::InvalidAddress(address));
        }
        let cell = self
            .memory
            .get_mut(address as usize)
            .ok_or(VmError::InvalidAddress(address))?;
        *cell = value;
        Ok(())
    }

    // Calls

    fn call(&mut self, argc: u32) -> Result<(), VmError> {
        let callee = self.pop()?;
        let Value::Pointer(address) = callee else {
            return Err(VmError::NotCallable(callee));
        };
        let function = self
            .executable
            .function(address)
            .ok_or(VmError::NotCallable(callee))?;
        let is_instance = function.ty.is_instance;
        let body = function.body.clone();
        let receiver = if is_instance {
            Some(self.pop()?)
        } else {
            None
        };

        let argc = argc as usize;
        let floor = self.frames.last().map_or(0, |f| f.stack_base);
        if self.stack.len() < floor + argc {
            return Err(VmError::StackUnderflow);
        }
        let args: SmallVec<[Value; 8]> = self.stack.drain(self.stack.len() - argc..).collect();

        match body {
            FunctionBody::Compiled(_) => self.push_frame(address, receiver, &args),
            FunctionBody::Internal(callback) => {
                let returns_value = self
                    .executable
                    .function(address)
                    .is_some_and(|f| !f.ty.return_type.is_void());
                self.call_internal(address, &callback, &args, returns_value)
            }
        }
    }

    fn call_internal(
        &mut self,
        address: Address,
        callback: &InternalCallback,
        args: &[Value],
        returns_value: bool,
    ) -> Result<(), VmError> {
        let height = self.stack.len();
        tracing::debug!(address, args = args.len(), "host call");
        let mut host = HostCall {
            args,
            memory: &mut self.memory,
            stack: &mut self.stack,
        };
        callback(&mut host)?;

        // An intrinsic leaves exactly its result, like a compiled call.
        if returns_value {
            if self.stack.len() == height {
                let zero = self
                    .executable
                    .function(address)
                    .and_then(|f| f.ty.return_type.value_kind())
                    .map_or(Value::default(), |kind| kind.zero());
                self.stack.push(zero);
            } else if self.stack.len() > height + 1 {
                let result = self.stack.pop().ok_or(VmError::StackUnderflow)?;
                self.stack.truncate(height);
                self.stack.push(result);
            }
        } else {
            self.stack.truncate(height);
        }
        Ok(())
    }

    fn push_frame(
        &mut self,
        address: Address,
        receiver: Option<Value>,
        args: &[Value],
    ) -> Result<(), VmError> {
        let function = self
            .executable
            .function(address)
            .ok_or(VmError::NotCallable(Value::Pointer(address)))?;
        let compiled = function
            .compiled()
            .ok_or(VmError::NotCallable(Value::Pointer(address)))?;

        if self.frames.len() >= self.config.max_frames {
            return Err(VmError::StackOverflow {
                depth: self.frames.len(),
            });
        }
        let base = match self.frames.last() {
            Some(caller) => caller.end,
            None => Address::try_from(self.executable.globals().len())
                .map_err(|_| VmError::StackOverflow { depth: 0 })?,
        };
        let cells = Address::try_from(compiled.frame.len()).unwrap_or(Address::MAX);
        let end = base.saturating_add(cells);
        if end as usize > self.memory.len() {
            return Err(VmError::StackOverflow {
                depth: self.frames.len(),
            });
        }

        let start = base as usize;
        for (cell, kind) in self.memory[start..end as usize]
            .iter_mut()
            .zip(&compiled.frame)
        {
            *cell = kind.zero();
        }
        let first_param = match receiver {
            Some(this) => {
                self.memory[start] = this;
                start + 1
            }
            None => start,
        };
        for (i, arg) in args.iter().enumerate() {
            if let Some(cell) = self.memory.get_mut(first_param + i) {
                *cell = *arg;
            }
        }

        tracing::trace!(name = %function.name, base, end, "enter");
        self.frames.push(Frame {
            function: address,
            ip: 0,
            base,
            end,
            stack_base: self.stack.len(),
        });
        Ok(())
    }

    fn ret(&mut self) -> Result<Status, VmError> {
        let returns_value = self
            .frames
            .last()
            .and_then(|f| self.executable.function(f.function))
            .is_some_and(|f| !f.ty.return_type.is_void());
        let result = if returns_value {
            Some(self.pop()?)
        } else {
            None
        };
        let frame = self.frames.pop().ok_or(VmError::NotRunning)?;
        self.stack.truncate(frame.stack_base);

        if self.frames.is_empty() {
            tracing::debug!(steps = self.steps, ?result, "entry returned");
            self.result = result;
            return Ok(Status::Finished);
        }
        if let Some(value) = result {
            self.stack.push(value);
        }
        Ok(Status::Running)
    }
}
