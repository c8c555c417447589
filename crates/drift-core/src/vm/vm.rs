//! Virtual Machine Core
//!
//! Defines the Drift virtual machine structure and execution loop.
//!
//! Execution always operates on the top frame. A `Call` pushes a frame for
//! the callee, re-enters the loop on it, pops it and pushes whatever it
//! returned onto the caller's stack. Return values travel back on the Rust
//! return path; there is no shared "last value" slot.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::bytecode::opcode::OpCode;
use crate::bytecode::unit::CodeUnit;
use crate::config::VmConfig;
use crate::error::{DriftError, Fault, Resource, StackRole};

use super::frame::{Frame, MAIN_UNIT};
use super::guard::ensure_sufficient_stack;
use super::observer::Observer;
use super::output::OutputSink;
use super::value::Value;

/// What the loop does after an operation
enum Flow {
    Continue,
    Return(Value),
}

/// Why a step stopped early
enum Interrupt {
    /// Raised by the current operation; the fault context is added here
    Error(DriftError),
    /// Raised in a callee; already carries its own context
    Fault(Fault),
}

impl From<DriftError> for Interrupt {
    fn from(err: DriftError) -> Self {
        Interrupt::Error(err)
    }
}

/// Drift Virtual Machine
pub struct VirtualMachine {
    config: VmConfig,
    frames: Vec<Frame>,
    output: OutputSink,
    observer: Option<Box<dyn Observer>>,
}

impl VirtualMachine {
    /// Create a new VM instance writing `Output` to stdout
    pub fn new(config: VmConfig) -> Self {
        VirtualMachine {
            config,
            frames: Vec::new(),
            output: OutputSink::default(),
            observer: None,
        }
    }

    pub fn with_output(mut self, output: OutputSink) -> Self {
        self.output = output;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn output(&self) -> &OutputSink {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut OutputSink {
        &mut self.output
    }

    /// Frames still active; zero whenever `run` is not executing
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Run `code` as a top-level invocation.
    ///
    /// Yields the value of its `Return`, or `Value::None` if the operations
    /// run out first. The top-level frame is always admitted; the call-depth
    /// limit applies to the calls it makes.
    pub fn run(&mut self, code: impl Into<Rc<CodeUnit>>) -> Result<Value, Fault> {
        let frame = Frame::new(MAIN_UNIT, code.into(), self.config.max_stack_size);
        let returned = self.execute_frame(frame)?;
        Ok(returned.unwrap_or(Value::None))
    }

    /// Push `frame`, run it to completion and pop it again
    fn execute_frame(&mut self, frame: Frame) -> Result<Option<Value>, Fault> {
        self.frames.push(frame);
        let depth = self.frames.len();

        if let Some(frame) = self.frames.last() {
            debug!(unit = frame.name(), depth, "enter frame");
            if let Some(observer) = self.observer.as_deref_mut() {
                observer.on_enter(depth, frame);
            }
        }

        let result = self.execute();
        let frame = self.frames.pop();

        match (&result, frame) {
            (Ok(returned), Some(frame)) => {
                debug!(
                    unit = frame.name(),
                    depth,
                    residue = frame.stack().len(),
                    "exit frame"
                );
                if let Some(observer) = self.observer.as_deref_mut() {
                    observer.on_exit(depth, &frame, returned.as_ref());
                }
            }
            (Err(fault), _) if fault.depth == depth => {
                debug!(%fault, "frame faulted");
            }
            _ => {}
        }
        result
    }

    /// Execute the top frame until `Return` or the end of its operations
    fn execute(&mut self) -> Result<Option<Value>, Fault> {
        loop {
            let (ip, byte) = {
                let frame = self.frames.last().ok_or_else(|| Fault {
                    error: DriftError::NoActiveFrame,
                    ip: 0,
                    op: String::new(),
                    unit: String::new(),
                    depth: 0,
                })?;
                match frame.code.operations().get(frame.ip) {
                    Some(&byte) => (frame.ip, byte),
                    None => return Ok(None),
                }
            };

            let op = match OpCode::from_u8(byte) {
                Some(op) => op,
                None => {
                    let op = format!("0x{byte:02X}");
                    return Err(self.fault(DriftError::InvalidOpcode(byte), ip, op));
                }
            };

            let depth = self.frames.len();
            if let (Some(observer), Some(frame)) = (self.observer.as_deref_mut(), self.frames.last()) {
                observer.on_step(depth, frame, ip, op);
            }
            trace!(ip, %op, depth, "step");

            match self.step(op) {
                Ok(flow) => {
                    if let Some(frame) = self.frames.last_mut() {
                        frame.ip += 1;
                    }
                    if let Flow::Return(value) = flow {
                        return Ok(Some(value));
                    }
                }
                Err(Interrupt::Error(error)) => {
                    return Err(self.fault(error, ip, op.mnemonic().to_string()));
                }
                Err(Interrupt::Fault(fault)) => return Err(fault),
            }
        }
    }

    /// Apply one operation to the top frame
    fn step(&mut self, op: OpCode) -> Result<Flow, Interrupt> {
        match op {
            OpCode::LoadVar => {
                let frame = self.top_mut()?;
                let index = frame.next_operand()?;
                let value = frame.locals.load(frame.code.name(index)?)?;
                frame.push(value)?;
            }
            OpCode::LoadConst => {
                let frame = self.top_mut()?;
                let index = frame.next_operand()?;
                let value = frame.code.constant(index)?.clone();
                frame.push(value)?;
            }
            OpCode::StoreVar => {
                let frame = self.top_mut()?;
                let value = frame.pop()?;
                let index = frame.next_operand()?;
                let name = frame.code.name(index)?.to_string();
                frame.locals.store(name, value);
            }

            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div => {
                let frame = self.top_mut()?;
                let right = frame.pop()?;
                let left = frame.pop()?;
                frame.push(arithmetic(op, &left, &right)?)?;
            }
            OpCode::IncrementTop | OpCode::DecrementTop => {
                let frame = self.top_mut()?;
                let value = frame.pop()?;
                let n = value.as_number().ok_or_else(|| DriftError::TypeMismatch {
                    op,
                    found: value.describe(),
                })?;
                let delta = if op == OpCode::IncrementTop { 1.0 } else { -1.0 };
                frame.push(Value::Number(n + delta))?;
            }

            OpCode::Output => {
                let line = self.top_mut()?.peek()?.to_string();
                self.output.emit(&line)?;
            }
            OpCode::Discard => {
                self.top_mut()?.pop()?;
            }

            OpCode::Call => self.call()?,

            OpCode::Return => {
                let value = self.top_mut()?.pop()?;
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Continue)
    }

    fn call(&mut self) -> Result<(), Interrupt> {
        let max_stack_size = self.config.max_stack_size;
        let frame = self.top_mut()?;

        let function = match frame.pop()? {
            Value::Function(function) => function,
            other => {
                return Err(DriftError::TypeMismatch {
                    op: OpCode::Call,
                    found: other.describe(),
                }
                .into())
            }
        };
        let supplied = frame.next_operand()?;

        let mut callee = Frame::new(function.name.clone(), Rc::clone(&function.code), max_stack_size);

        // Zero means the call site passes nothing; arity is not checked.
        if supplied != 0 {
            if supplied != function.arity {
                return Err(DriftError::ArityMismatch {
                    function: function.name.clone(),
                    expected: function.arity,
                    supplied,
                }
                .into());
            }
            if frame.stack.len() < supplied {
                return Err(DriftError::StackUnderflow(StackRole::Evaluation).into());
            }
            for index in 0..supplied {
                let param = function.code.name(index)?;
                let value = frame.pop()?;
                callee.locals.store(param, value);
            }
        }

        let limit = self.config.max_call_depth;
        if self.frames.len() >= limit {
            return Err(DriftError::ResourceExhaustion {
                resource: Resource::CallDepth,
                limit,
            }
            .into());
        }

        let returned =
            ensure_sufficient_stack(|| self.execute_frame(callee)).map_err(Interrupt::Fault)?;

        if let Some(value) = returned {
            self.top_mut()?.push(value)?;
        }
        Ok(())
    }

    fn top_mut(&mut self) -> Result<&mut Frame, DriftError> {
        self.frames.last_mut().ok_or(DriftError::NoActiveFrame)
    }

    fn fault(&self, error: DriftError, ip: usize, op: String) -> Fault {
        Fault {
            error,
            ip,
            op,
            unit: self
                .frames
                .last()
                .map(|frame| frame.name().to_string())
                .unwrap_or_default(),
            depth: self.frames.len(),
        }
    }
}

/// Two-operand arithmetic; only defined between numbers.
///
/// Division follows IEEE 754, so dividing by zero yields an infinity or NaN.
fn arithmetic(op: OpCode, left: &Value, right: &Value) -> Result<Value, DriftError> {
    let result = match (op, left, right) {
        (OpCode::Add, Value::Number(a), Value::Number(b)) => a + b,
        (OpCode::Sub, Value::Number(a), Value::Number(b)) => a - b,
        (OpCode::Mul, Value::Number(a), Value::Number(b)) => a * b,
        (OpCode::Div, Value::Number(a), Value::Number(b)) => a / b,
        _ => {
            return Err(DriftError::TypeMismatch {
                op,
                found: format!("{} and {}", left.describe(), right.describe()),
            })
        }
    };
    Ok(Value::Number(result))
}
