//! Activation Records
//!
//! A frame is the isolated mutable state of one call: its evaluation stack,
//! its locals and its own copy of the unit's operand-index queue. The code
//! unit itself is shared and never written.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::bytecode::unit::CodeUnit;
use crate::error::{DriftError, DriftResult, StackRole};

use super::stack::Stack;
use super::value::Value;

/// Name given to the frame of a top-level run
pub const MAIN_UNIT: &str = "<main>";

/// Local variables for a single call frame
#[derive(Debug, Default)]
pub struct Locals {
    values: BTreeMap<String, Value>,
}

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, name: &str) -> DriftResult<Value> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| DriftError::SymbolNotFound(name.to_string()))
    }

    /// Bind `name`, replacing any earlier binding
    pub fn store(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Bindings in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug)]
pub struct Frame {
    pub(crate) name: String,
    pub(crate) code: Rc<CodeUnit>,
    pub(crate) ip: usize,
    pub(crate) stack: Stack<Value>,
    pub(crate) operands: Stack<usize>,
    pub(crate) locals: Locals,
}

impl Frame {
    /// Build a frame with an undrained copy of the unit's operand indices
    pub fn new(name: impl Into<String>, code: Rc<CodeUnit>, max_stack_size: usize) -> Self {
        let mut operands = Stack::new();
        operands.copy_from(code.operands());
        Frame {
            name: name.into(),
            code,
            ip: 0,
            stack: Stack::bounded(max_stack_size),
            operands,
            locals: Locals::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared, read-only unit this frame executes
    pub fn code(&self) -> &CodeUnit {
        &self.code
    }

    /// Index of the next operation to execute
    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn stack(&self) -> &Stack<Value> {
        &self.stack
    }

    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    /// Operand indices not yet consumed by this frame
    pub fn pending_operands(&self) -> &Stack<usize> {
        &self.operands
    }

    pub(crate) fn push(&mut self, value: Value) -> DriftResult<()> {
        self.stack.push(value)
    }

    pub(crate) fn pop(&mut self) -> DriftResult<Value> {
        self.stack
            .pop_lifo()
            .ok_or(DriftError::StackUnderflow(StackRole::Evaluation))
    }

    pub(crate) fn peek(&self) -> DriftResult<&Value> {
        self.stack
            .peek()
            .ok_or(DriftError::StackUnderflow(StackRole::Evaluation))
    }

    /// Dequeue the operand index for the current operation
    pub(crate) fn next_operand(&mut self) -> DriftResult<usize> {
        self.operands
            .pop_fifo()
            .ok_or(DriftError::StackUnderflow(StackRole::OperandQueue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::unit::CodeUnitBuilder;
    use crate::bytecode::opcode::OpCode;

    #[test]
    fn missing_symbol_is_reported_by_name() {
        let locals = Locals::new();
        assert_eq!(locals.load("x"), Err(DriftError::SymbolNotFound("x".to_string())));
    }

    #[test]
    fn store_overwrites() {
        let mut locals = Locals::new();
        locals.store("x", Value::Number(1.0));
        locals.store("x", Value::string("two"));
        assert_eq!(locals.len(), 1);
        assert_eq!(locals.load("x"), Ok(Value::string("two")));
    }

    #[test]
    fn each_frame_gets_a_full_operand_queue() {
        let code = Rc::new(
            CodeUnitBuilder::new()
                .load_const(1.0)
                .load_const(2.0)
                .emit(OpCode::Add)
                .emit(OpCode::Return)
                .build(),
        );

        let mut first = Frame::new("f", Rc::clone(&code), 8);
        assert_eq!(first.next_operand(), Ok(0));
        assert_eq!(first.next_operand(), Ok(1));
        assert_eq!(
            first.next_operand(),
            Err(DriftError::StackUnderflow(StackRole::OperandQueue))
        );

        let second = Frame::new("f", Rc::clone(&code), 8);
        assert_eq!(second.pending_operands().len(), 2);
        assert_eq!(code.operands(), &[0, 1]);
    }

    #[test]
    fn empty_stack_underflows() {
        let mut frame = Frame::new(MAIN_UNIT, Rc::new(CodeUnit::default()), 8);
        assert_eq!(frame.pop(), Err(DriftError::StackUnderflow(StackRole::Evaluation)));
        assert!(frame.peek().is_err());
    }
}
