//! Code Unit Representation
//!
//! An immutable bundle of four parallel streams: operation bytes, constants,
//! variable names and operand indices. Operand indices are consumed in order,
//! one per operand-bearing operation; the producer is responsible for keeping
//! the two aligned.

use crate::error::{DriftError, DriftResult};
use crate::vm::value::Value;

use super::opcode::OpCode;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeUnit {
    operations: Vec<u8>,
    constants: Vec<Value>,
    names: Vec<String>,
    operands: Vec<usize>,
}

impl CodeUnit {
    /// Bundle the four streams as given. No validation is performed.
    pub fn new(
        operations: Vec<u8>,
        constants: Vec<Value>,
        names: Vec<String>,
        operands: Vec<usize>,
    ) -> Self {
        CodeUnit {
            operations,
            constants,
            names,
            operands,
        }
    }

    pub fn operations(&self) -> &[u8] {
        &self.operations
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The operand-index template. Frames copy it; nothing ever drains it.
    pub fn operands(&self) -> &[usize] {
        &self.operands
    }

    pub fn constant(&self, index: usize) -> DriftResult<&Value> {
        self.constants
            .get(index)
            .ok_or(DriftError::InvalidConstantAccess(index))
    }

    pub fn name(&self, index: usize) -> DriftResult<&str> {
        self.names
            .get(index)
            .map(String::as_str)
            .ok_or(DriftError::InvalidNameAccess(index))
    }

    /// Number of operations that dequeue an operand index.
    ///
    /// Bytes that do not decode are not counted.
    pub fn operand_ops(&self) -> usize {
        self.operations
            .iter()
            .filter_map(|&b| OpCode::from_u8(b))
            .filter(|op| op.has_operand())
            .count()
    }

    /// Check that every operand-bearing operation has exactly one operand index
    pub fn check_alignment(&self) -> DriftResult<()> {
        let operations = self.operand_ops();
        if operations != self.operands.len() {
            return Err(DriftError::OperandMisalignment {
                operations,
                operands: self.operands.len(),
            });
        }
        Ok(())
    }
}

/// Incremental producer for code units.
///
/// Records operand indices alongside the operations that consume them, so
/// units built here are aligned by construction.
#[derive(Debug, Default)]
pub struct CodeUnitBuilder {
    unit: CodeUnit,
}

impl CodeUnitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation that takes no operand
    pub fn emit(&mut self, op: OpCode) -> &mut Self {
        debug_assert!(!op.has_operand(), "{op} needs an operand");
        self.unit.operations.push(op as u8);
        self
    }

    /// Append an operation together with its operand index
    pub fn emit_with(&mut self, op: OpCode, index: usize) -> &mut Self {
        debug_assert!(op.has_operand(), "{op} takes no operand");
        self.unit.operations.push(op as u8);
        self.unit.operands.push(index);
        self
    }

    /// Add a constant to the pool and return its index
    pub fn constant(&mut self, value: impl Into<Value>) -> usize {
        self.unit.constants.push(value.into());
        self.unit.constants.len() - 1
    }

    /// Intern a variable name and return its index
    pub fn name(&mut self, name: &str) -> usize {
        if let Some(index) = self.unit.names.iter().position(|n| n == name) {
            return index;
        }
        self.unit.names.push(name.to_string());
        self.unit.names.len() - 1
    }

    /// `LoadConst` of a fresh constant
    pub fn load_const(&mut self, value: impl Into<Value>) -> &mut Self {
        let index = self.constant(value);
        self.emit_with(OpCode::LoadConst, index)
    }

    pub fn load_var(&mut self, name: &str) -> &mut Self {
        let index = self.name(name);
        self.emit_with(OpCode::LoadVar, index)
    }

    pub fn store_var(&mut self, name: &str) -> &mut Self {
        let index = self.name(name);
        self.emit_with(OpCode::StoreVar, index)
    }

    /// `Call` with the argument count supplied at the call site
    pub fn call(&mut self, supplied: usize) -> &mut Self {
        self.emit_with(OpCode::Call, supplied)
    }

    pub fn build(&mut self) -> CodeUnit {
        std::mem::take(&mut self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_operands_aligned() {
        let unit = CodeUnitBuilder::new()
            .load_const(3.0)
            .store_var("x")
            .load_var("x")
            .emit(OpCode::Output)
            .emit(OpCode::Discard)
            .load_const(Value::None)
            .emit(OpCode::Return)
            .build();

        assert_eq!(unit.operand_ops(), 4);
        assert_eq!(unit.operands(), &[0, 0, 0, 1]);
        assert_eq!(unit.names(), &["x".to_string()]);
        assert!(unit.check_alignment().is_ok());
    }

    #[test]
    fn names_are_interned() {
        let mut builder = CodeUnitBuilder::new();
        assert_eq!(builder.name("a"), 0);
        assert_eq!(builder.name("b"), 1);
        assert_eq!(builder.name("a"), 0);
    }

    #[test]
    fn misaligned_unit_is_reported() {
        let unit = CodeUnit::new(
            vec![OpCode::LoadConst as u8, OpCode::LoadConst as u8, OpCode::Add as u8],
            vec![Value::Number(1.0)],
            Vec::new(),
            vec![0],
        );
        assert_eq!(
            unit.check_alignment(),
            Err(DriftError::OperandMisalignment {
                operations: 2,
                operands: 1,
            })
        );
    }

    #[test]
    fn out_of_range_lookups_fail() {
        let unit = CodeUnit::default();
        assert_eq!(unit.constant(0), Err(DriftError::InvalidConstantAccess(0)));
        assert_eq!(unit.name(3), Err(DriftError::InvalidNameAccess(3)));
    }
}
