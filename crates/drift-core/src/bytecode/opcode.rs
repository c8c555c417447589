//! Bytecode Opcode Definitions
//!
//! Defines the operation set for Drift code units.
//! This file contains no execution semantics.
//! Opcode values are a wire contract; 0x0A is reserved.

use std::fmt;

use crate::error::DriftError;

/// Operation bytes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // Variables and constants
    LoadVar   = 0x00,
    LoadConst = 0x01,
    StoreVar  = 0x02,

    // Arithmetic
    Add = 0x03,
    Sub = 0x04,
    Mul = 0x05,
    Div = 0x06,

    // Stack
    Output  = 0x07,
    Discard = 0x08,

    // Calls
    Call = 0x09,

    // Unary arithmetic
    IncrementTop = 0x0B,
    DecrementTop = 0x0C,

    Return = 0x0D,
}

impl OpCode {
    /// Convert raw byte to opcode
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(OpCode::LoadVar),
            0x01 => Some(OpCode::LoadConst),
            0x02 => Some(OpCode::StoreVar),

            0x03 => Some(OpCode::Add),
            0x04 => Some(OpCode::Sub),
            0x05 => Some(OpCode::Mul),
            0x06 => Some(OpCode::Div),

            0x07 => Some(OpCode::Output),
            0x08 => Some(OpCode::Discard),

            0x09 => Some(OpCode::Call),

            0x0B => Some(OpCode::IncrementTop),
            0x0C => Some(OpCode::DecrementTop),

            0x0D => Some(OpCode::Return),

            _ => None,
        }
    }

    /// Whether this operation dequeues one entry from the operand-index queue
    pub fn has_operand(self) -> bool {
        matches!(
            self,
            OpCode::LoadVar | OpCode::LoadConst | OpCode::StoreVar | OpCode::Call
        )
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::LoadVar => "LOAD",
            OpCode::LoadConst => "CONST",
            OpCode::StoreVar => "STORE",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::Output => "PUT",
            OpCode::Discard => "POP",
            OpCode::Call => "CALL",
            OpCode::IncrementTop => "INC",
            OpCode::DecrementTop => "DEC",
            OpCode::Return => "RET",
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = DriftError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OpCode::from_u8(byte).ok_or(DriftError::InvalidOpcode(byte))
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        op as u8
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_byte_decodes_to_itself() {
        for byte in 0u8..=0xFF {
            if let Some(op) = OpCode::from_u8(byte) {
                assert_eq!(op as u8, byte);
            }
        }
    }

    #[test]
    fn reserved_byte_is_rejected() {
        assert_eq!(OpCode::try_from(0x0A), Err(DriftError::InvalidOpcode(0x0A)));
        assert_eq!(OpCode::try_from(0x0E), Err(DriftError::InvalidOpcode(0x0E)));
    }

    #[test]
    fn only_indexed_operations_take_operands() {
        let with: Vec<OpCode> = (0u8..=0x0D)
            .filter_map(OpCode::from_u8)
            .filter(|op| op.has_operand())
            .collect();
        assert_eq!(
            with,
            vec![OpCode::LoadVar, OpCode::LoadConst, OpCode::StoreVar, OpCode::Call]
        );
    }
}
