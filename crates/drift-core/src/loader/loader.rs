//! Image Loader
//!
//! Loads and validates code-unit images.
//! This layer performs structural validation only; nothing is executed.

use tracing::debug;

use crate::bytecode::opcode::OpCode;
use crate::bytecode::unit::CodeUnit;
use crate::error::{DriftError, DriftResult};
use crate::vm::value::{Function, Value};

use super::{
    IMAGE_MAGIC, MAX_NESTING, TAG_FUNCTION, TAG_NONE, TAG_NUMBER, TAG_STRING, VERSION_MAJOR,
};

/// Header plus the four empty stream counts of a minimal unit
const MIN_FILE_SIZE: usize = 24;

/// Image loader
pub struct ImageLoader;

impl ImageLoader {
    /// Load an image and check operand alignment and index ranges
    pub fn load(bytes: &[u8]) -> DriftResult<CodeUnit> {
        let unit = Self::parse(bytes)?;
        Self::validate(&unit)?;
        debug!(
            operations = unit.operations().len(),
            constants = unit.constants().len(),
            names = unit.names().len(),
            "loaded image"
        );
        Ok(unit)
    }

    /// Load an image checking its structure only.
    ///
    /// Misaligned or out-of-range operands are left for the engine to trip
    /// over at run time.
    pub fn load_unchecked(bytes: &[u8]) -> DriftResult<CodeUnit> {
        let unit = Self::parse(bytes)?;
        debug!(operations = unit.operations().len(), "loaded image without validation");
        Ok(unit)
    }

    fn parse(bytes: &[u8]) -> DriftResult<CodeUnit> {
        if bytes.len() < MIN_FILE_SIZE {
            return Err(DriftError::ImageTooShort);
        }

        let mut cursor = 0;

        // Magic
        let magic = Self::read_u32(bytes, &mut cursor)?;
        if magic != IMAGE_MAGIC {
            return Err(DriftError::InvalidMagicNumber);
        }

        // Version
        let major = Self::read_u8(bytes, &mut cursor)?;
        let _minor = Self::read_u8(bytes, &mut cursor)?;
        let _patch = Self::read_u8(bytes, &mut cursor)?;

        if major != VERSION_MAJOR {
            return Err(DriftError::InvalidImageVersion(major));
        }

        // Reserved
        Self::read_u8(bytes, &mut cursor)?;

        let unit = Self::read_unit(bytes, &mut cursor, 0)?;

        if cursor != bytes.len() {
            return Err(DriftError::MalformedImage(format!(
                "{} trailing bytes",
                bytes.len() - cursor
            )));
        }
        Ok(unit)
    }

    fn read_unit(bytes: &[u8], cursor: &mut usize, nesting: usize) -> DriftResult<CodeUnit> {
        if nesting > MAX_NESTING {
            return Err(DriftError::MalformedImage(format!(
                "functions nested deeper than {}",
                MAX_NESTING
            )));
        }

        // Operations
        let op_count = Self::read_len(bytes, cursor)?;
        let operations = Self::read_bytes(bytes, cursor, op_count)?.to_vec();

        // Constants
        let constant_count = Self::read_len(bytes, cursor)?;
        let mut constants = Vec::with_capacity(constant_count.min(bytes.len()));
        for _ in 0..constant_count {
            constants.push(Self::read_constant(bytes, cursor, nesting)?);
        }

        // Names
        let name_count = Self::read_len(bytes, cursor)?;
        let mut names = Vec::with_capacity(name_count.min(bytes.len()));
        for _ in 0..name_count {
            names.push(Self::read_string(bytes, cursor)?);
        }

        // Operand indices
        let operand_count = Self::read_len(bytes, cursor)?;
        let mut operands = Vec::with_capacity(operand_count.min(bytes.len()));
        for _ in 0..operand_count {
            operands.push(Self::read_u32(bytes, cursor)? as usize);
        }

        Ok(CodeUnit::new(operations, constants, names, operands))
    }

    fn read_constant(bytes: &[u8], cursor: &mut usize, nesting: usize) -> DriftResult<Value> {
        let tag = Self::read_u8(bytes, cursor)?;

        match tag {
            TAG_NONE => Ok(Value::None),
            TAG_NUMBER => {
                let n = Self::read_f64(bytes, cursor)?;
                Ok(Value::Number(n))
            }
            TAG_STRING => {
                let s = Self::read_string(bytes, cursor)?;
                Ok(Value::string(s))
            }
            TAG_FUNCTION => {
                let name = Self::read_string(bytes, cursor)?;
                let arity = Self::read_u32(bytes, cursor)? as usize;
                let code = Self::read_unit(bytes, cursor, nesting + 1)?;
                Ok(Value::function(name, arity, code))
            }
            _ => Err(DriftError::MalformedImage(format!(
                "unknown constant tag 0x{:02X}",
                tag
            ))),
        }
    }

    /// Check what the engine deliberately does not: opcodes decode, operand
    /// indices line up with their operations and point inside their tables,
    /// and every function has a name for each parameter.
    fn validate(unit: &CodeUnit) -> DriftResult<()> {
        let ops = unit
            .operations()
            .iter()
            .map(|&byte| OpCode::try_from(byte))
            .collect::<DriftResult<Vec<_>>>()?;

        unit.check_alignment()?;

        let mut operands = unit.operands().iter();
        for op in ops.into_iter().filter(|op| op.has_operand()) {
            let Some(&index) = operands.next() else {
                break;
            };
            match op {
                OpCode::LoadConst => {
                    unit.constant(index)?;
                }
                OpCode::LoadVar | OpCode::StoreVar => {
                    unit.name(index)?;
                }
                _ => {}
            }
        }

        for constant in unit.constants() {
            if let Value::Function(function) = constant {
                Self::validate_function(function)?;
            }
        }
        Ok(())
    }

    fn validate_function(function: &Function) -> DriftResult<()> {
        if function.arity > function.code.names().len() {
            return Err(DriftError::MalformedImage(format!(
                "function '{}' declares {} parameters but has {} names",
                function.name,
                function.arity,
                function.code.names().len()
            )));
        }
        Self::validate(&function.code)
    }

    fn read_len(bytes: &[u8], cursor: &mut usize) -> DriftResult<usize> {
        Ok(Self::read_u32(bytes, cursor)? as usize)
    }

    fn read_string(bytes: &[u8], cursor: &mut usize) -> DriftResult<String> {
        let len = Self::read_len(bytes, cursor)?;
        let raw = Self::read_bytes(bytes, cursor, len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| DriftError::MalformedImage("string is not valid UTF-8".to_string()))
    }

    fn read_bytes<'a>(bytes: &'a [u8], cursor: &mut usize, len: usize) -> DriftResult<&'a [u8]> {
        let end = cursor.checked_add(len).ok_or(DriftError::ImageTooShort)?;
        let slice = bytes.get(*cursor..end).ok_or(DriftError::ImageTooShort)?;
        *cursor = end;
        Ok(slice)
    }

    fn read_u8(bytes: &[u8], cursor: &mut usize) -> DriftResult<u8> {
        let v = *bytes.get(*cursor).ok_or(DriftError::ImageTooShort)?;
        *cursor += 1;
        Ok(v)
    }

    fn read_u32(bytes: &[u8], cursor: &mut usize) -> DriftResult<u32> {
        let raw = Self::read_bytes(bytes, cursor, 4)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    fn read_f64(bytes: &[u8], cursor: &mut usize) -> DriftResult<f64> {
        let raw = Self::read_bytes(bytes, cursor, 8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        Ok(f64::from_be_bytes(buf))
    }
}
