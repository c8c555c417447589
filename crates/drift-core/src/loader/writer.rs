//! Image Writer
//!
//! Serializes a code unit into the image format read by `ImageLoader`.

use crate::bytecode::unit::CodeUnit;
use crate::error::{DriftError, DriftResult};
use crate::vm::value::Value;

use super::{IMAGE_MAGIC, TAG_FUNCTION, TAG_NONE, TAG_NUMBER, TAG_STRING, VERSION_MAJOR};

const VERSION_MINOR: u8 = 0;
const VERSION_PATCH: u8 = 0;

pub struct ImageWriter;

impl ImageWriter {
    /// Encode `unit` with an image header.
    ///
    /// Fails only if a stream or index does not fit the format's 32-bit
    /// fields.
    pub fn encode(unit: &CodeUnit) -> DriftResult<Vec<u8>> {
        let mut buf = Vec::new();

        buf.extend(&IMAGE_MAGIC.to_be_bytes());
        buf.push(VERSION_MAJOR);
        buf.push(VERSION_MINOR);
        buf.push(VERSION_PATCH);
        buf.push(0u8); // reserved

        Self::write_unit(&mut buf, unit)?;
        Ok(buf)
    }

    fn write_unit(buf: &mut Vec<u8>, unit: &CodeUnit) -> DriftResult<()> {
        Self::write_len(buf, unit.operations().len())?;
        buf.extend(unit.operations());

        Self::write_len(buf, unit.constants().len())?;
        for constant in unit.constants() {
            Self::write_constant(buf, constant)?;
        }

        Self::write_len(buf, unit.names().len())?;
        for name in unit.names() {
            Self::write_string(buf, name)?;
        }

        Self::write_len(buf, unit.operands().len())?;
        for &index in unit.operands() {
            Self::write_len(buf, index)?;
        }
        Ok(())
    }

    fn write_constant(buf: &mut Vec<u8>, value: &Value) -> DriftResult<()> {
        match value {
            Value::None => buf.push(TAG_NONE),
            Value::Number(n) => {
                buf.push(TAG_NUMBER);
                buf.extend(&n.to_be_bytes());
            }
            Value::String(s) => {
                buf.push(TAG_STRING);
                Self::write_string(buf, s)?;
            }
            Value::Function(function) => {
                buf.push(TAG_FUNCTION);
                Self::write_string(buf, &function.name)?;
                Self::write_len(buf, function.arity)?;
                Self::write_unit(buf, &function.code)?;
            }
        }
        Ok(())
    }

    fn write_string(buf: &mut Vec<u8>, s: &str) -> DriftResult<()> {
        Self::write_len(buf, s.len())?;
        buf.extend(s.as_bytes());
        Ok(())
    }

    fn write_len(buf: &mut Vec<u8>, n: usize) -> DriftResult<()> {
        let n = u32::try_from(n)
            .map_err(|_| DriftError::MalformedImage(format!("{} does not fit in 32 bits", n)))?;
        buf.extend(&n.to_be_bytes());
        Ok(())
    }
}
