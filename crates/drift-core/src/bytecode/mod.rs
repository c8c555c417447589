pub mod opcode;
pub mod unit;

pub use opcode::OpCode;
pub use unit::{CodeUnit, CodeUnitBuilder};
