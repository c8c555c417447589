//! Drift Error Types
//!
//! Defines all error conditions produced by the Drift VM core.
//! Every failure is fatal to the invocation it occurs in; nothing here is
//! recovered locally.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::bytecode::opcode::OpCode;

/// A bounded resource the VM can run out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Nested call frames
    CallDepth,
    /// Values held on a single evaluation stack
    EvaluationStack,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::CallDepth => write!(f, "call depth"),
            Resource::EvaluationStack => write!(f, "evaluation stack"),
        }
    }
}

/// Which stack a pop was attempted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackRole {
    Evaluation,
    OperandQueue,
}

impl fmt::Display for StackRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackRole::Evaluation => write!(f, "evaluation stack"),
            StackRole::OperandQueue => write!(f, "operand-index queue"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriftError {
    // Execution errors
    #[error("symbol '{0}' not found")]
    SymbolNotFound(String),

    #[error("type mismatch in {op}: {found}")]
    TypeMismatch { op: OpCode, found: String },

    #[error("arity mismatch calling '{function}': requires {expected}, have {supplied}")]
    ArityMismatch {
        function: String,
        expected: usize,
        supplied: usize,
    },

    #[error("{0} underflow")]
    StackUnderflow(StackRole),

    #[error("resource exhausted: {resource} limit of {limit} exceeded")]
    ResourceExhaustion { resource: Resource, limit: usize },

    #[error("invalid opcode: 0x{0:02X}")]
    InvalidOpcode(u8),

    #[error("invalid constant access: {0}")]
    InvalidConstantAccess(usize),

    #[error("invalid name access: {0}")]
    InvalidNameAccess(usize),

    #[error("no active frame")]
    NoActiveFrame,

    // Image errors
    #[error("invalid image magic number")]
    InvalidMagicNumber,

    #[error("incompatible image version {0}")]
    InvalidImageVersion(u8),

    #[error("malformed image: {0}")]
    MalformedImage(String),

    #[error("image is too short")]
    ImageTooShort,

    #[error("operand misalignment: {operations} operand-bearing operations, {operands} operand indices")]
    OperandMisalignment { operations: usize, operands: usize },

    // IO boundary
    #[error("io error: {0}")]
    Io(String),
}

impl From<io::Error> for DriftError {
    fn from(err: io::Error) -> Self {
        DriftError::Io(err.to_string())
    }
}

pub type DriftResult<T> = Result<T, DriftError>;

/// Terminal failure of a run: the error plus where it happened.
///
/// The fault is raised by the innermost frame and passes through every
/// enclosing frame untouched.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error} (at {unit}:{ip} {op}, depth {depth})")]
pub struct Fault {
    pub error: DriftError,
    /// Index of the failing operation within its unit
    pub ip: usize,
    /// Mnemonic of the failing operation, or the raw byte if it did not decode
    pub op: String,
    /// `<main>` for the top-level unit, otherwise the function name
    pub unit: String,
    /// Number of frames active when the fault was raised
    pub depth: usize,
}

