//! Read-only execution hook.
//!
//! Observers see frames through shared references only and cannot change
//! engine state. `depth` is the number of active frames, the observed one
//! included.

use crate::bytecode::opcode::OpCode;

use super::frame::Frame;
use super::value::Value;

pub trait Observer {
    /// A frame was pushed and is about to run its first operation
    fn on_enter(&mut self, _depth: usize, _frame: &Frame) {}

    /// `op` at `ip` is about to execute; the frame shows the state before it
    fn on_step(&mut self, _depth: usize, _frame: &Frame, _ip: usize, _op: OpCode) {}

    /// The frame finished, either by `Return` or by running out of operations
    fn on_exit(&mut self, _depth: usize, _frame: &Frame, _returned: Option<&Value>) {}
}
