pub mod frame;
pub mod guard;
pub mod observer;
pub mod output;
pub mod stack;
pub mod value;
pub mod vm;

pub use frame::{Frame, Locals, MAIN_UNIT};
pub use observer::Observer;
pub use output::OutputSink;
pub use stack::{Discipline, Stack};
pub use value::{Function, Value, ValueKind};
pub use vm::VirtualMachine;
