//! Drift - Core Library
//!
//! A small stack-based bytecode virtual machine. Code units arrive pre-built;
//! the engine executes them against per-call frames and reports a single
//! terminal value or a typed fault.

pub mod error;
pub mod config;
pub mod bytecode;
pub mod vm;
pub mod loader;

// Re-export commonly used types
pub use error::{DriftError, DriftResult, Fault};
pub use config::VmConfig;
pub use bytecode::{CodeUnit, CodeUnitBuilder, OpCode};
pub use vm::{Value, VirtualMachine};
pub use loader::{ImageLoader, ImageWriter};

#[cfg(test)]
mod tests {
	use super::*;
	use crate::vm::OutputSink;

	fn buffered() -> VirtualMachine {
		VirtualMachine::new(VmConfig::new()).with_output(OutputSink::buffer())
	}

	#[test]
	fn output_prints_top_without_popping() {
		let code = CodeUnitBuilder::new()
			.load_const("Hello World!!")
			.emit(OpCode::Output)
			.emit(OpCode::Return)
			.build();

		let mut vm = buffered();
		let ret = vm.run(code).expect("execution failed");
		assert_eq!(ret, Value::string("Hello World!!"));
		assert_eq!(vm.output().lines(), &["\"Hello World!!\"".to_string()]);
	}

	#[test]
	fn unit_without_return_yields_none() {
		let code = CodeUnitBuilder::new().load_const(1.0).store_var("x").build();
		let mut vm = buffered();
		assert_eq!(vm.run(code), Ok(Value::None));
		assert_eq!(vm.depth(), 0);
	}

	#[test]
	fn invalid_opcode_faults_with_raw_byte() {
		let code = CodeUnit::new(vec![0x0A], Vec::new(), Vec::new(), Vec::new());
		let fault = buffered().run(code).expect_err("reserved byte executed");
		assert_eq!(fault.error, DriftError::InvalidOpcode(0x0A));
		assert_eq!(fault.op, "0x0A");
		assert_eq!(fault.ip, 0);
	}

	#[test]
	fn evaluation_stack_limit_trapped() {
		let config = VmConfig::new().with_max_stack_size(1);
		let code = CodeUnitBuilder::new()
			.load_const(1.0)
			.load_const(2.0)
			.emit(OpCode::Add)
			.emit(OpCode::Return)
			.build();
		let mut vm = VirtualMachine::new(config).with_output(OutputSink::Silent);
		let fault = vm.run(code).expect_err("stack limit not enforced");
		assert!(matches!(fault.error, DriftError::ResourceExhaustion { .. }));
		assert_eq!(fault.ip, 1);
	}
}
