//! Drift trace: disassembly and execution traces for the Drift VM.
//!
//! Everything here works from the core's read-only surface: code units,
//! frames passed to an `Observer`, and values' `describe()` form. Nothing
//! in this crate changes engine state.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub use drift_core::vm::{Frame, Observer};
pub use drift_core::{CodeUnit, OpCode, Value};

/// Render `unit` as text: one line per operation with its resolved operand,
/// then the constant and name tables. Function constants follow their parent.
pub fn disassemble(unit: &CodeUnit) -> String {
    Disassembly {
        title: "<main>",
        unit,
    }
    .to_string()
}

/// Evaluation stack (bottom first) and symbol table of a frame
pub fn dump_frame(frame: &Frame) -> String {
    FrameDump(frame).to_string()
}

struct Disassembly<'a> {
    title: &'a str,
    unit: &'a CodeUnit,
}

impl fmt::Display for Disassembly<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.unit;
        writeln!(f, "== {} ==", self.title)?;

        let mut operands = unit.operands().iter();
        for (ip, &byte) in unit.operations().iter().enumerate() {
            let Some(op) = OpCode::from_u8(byte) else {
                writeln!(f, "{:>6}: 0x{:02X} ???", ip, byte)?;
                continue;
            };
            if !op.has_operand() {
                writeln!(f, "{:>6}: {}", ip, op)?;
                continue;
            }
            match operands.next() {
                Some(&index) => {
                    writeln!(f, "{:>6}: {:<6} {:>4}  {}", ip, op, index, resolve(unit, op, index))?
                }
                None => writeln!(f, "{:>6}: {:<6}    -  <missing operand>", ip, op)?,
            }
        }
        let extra = operands.len();
        if extra > 0 {
            writeln!(f, "        ({} unused operand indices)", extra)?;
        }

        if !unit.constants().is_empty() {
            writeln!(f, "constants:")?;
            for (i, constant) in unit.constants().iter().enumerate() {
                writeln!(f, "{:>6}: {}", i, constant.describe())?;
            }
        }
        if !unit.names().is_empty() {
            writeln!(f, "names:")?;
            for (i, name) in unit.names().iter().enumerate() {
                writeln!(f, "{:>6}: '{}'", i, name)?;
            }
        }

        for function in unit.constants().iter().filter_map(Value::as_function) {
            let title = format!("{}/{}", function.name, function.arity);
            let nested = Disassembly {
                title: &title,
                unit: &function.code,
            };
            write!(f, "\n{}", nested)?;
        }
        Ok(())
    }
}

fn resolve(unit: &CodeUnit, op: OpCode, index: usize) -> String {
    match op {
        OpCode::LoadConst => unit
            .constant(index)
            .map(Value::describe)
            .unwrap_or_else(|_| "<out of range>".to_string()),
        OpCode::LoadVar | OpCode::StoreVar => unit
            .name(index)
            .map(|name| format!("'{}'", name))
            .unwrap_or_else(|_| "<out of range>".to_string()),
        OpCode::Call => format!("({} args)", index),
        _ => String::new(),
    }
}

struct FrameDump<'a>(&'a Frame);

impl fmt::Display for FrameDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "stack:")?;
        for (i, value) in self.0.stack().iter().enumerate() {
            writeln!(f, "{:>6}: {}", i, value.describe())?;
        }
        writeln!(f, "symbols:")?;
        for (i, (name, value)) in self.0.locals().iter().enumerate() {
            writeln!(f, "{:>6}: '{}' -> {}", i, name, value.describe())?;
        }
        Ok(())
    }
}

/// Shared handle to the lines a `TextTracer` has recorded
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    lines: Rc<RefCell<Vec<String>>>,
}

impl TraceLog {
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn text(&self) -> String {
        let mut text = self.lines.borrow().join("\n");
        text.push('\n');
        text
    }

    fn push(&self, line: String) {
        self.lines.borrow_mut().push(line);
    }
}

/// Observer that records a readable trace of every frame and step.
///
/// Each step line shows the stack as it was before the operation ran.
#[derive(Debug, Default)]
pub struct TextTracer {
    log: TraceLog,
}

impl TextTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for reading the trace after the tracer is handed to the VM
    pub fn log(&self) -> TraceLog {
        self.log.clone()
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth.saturating_sub(1))
}

impl Observer for TextTracer {
    fn on_enter(&mut self, depth: usize, frame: &Frame) {
        self.log.push(format!(
            "{}-> {} ({} ops)",
            indent(depth),
            frame.name(),
            frame.code().operations().len()
        ));
    }

    fn on_step(&mut self, depth: usize, frame: &Frame, ip: usize, op: OpCode) {
        let stack: Vec<String> = frame.stack().iter().map(Value::to_string).collect();
        self.log.push(format!(
            "{}{:>4}: {:<6} [{}]",
            indent(depth),
            ip,
            op,
            stack.join(", ")
        ));
    }

    fn on_exit(&mut self, depth: usize, frame: &Frame, returned: Option<&Value>) {
        let returned = returned.map_or_else(|| "nothing".to_string(), Value::describe);
        self.log.push(format!("{}<- {} returned {}", indent(depth), frame.name(), returned));
        for (name, value) in frame.locals().iter() {
            self.log.push(format!("{}   '{}' -> {}", indent(depth), name, value.describe()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::CodeUnitBuilder;

    #[test]
    fn reports_missing_and_unused_operands() {
        let short = CodeUnit::new(
            vec![OpCode::LoadConst as u8, OpCode::LoadConst as u8],
            vec![Value::None],
            Vec::new(),
            vec![0],
        );
        assert!(disassemble(&short).contains("<missing operand>"));

        let long = CodeUnit::new(vec![OpCode::Return as u8], Vec::new(), Vec::new(), vec![0, 1]);
        assert!(disassemble(&long).contains("(2 unused operand indices)"));
    }

    #[test]
    fn unknown_bytes_are_marked() {
        let unit = CodeUnit::new(vec![0x0A], Vec::new(), Vec::new(), Vec::new());
        assert!(disassemble(&unit).contains("0x0A ???"));
    }

    #[test]
    fn out_of_range_operand_is_marked() {
        let unit = CodeUnitBuilder::new().emit_with(OpCode::LoadVar, 3).build();
        assert!(disassemble(&unit).contains("<out of range>"));
    }
}
