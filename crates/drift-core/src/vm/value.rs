//! Runtime Value Representation
//!
//! Defines the closed set of values the Drift VM operates on.
//! Values are immutable; cloning one never copies a code unit.

use std::fmt;
use std::rc::Rc;

use crate::bytecode::unit::CodeUnit;

/// Kind tag of a runtime value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    String,
    Function,
    None,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Number => "Num",
            ValueKind::String => "Str",
            ValueKind::Function => "Func",
            ValueKind::None => "None",
        };
        f.write_str(name)
    }
}

/// A callable body with a declared number of parameters.
///
/// Parameters are bound to the first `arity` entries of the unit's names.
#[derive(Debug, PartialEq)]
pub struct Function {
    pub name: String,
    pub arity: usize,
    pub code: Rc<CodeUnit>,
}

impl Function {
    pub fn new(name: impl Into<String>, arity: usize, code: impl Into<Rc<CodeUnit>>) -> Self {
        Function {
            name: name.into(),
            arity,
            code: code.into(),
        }
    }
}

/// Runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of a value
    None,

    /// Numeric value (IEEE 754)
    Number(f64),

    /// Immutable text
    String(Rc<str>),

    /// Function with its own code unit
    Function(Rc<Function>),
}

impl Value {
    pub fn string(text: impl AsRef<str>) -> Self {
        Value::String(Rc::from(text.as_ref()))
    }

    pub fn function(name: impl Into<String>, arity: usize, code: impl Into<Rc<CodeUnit>>) -> Self {
        Value::Function(Rc::new(Function::new(name, arity, code)))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::None => ValueKind::None,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Function(_) => ValueKind::Function,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<Function>> {
        match self {
            Value::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Verbose tagged form used in disassembly and traces
    pub fn describe(&self) -> String {
        match self {
            Value::None => "<None>".to_string(),
            Value::Number(n) => format!("<Num {{ Value = {} }}>", n),
            Value::String(s) => format!("<Str {{ Value = '{}' }}>", s),
            Value::Function(func) => {
                format!("<Func {{ Name = '{}' Args = {} }}>", func.name, func.arity)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Function(func) => write!(f, "<fn {}/{}>", func.name, func.arity),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_keeps_kinds_apart() {
        assert_eq!(Value::Number(100.0).to_string(), "100");
        assert_eq!(Value::Number(6.3).to_string(), "6.3");
        assert_eq!(Value::string("100").to_string(), "\"100\"");
        assert_eq!(Value::None.to_string(), "none");
        assert_eq!(Value::string("none").to_string(), "\"none\"");

        let func = Value::function("foo", 2, CodeUnit::default());
        assert_eq!(func.to_string(), "<fn foo/2>");
    }

    #[test]
    fn describe_tags_each_kind() {
        assert_eq!(Value::Number(3.0).describe(), "<Num { Value = 3 }>");
        assert_eq!(Value::string("x").describe(), "<Str { Value = 'x' }>");
        assert_eq!(Value::None.describe(), "<None>");
        let func = Value::function("plus", 1, CodeUnit::default());
        assert_eq!(func.describe(), "<Func { Name = 'plus' Args = 1 }>");
    }

    #[test]
    fn payload_accessors_match_kind() {
        let n = Value::Number(2.5);
        assert_eq!(n.kind(), ValueKind::Number);
        assert_eq!(n.as_number(), Some(2.5));
        assert_eq!(n.as_str(), None);

        let s = Value::string("hi");
        assert_eq!(s.kind(), ValueKind::String);
        assert_eq!(s.as_str(), Some("hi"));
        assert!(s.as_function().is_none());

        assert!(Value::None.is_none());
        assert_eq!(Value::None.as_number(), None);
    }

    #[test]
    fn cloned_function_shares_code() {
        let func = Value::function("f", 0, CodeUnit::default());
        let copy = func.clone();
        match (func.as_function(), copy.as_function()) {
            (Some(a), Some(b)) => assert!(Rc::ptr_eq(&a.code, &b.code)),
            _ => panic!("expected functions"),
        }
    }
}
