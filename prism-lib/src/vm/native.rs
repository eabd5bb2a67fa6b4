//! The boundary between bytecode and host functions

use derive_more::Deref;
use thiserror::Error;

use std::fmt;

use crate::core::{DataType, Value};

/// Host function ABI. The arguments are borrowed for the duration of the call,
/// their number is the slice length.
pub type NativeFn = fn(&[Value]) -> Result<Value, NativeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NativeError {
    #[error("expected {expected} argument(s), got {got}")]
    Arity { expected: &'static str, got: usize },

    #[error("argument {index} must be {expected}, got {got}")]
    ArgType {
        index: usize,
        expected: DataType,
        got: DataType,
    },

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Failed(String),
}

macro_rules! native_bail {
    ($($err:tt)*) => {
        return Err($crate::vm::NativeError::$($err)*)
    };
}
pub(crate) use native_bail;

/// fails unless `args.len()` lies in `min..=max`
pub fn check_arity(
    args: &[Value],
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<(), NativeError> {
    if args.len() < min || args.len() > max {
        native_bail!(Arity {
            expected,
            got: args.len()
        });
    }
    Ok(())
}

/// borrows argument `index` as a string
pub fn string_arg(args: &[Value], index: usize) -> Result<&str, NativeError> {
    match args.get(index) {
        Some(Value::Str(s)) => Ok(s),
        other => Err(NativeError::ArgType {
            index,
            expected: DataType::String,
            got: other.map(Value::dtype).unwrap_or_default(),
        }),
    }
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub function: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native {}>", self.name)
    }
}

/// Append-only table of the natives one compilation unit can call
#[derive(Debug, Clone, Default, Deref)]
pub struct NativeTable(Vec<NativeFunction>);

impl NativeTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// returns the index of the new entry
    pub fn push(&mut self, name: impl Into<String>, function: NativeFn) -> usize {
        self.0.push(NativeFunction {
            name: name.into(),
            function,
        });
        self.0.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(_: &[Value]) -> Result<Value, NativeError> {
        Ok(Value::Int(42))
    }

    #[test]
    fn table_is_append_only() {
        let mut t = NativeTable::new();
        assert_eq!(t.push("a", answer), 0);
        assert_eq!(t.push("b", answer), 1);
        assert_eq!(t[1].name, "b");
        assert_eq!((t[0].function)(&[]), Ok(Value::Int(42)));
    }

    #[test]
    fn argument_checks() {
        let args = [Value::from("x"), Value::Int(1)];
        assert!(check_arity(&args, 2, 2, "2").is_ok());
        assert_eq!(
            check_arity(&args, 1, 1, "1"),
            Err(NativeError::Arity {
                expected: "1",
                got: 2
            })
        );
        assert_eq!(string_arg(&args, 0), Ok("x"));
        assert_eq!(
            string_arg(&args, 1).unwrap_err().to_string(),
            "argument 1 must be string, got int"
        );
    }
}
