//! Deals with run-time data representation
//!
//! Every value owns its payload. Strings are not shared between values, cloning a
//! [`Value`] copies the string, so storing into a slot and loading it back can never
//! alias. References to functions, prisms and natives are plain indices into the
//! module's chunk list or native table.

use ordered_float::OrderedFloat;
use std::fmt;

use crate::core::DataType;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Value {
    #[default]
    None,
    Int(i64),
    Float(OrderedFloat<f64>),
    Bool(bool),
    Str(String),
    /// index of the chunk holding the function body
    Function(usize),
    /// index into the native table
    Native(usize),
    /// index of the chunk holding the prism body
    Prism(usize),
}

impl Value {
    pub fn dtype(&self) -> DataType {
        match self {
            Value::None => DataType::None,
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::Bool(_) => DataType::Bool,
            Value::Str(_) => DataType::String,
            Value::Function(_) => DataType::Function,
            Value::Native(_) => DataType::Native,
            Value::Prism(_) => DataType::Prism,
        }
    }

    pub fn float(x: f64) -> Self {
        Value::Float(OrderedFloat(x))
    }

    /// `false`, `0`, `0.0` and `None` are falsy. Strings are always truthy, the
    /// empty string included.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::None => true,
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => f.0 == 0.0,
            _ => false,
        }
    }

    /// integer zero or float zero, the divisors DIVIDE refuses
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int(i) => *i == 0,
            Value::Float(f) => f.0 == 0.0,
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Renders floats the way C's `%g` does: six significant digits, trailing
/// zeros dropped, exponent notation outside of `1e-4..1e6`.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".into();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf".into() } else { "-inf".into() };
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0".into() } else { "0".into() };
    }

    let sci = format!("{:.5e}", x);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((&sci, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if !(-4..6).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    } else {
        let precision = (5 - exp) as usize;
        trim_fraction(&format!("{:.*}", precision, x)).to_owned()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", format_float(x.0)),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            other => write!(f, "[{}]", other.dtype()),
        }
    }
}

// ==============================================================================
// Simple Conversions
// ==============================================================================
impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Int(x)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::float(x)
    }
}

impl From<bool> for Value {
    fn from(x: bool) -> Self {
        Value::Bool(x)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::None
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}
