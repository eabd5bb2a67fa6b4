//! ADD, SUBTRACT, MULTIPLY, DIVIDE and NEGATE on values

use crate::core::{OpCode, Value};
use crate::vm::{bail, Error, Result};

fn invalid(op: OpCode, left: &Value, right: &Value) -> Error {
    Error::InvalidOperands {
        op,
        left: left.dtype(),
        right: right.dtype(),
    }
}

fn as_float(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(x) => Some(x.0),
        _ => None,
    }
}

/// Applies a binary arithmetic opcode. Two ints stay int (except for DIVIDE),
/// any other numeric mix is computed as float.
pub fn binary(op: OpCode, left: Value, right: Value) -> Result<Value> {
    use Value::*;

    if op == OpCode::Divide && right.is_zero() {
        bail!(DivisionByZero);
    }

    match (op, &left, &right) {
        (OpCode::Add, Str(a), Str(b)) => Ok(Str(format!("{}{}", a, b))),
        (OpCode::Divide, _, _) => {
            let (Some(a), Some(b)) = (as_float(&left), as_float(&right)) else {
                return Err(invalid(op, &left, &right));
            };
            Ok(Value::float(a / b))
        }
        (_, Int(a), Int(b)) => {
            let res = match op {
                OpCode::Add => a.checked_add(*b),
                OpCode::Subtract => a.checked_sub(*b),
                OpCode::Multiply => a.checked_mul(*b),
                _ => return Err(invalid(op, &left, &right)),
            };
            res.map(Int).ok_or(Error::IntegerOverflow(op))
        }
        _ => {
            let (Some(a), Some(b)) = (as_float(&left), as_float(&right)) else {
                return Err(invalid(op, &left, &right));
            };
            let res = match op {
                OpCode::Add => a + b,
                OpCode::Subtract => a - b,
                OpCode::Multiply => a * b,
                _ => return Err(invalid(op, &left, &right)),
            };
            Ok(Value::float(res))
        }
    }
}

pub fn negate(v: Value) -> Result<Value> {
    match v {
        Value::Int(i) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or(Error::IntegerOverflow(OpCode::Negate)),
        Value::Float(x) => Ok(Value::float(-x.0)),
        other => Err(Error::CannotNegate(other.dtype())),
    }
}
