use std::ops::Deref;

use crate::core::Value;
use crate::vm::{Error, Result};

/// The operand stack. Pushing past the bound is an error instead of a
/// reallocation.
#[derive(Debug, Clone)]
pub struct Stack {
    values: Vec<Value>,
    max: usize,
}

impl Stack {
    pub fn new(max: usize) -> Self {
        Stack {
            values: Vec::with_capacity(max.min(1024)),
            max,
        }
    }

    pub fn push(&mut self, v: Value) -> Result<()> {
        if self.values.len() >= self.max {
            return Err(Error::StackOverflow);
        }
        self.values.push(v);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value> {
        self.values.pop().ok_or(Error::StackUnderflow)
    }

    /// removes the top `n` values and returns them in push order
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>> {
        if n > self.values.len() {
            return Err(Error::StackUnderflow);
        }
        Ok(self.values.split_off(self.values.len() - n))
    }

    pub fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
    }
}

impl Deref for Stack {
    type Target = Vec<Value>;
    fn deref(&self) -> &Vec<Value> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded() {
        let mut s = Stack::new(2);
        s.push(Value::Int(1)).unwrap();
        s.push(Value::Int(2)).unwrap();
        assert!(matches!(s.push(Value::Int(3)), Err(Error::StackOverflow)));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn pop_from_the_back() {
        let mut s = Stack::new(8);
        for i in 0..4 {
            s.push(Value::Int(i)).unwrap();
        }
        assert_eq!(s.last(), Some(&Value::Int(3)));
        assert_eq!(s.pop_n(2).unwrap(), vec![Value::Int(2), Value::Int(3)]);
        assert!(matches!(s.pop_n(3), Err(Error::StackUnderflow)));
        assert_eq!(s.pop().unwrap(), Value::Int(1));
        s.pop().unwrap();
        assert!(matches!(s.pop(), Err(Error::StackUnderflow)));
    }
}
