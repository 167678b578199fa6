//! Operand stack

use super::{RuntimeError, Value};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stack {
    values: Vec<Value>,
}

impl Stack {
    pub fn new() -> Self {
        Stack { values: Vec::new() }
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.values.pop().ok_or(RuntimeError::StackUnderflow)
    }

    pub fn pop_i32(&mut self) -> Result<i32, RuntimeError> {
        Ok(self.pop()?.as_i32())
    }

    /// Pop `count` values, returned in the order they were pushed.
    pub fn pop_n(&mut self, count: usize) -> Result<Vec<Value>, RuntimeError> {
        if self.values.len() < count {
            return Err(RuntimeError::StackUnderflow);
        }
        Ok(self.values.split_off(self.values.len() - count))
    }

    pub fn peek(&self) -> Option<&Value> {
        self.values.last()
    }

    pub fn depth(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Bottom-to-top view of the stack.
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}
