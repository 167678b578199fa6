//! Runtime value representation

use crate::ast::ValueType;
use serde::Serialize;
use std::fmt;

/// A value on the operand stack, in a local or in a global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Value {
    I32(i32),
}

impl Value {
    pub fn typ(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            Value::I32(v) => *v,
        }
    }

    /// The zero value a declared local starts with.
    pub fn default_for(ty: ValueType) -> Self {
        match ty {
            ValueType::I32 => Value::I32(0),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "i32:{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_conversion() {
        let value = Value::from(-3);
        assert_eq!(value.to_string(), "i32:-3");
        assert_eq!(value.as_i32(), -3);
        assert_eq!(value.typ(), ValueType::I32);
        assert_eq!(Value::default_for(ValueType::I32), Value::I32(0));
    }
}
