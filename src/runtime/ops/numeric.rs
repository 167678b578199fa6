//! Arithmetic on `i32`.
//!
//! Binary operators pop the right operand first, then the left. All results
//! wrap at 32 bits.

use super::{RuntimeError, Stack, Value};

/// i32.const: push the constant.
pub fn i32_const(stack: &mut Stack, value: i32) -> Result<(), RuntimeError> {
    stack.push(Value::I32(value));
    Ok(())
}

/// Pop `c2` then `c1`, push `op(c1, c2)`.
pub(crate) fn binary(stack: &mut Stack, op: impl FnOnce(i32, i32) -> Result<i32, RuntimeError>) -> Result<(), RuntimeError> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(op(c1, c2)?));
    Ok(())
}

/// i32.add: `c1 + c2` modulo 2^32.
pub fn i32_add(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary(stack, |c1, c2| Ok(c1.wrapping_add(c2)))
}

/// i32.sub: `c1 - c2` modulo 2^32.
pub fn i32_sub(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary(stack, |c1, c2| Ok(c1.wrapping_sub(c2)))
}

/// i32.mul: `c1 * c2` modulo 2^32.
pub fn i32_mul(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary(stack, |c1, c2| Ok(c1.wrapping_mul(c2)))
}

/// i32.div_s: signed division truncating toward zero.
///
/// A zero divisor traps. `i32::MIN / -1` wraps to `i32::MIN`.
pub fn i32_div_s(stack: &mut Stack) -> Result<(), RuntimeError> {
    binary(stack, |c1, c2| {
        if c2 == 0 {
            return Err(RuntimeError::DivisionByZero);
        }
        Ok(c1.wrapping_div(c2))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(op: fn(&mut Stack) -> Result<(), RuntimeError>, c1: i32, c2: i32) -> Result<i32, RuntimeError> {
        let mut stack = Stack::new();
        stack.push(Value::I32(c1));
        stack.push(Value::I32(c2));
        op(&mut stack)?;
        assert_eq!(stack.depth(), 1);
        stack.pop_i32()
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run(i32_add, 2, 3).unwrap(), 5);
        assert_eq!(run(i32_sub, 7, 3).unwrap(), 4);
        assert_eq!(run(i32_mul, -4, 6).unwrap(), -24);
        assert_eq!(run(i32_div_s, 7, 2).unwrap(), 3);
        assert_eq!(run(i32_div_s, -7, 2).unwrap(), -3);
    }

    #[test]
    fn wrapping() {
        assert_eq!(run(i32_add, i32::MAX, 1).unwrap(), i32::MIN);
        assert_eq!(run(i32_sub, i32::MIN, 1).unwrap(), i32::MAX);
        assert_eq!(run(i32_mul, 0x10000, 0x10000).unwrap(), 0);
        assert_eq!(run(i32_div_s, i32::MIN, -1).unwrap(), i32::MIN);
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(run(i32_div_s, 1, 0), Err(RuntimeError::DivisionByZero));
    }

    #[test]
    fn underflow() {
        let mut stack = Stack::new();
        stack.push(Value::I32(1));
        assert_eq!(i32_add(&mut stack), Err(RuntimeError::StackUnderflow));
        i32_const(&mut stack, 9).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 9);
    }
}
