//! Bit operations on `i32`.

use super::{RuntimeError, Stack, Value};

/// i32.clz: number of leading zero bits; `32` for zero.
pub fn i32_clz(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    stack.push(Value::I32(c.leading_zeros() as i32));
    Ok(())
}
