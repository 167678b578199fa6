//! `i32.load` and `i32.store`.
//!
//! The effective address is the popped address, read as signed, plus the
//! static offset. It is computed in 64 bits so it cannot wrap.

use super::{MemArg, Memory, RuntimeError, Stack, Value};

fn effective_address(base: i32, arg: &MemArg) -> i64 {
    i64::from(base) + i64::from(arg.offset)
}

/// i32.load: pop an address, push the 4 bytes there.
pub fn i32_load(stack: &mut Stack, memory: &Memory, arg: &MemArg) -> Result<(), RuntimeError> {
    let base = stack.pop_i32()?;
    let value = memory.read_i32(effective_address(base, arg))?;
    stack.push(Value::I32(value));
    Ok(())
}

/// i32.store: pop a value, then an address, and write the value there.
pub fn i32_store(stack: &mut Stack, memory: &mut Memory, arg: &MemArg) -> Result<(), RuntimeError> {
    let value = stack.pop_i32()?;
    let base = stack.pop_i32()?;
    memory.write_i32(effective_address(base, arg), value)
}
