//! Local and global variable access.

use super::{RuntimeError, Stack};
use crate::ast::Index;
use crate::runtime::frame::ExecutionContext;
use crate::runtime::globals::Globals;

/// local.get: push the local's value.
pub fn local_get(stack: &mut Stack, context: &ExecutionContext, index: &Index) -> Result<(), RuntimeError> {
    stack.push(context.local(index)?);
    Ok(())
}

/// local.set: pop a value into the local.
pub fn local_set(stack: &mut Stack, context: &mut ExecutionContext, index: &Index) -> Result<(), RuntimeError> {
    let value = stack.pop()?;
    context.set_local(index, value)
}

/// local.tee: store the top value into the local without popping it.
pub fn local_tee(stack: &mut Stack, context: &mut ExecutionContext, index: &Index) -> Result<(), RuntimeError> {
    let value = *stack.peek().ok_or(RuntimeError::StackUnderflow)?;
    context.set_local(index, value)
}

pub fn global_get(stack: &mut Stack, globals: &Globals, index: &Index) -> Result<(), RuntimeError> {
    stack.push(globals.get(index)?);
    Ok(())
}

pub fn global_set(stack: &mut Stack, globals: &mut Globals, index: &Index) -> Result<(), RuntimeError> {
    let value = stack.pop()?;
    globals.set(index, value)
}
