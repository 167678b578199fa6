//! Instruction implementations, grouped by category.
//!
//! Each operation is a free function over the operand stack and whatever
//! state it touches. Structured control flow and calls live in the executor.

pub mod bitwise;
pub mod comparison;
pub mod memory;
pub mod numeric;
pub mod variable;

pub(crate) use crate::ast::MemArg;
pub(crate) use crate::runtime::memory::Memory;
pub(crate) use crate::runtime::stack::Stack;
pub(crate) use crate::runtime::{RuntimeError, Value};
