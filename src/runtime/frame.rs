//! Execution context of one function invocation.

use super::control::LabelStack;
use super::{RuntimeError, Value};
use crate::ast::{Func, Index};
use std::collections::HashMap;

/// Locals (parameters first, then declared locals) and the label stack of a
/// running function.
#[derive(Debug)]
pub struct ExecutionContext {
    /// Position of the function in the module.
    pub function: usize,
    pub locals: Vec<Value>,
    names: HashMap<String, usize>,
    pub labels: LabelStack,
}

impl ExecutionContext {
    /// Bind `args` to the parameters and zero the declared locals.
    pub fn new(function: usize, func: &Func, args: Vec<Value>) -> Self {
        let mut locals = args;
        locals.extend(func.locals.iter().map(|local| Value::default_for(local.ty)));

        let declared = func
            .params
            .iter()
            .map(|p| &p.name)
            .chain(func.locals.iter().map(|l| &l.name));
        let names = declared
            .enumerate()
            .filter_map(|(position, name)| name.as_ref().map(|name| (name.clone(), position)))
            .collect();

        Self {
            function,
            locals,
            names,
            labels: LabelStack::new(),
        }
    }

    fn slot(&self, index: &Index) -> Result<usize, RuntimeError> {
        let slot = match index {
            Index::Named(name) => self.names.get(name).copied(),
            Index::Position(n) => Some(*n as usize).filter(|n| *n < self.locals.len()),
        };
        slot.ok_or_else(|| RuntimeError::UndefinedLocal(index.to_string()))
    }

    pub fn local(&self, index: &Index) -> Result<Value, RuntimeError> {
        Ok(self.locals[self.slot(index)?])
    }

    pub fn set_local(&mut self, index: &Index, value: Value) -> Result<(), RuntimeError> {
        let slot = self.slot(index)?;
        self.locals[slot] = value;
        Ok(())
    }
}
