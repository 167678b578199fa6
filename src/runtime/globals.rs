//! Module globals, addressable by `$name` or position.

use super::{RuntimeError, Value};
use crate::ast::{Global, Index};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Globals {
    values: Vec<Value>,
    names: HashMap<String, usize>,
}

impl Globals {
    /// Initialise every global from its constant initializer.
    pub fn new(globals: &[Global]) -> Self {
        let values = globals.iter().map(|g| Value::I32(g.init)).collect();
        let names = globals
            .iter()
            .enumerate()
            .filter_map(|(position, g)| g.name.as_ref().map(|name| (name.clone(), position)))
            .collect();
        Self { values, names }
    }

    fn slot(&self, index: &Index) -> Result<usize, RuntimeError> {
        let slot = match index {
            Index::Named(name) => self.names.get(name).copied(),
            Index::Position(n) => Some(*n as usize).filter(|n| *n < self.values.len()),
        };
        slot.ok_or_else(|| RuntimeError::UndefinedGlobal(index.to_string()))
    }

    pub fn get(&self, index: &Index) -> Result<Value, RuntimeError> {
        Ok(self.values[self.slot(index)?])
    }

    pub fn set(&mut self, index: &Index, value: Value) -> Result<(), RuntimeError> {
        let slot = self.slot(index)?;
        self.values[slot] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ValueType;

    #[test]
    fn named_and_positional_access() {
        let mut globals = Globals::new(&[
            Global {
                name: Some("$g".to_string()),
                ty: ValueType::I32,
                mutable: true,
                init: 10,
            },
            Global {
                name: None,
                ty: ValueType::I32,
                mutable: false,
                init: -1,
            },
        ]);
        assert_eq!(globals.get(&Index::Named("$g".to_string())).unwrap(), Value::I32(10));
        assert_eq!(globals.get(&Index::Position(1)).unwrap(), Value::I32(-1));
        globals.set(&Index::Position(0), Value::I32(3)).unwrap();
        assert_eq!(globals.get(&Index::Named("$g".to_string())).unwrap(), Value::I32(3));
        assert!(matches!(
            globals.get(&Index::Position(2)),
            Err(RuntimeError::UndefinedGlobal(_))
        ));
    }
}
