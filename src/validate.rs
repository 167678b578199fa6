//! Static checks over a parsed [`Module`].
//!
//! Three independent checks run over the whole module and every violation is
//! collected:
//!
//! * every export refers to an existing function,
//! * every function body is consistent under an abstract simulation of the
//!   operand stack, where each slot only records the kind of value it holds,
//! * every present name on a memory, global, function, parameter or local
//!   starts with `$`.
//!
//! Within one function the stack simulation stops at the first violation,
//! since the abstract stack is meaningless after it.
//!
//! ```
//! use wati::{validate, wat};
//!
//! let module = wat::parse_str(r#"(module (export "f" (func $missing)))"#).unwrap();
//! let errors = validate::validate(&module).unwrap_err();
//! assert_eq!(errors.len(), 1);
//! ```

use crate::ast::{Func, Index, Instruction, Module, ValueType};
use std::fmt;
use thiserror::Error;
use MaybeValue::{Unknown, Val};

/// Name of the logging call provided by the interpreter when the module does
/// not define a function with that name.
pub const LOG_FUNCTION: &str = "$log";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("export \"{export}\" refers to undefined function {func}")]
    UndefinedExport { export: String, func: String },

    #[error("stack underflow in {func}: '{instruction}' needs {needed} operand(s), found {found}")]
    StackUnderflow {
        func: String,
        instruction: &'static str,
        needed: usize,
        found: usize,
    },

    #[error("type mismatch in {func}: '{instruction}' expected {expected}, found {found}")]
    TypeMismatch {
        func: String,
        instruction: &'static str,
        expected: ValueType,
        found: ValueType,
    },

    #[error("call to undefined function {callee} in {func}")]
    UndefinedCallee { func: String, callee: String },

    #[error("{kind} name '{name}' must start with '$'")]
    MissingSigil { kind: &'static str, name: String },
}

/// Every violation found in a module, in check order (exports, function
/// bodies, identifiers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// The first violation, for callers that only report one.
    pub fn first(&self) -> Option<&ValidationError> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Run every check. `Ok(())` means the module passed all of them.
pub fn validate(module: &Module) -> Result<(), ValidationErrors> {
    let mut errors = check_exports(module);
    errors.extend(check_stack_effects(module));
    errors.extend(check_identifiers(module));
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

// ============================================================================
// Exports
// ============================================================================

pub fn check_exports(module: &Module) -> Vec<ValidationError> {
    module
        .exports
        .iter()
        .filter(|export| module.function_index(&export.func).is_none())
        .map(|export| ValidationError::UndefinedExport {
            export: export.name.clone(),
            func: export.func.to_string(),
        })
        .collect()
}

// ============================================================================
// Stack effects
// ============================================================================

pub fn check_stack_effects(module: &Module) -> Vec<ValidationError> {
    module
        .functions
        .iter()
        .enumerate()
        .filter_map(|(position, func)| {
            let mut checker = StackChecker::new(module, func, position);
            checker.sequence(&func.body).err()
        })
        .collect()
}

/// The kind of an abstract stack slot. `Unknown` is produced by pops from the
/// polymorphic stack of unreachable code and matches any kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MaybeValue {
    Val(ValueType),
    Unknown,
}

struct StackChecker<'m> {
    module: &'m Module,
    func: &'m Func,
    func_name: String,
    vals: Vec<MaybeValue>,
    /// Set after `br` or `return`; the rest of the sequence cannot run.
    unreachable: bool,
}

impl<'m> StackChecker<'m> {
    fn new(module: &'m Module, func: &'m Func, position: usize) -> Self {
        Self {
            module,
            func,
            func_name: func.display_name(position),
            vals: Vec::new(),
            unreachable: false,
        }
    }

    fn push_val(&mut self, val: MaybeValue) {
        self.vals.push(val);
    }

    fn pop_val(&mut self, instruction: &'static str, needed: usize) -> Result<MaybeValue, ValidationError> {
        match self.vals.pop() {
            Some(val) => Ok(val),
            None if self.unreachable => Ok(Unknown),
            None => Err(ValidationError::StackUnderflow {
                func: self.func_name.clone(),
                instruction,
                needed,
                found: 0,
            }),
        }
    }

    /// Pop `needed` values of `expected` kind, reporting the full shortfall
    /// when the stack is too shallow.
    fn pop_expected(
        &mut self,
        instruction: &'static str,
        expected: ValueType,
        needed: usize,
    ) -> Result<(), ValidationError> {
        if !self.unreachable && self.vals.len() < needed {
            return Err(ValidationError::StackUnderflow {
                func: self.func_name.clone(),
                instruction,
                needed,
                found: self.vals.len(),
            });
        }
        for _ in 0..needed {
            if let Val(found) = self.pop_val(instruction, needed)? {
                if found != expected {
                    return Err(ValidationError::TypeMismatch {
                        func: self.func_name.clone(),
                        instruction,
                        expected,
                        found,
                    });
                }
            }
        }
        Ok(())
    }

    fn sig_unary(&mut self, instruction: &'static str) -> Result<(), ValidationError> {
        self.pop_expected(instruction, ValueType::I32, 1)?;
        self.push_val(Val(ValueType::I32));
        Ok(())
    }

    fn sig_binary(&mut self, instruction: &'static str) -> Result<(), ValidationError> {
        self.pop_expected(instruction, ValueType::I32, 2)?;
        self.push_val(Val(ValueType::I32));
        Ok(())
    }

    fn sequence(&mut self, body: &[Instruction]) -> Result<(), ValidationError> {
        for instruction in body {
            self.instruction(instruction)?;
        }
        Ok(())
    }

    /// Simulate a nested body. Whatever ends the body, execution resumes
    /// after the construct, so reachability is restored afterwards.
    fn nested(&mut self, body: &[Instruction]) -> Result<bool, ValidationError> {
        let outer = self.unreachable;
        self.sequence(body)?;
        let ended_unreachable = self.unreachable;
        self.unreachable = outer;
        Ok(ended_unreachable)
    }

    fn instruction(&mut self, instruction: &Instruction) -> Result<(), ValidationError> {
        let name = instruction.opcode().name();
        match instruction {
            Instruction::I32Const(_) | Instruction::LocalGet(_) | Instruction::GlobalGet(_) => {
                self.push_val(Val(ValueType::I32));
            }
            Instruction::LocalSet(_) | Instruction::GlobalSet(_) => {
                self.pop_expected(name, ValueType::I32, 1)?;
            }
            Instruction::LocalTee(_) | Instruction::I32Clz | Instruction::I32Load(_) => {
                self.sig_unary(name)?;
            }
            Instruction::I32Add
            | Instruction::I32Sub
            | Instruction::I32Mul
            | Instruction::I32DivS
            | Instruction::I32GeU
            | Instruction::I32GtS
            | Instruction::I32LtS
            | Instruction::I32LtU => self.sig_binary(name)?,
            Instruction::I32Store(_) => self.pop_expected(name, ValueType::I32, 2)?,
            Instruction::Nop => {}
            Instruction::Block { body, .. } | Instruction::Loop { body, .. } => {
                self.nested(body)?;
            }
            Instruction::If { then, else_, .. } => {
                self.pop_expected(name, ValueType::I32, 1)?;
                let entry = self.vals.clone();
                let then_unreachable = self.nested(then)?;
                let then_vals = std::mem::replace(&mut self.vals, entry);
                let else_unreachable = self.nested(else_)?;
                self.vals = match (then_unreachable, else_unreachable) {
                    (true, false) => std::mem::take(&mut self.vals),
                    (false, true) => then_vals,
                    _ if then_vals.len() < self.vals.len() => then_vals,
                    _ => std::mem::take(&mut self.vals),
                };
                if then_unreachable && else_unreachable {
                    self.unreachable = true;
                }
            }
            Instruction::Br(_) => self.unreachable = true,
            Instruction::BrIf { condition, .. } => {
                self.sequence(condition)?;
                self.pop_expected(name, ValueType::I32, 1)?;
            }
            Instruction::Return => {
                let results = self.func.results.len();
                self.pop_expected(name, ValueType::I32, results)?;
                self.unreachable = true;
            }
            Instruction::Call(callee) => self.call(callee)?,
        }
        Ok(())
    }

    fn call(&mut self, callee: &Index) -> Result<(), ValidationError> {
        match self.module.function_index(callee) {
            Some(position) => {
                let target = &self.module.functions[position];
                self.pop_expected("call", ValueType::I32, target.params.len())?;
                for ty in &target.results {
                    self.push_val(Val(*ty));
                }
                Ok(())
            }
            None if callee.name() == Some(LOG_FUNCTION) => self.pop_expected("call", ValueType::I32, 1),
            None => Err(ValidationError::UndefinedCallee {
                func: self.func_name.clone(),
                callee: callee.to_string(),
            }),
        }
    }
}

// ============================================================================
// Identifiers
// ============================================================================

pub fn check_identifiers(module: &Module) -> Vec<ValidationError> {
    let memories = module.memories.iter().map(|m| ("memory", &m.name));
    let globals = module.globals.iter().map(|g| ("global", &g.name));
    let functions = module.functions.iter().flat_map(|f| {
        std::iter::once(("function", &f.name))
            .chain(f.params.iter().map(|p| ("param", &p.name)))
            .chain(f.locals.iter().map(|l| ("local", &l.name)))
    });

    memories
        .chain(globals)
        .chain(functions)
        .filter_map(|(kind, name)| match name {
            Some(name) if !name.starts_with('$') => Some(ValidationError::MissingSigil {
                kind,
                name: name.clone(),
            }),
            _ => None,
        })
        .collect()
}
