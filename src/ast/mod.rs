//! The module representation produced by the parser.
//!
//! A [`Module`] is built once, bottom-up, and never mutated afterwards. The
//! validator and the interpreter both read it through shared references.

mod display;
mod instruction;
mod opcode;

pub use instruction::{Index, Instruction, MemArg};
pub use opcode::{Arity, Opcode};

use serde::Serialize;
use std::fmt;

/// Size of one linear-memory page in bytes.
pub const PAGE_SIZE: usize = 65536;

/// Value types. Only 32-bit integers are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValueType {
    I32,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::I32 => "i32",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed module.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Module {
    pub memories: Vec<Memory>,
    pub globals: Vec<Global>,
    pub functions: Vec<Func>,
    pub exports: Vec<Export>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of the function with this `$name`.
    pub fn function_by_name(&self, name: &str) -> Option<usize> {
        self.functions
            .iter()
            .position(|f| f.name.as_deref() == Some(name))
    }

    /// Resolve a function reference as written in `call` or an export.
    pub fn function_index(&self, index: &Index) -> Option<usize> {
        match index {
            Index::Named(name) => self.function_by_name(name),
            Index::Position(n) => {
                let n = *n as usize;
                (n < self.functions.len()).then_some(n)
            }
        }
    }

    /// Resolve an exported name, via inline `(export "…")` on a function or a
    /// module-level export directive.
    pub fn exported_function(&self, export: &str) -> Option<usize> {
        if let Some(position) = self
            .functions
            .iter()
            .position(|f| f.exports.iter().any(|e| e == export))
        {
            return Some(position);
        }
        self.exports
            .iter()
            .find(|e| e.name == export)
            .and_then(|e| self.function_index(&e.func))
    }

    /// Look a function up the way the driver and the interpreter entry point
    /// do: by `$name` first, then by export name, then by numeric position.
    pub fn find_function(&self, name: &str) -> Option<usize> {
        self.function_by_name(name)
            .or_else(|| self.exported_function(name))
            .or_else(|| {
                name.parse::<u32>()
                    .ok()
                    .and_then(|n| self.function_index(&Index::Position(n)))
            })
    }

    /// The function a run defaults to: the first export, else the first
    /// function.
    pub fn default_entry(&self) -> Option<usize> {
        let inline = self.functions.iter().position(|f| !f.exports.is_empty());
        let directive = self
            .exports
            .first()
            .and_then(|e| self.function_index(&e.func));
        inline.or(directive).or_else(|| {
            if self.functions.is_empty() {
                None
            } else {
                Some(0)
            }
        })
    }
}

/// A function definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Func {
    pub name: Option<String>,
    /// Names from inline `(export "…")` groups.
    pub exports: Vec<String>,
    pub params: Vec<Param>,
    pub results: Vec<ValueType>,
    pub locals: Vec<Local>,
    pub body: Vec<Instruction>,
}

impl Func {
    /// The name used in diagnostics: `$name`, or `func[N]` for anonymous
    /// functions.
    pub fn display_name(&self, position: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("func[{}]", position),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: Option<String>,
    pub ty: ValueType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Local {
    pub name: Option<String>,
    pub ty: ValueType,
}

/// A module-level `(export "name" (func $f))` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Export {
    pub name: String,
    pub func: Index,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Memory {
    pub name: Option<String>,
    /// Initial size in 64 KiB pages.
    pub pages: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Global {
    pub name: Option<String>,
    pub ty: ValueType,
    pub mutable: bool,
    pub init: i32,
}
