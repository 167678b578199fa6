//! Interpreter for parsed modules.
//!
//! The interpreter walks the instruction tree directly. It keeps one operand
//! stack per active call, a globals table and at most one linear memory. Each
//! call gets its own [`ExecutionContext`] holding locals and active labels.
//! The module need not have been validated; anything validation would have
//! caught surfaces here as a [`RuntimeError`].
//!
//! ```
//! use wati::runtime::{Config, Interpreter};
//! use wati::wat;
//!
//! let module = wat::parse_str(r#"
//!     (module
//!         (func $add (export "add") (param $a i32) (param $b i32) (result i32)
//!             local.get $a
//!             local.get $b
//!             i32.add))
//! "#).unwrap();
//!
//! let mut interpreter = Interpreter::new(&module, Config::new()).unwrap();
//! assert_eq!(interpreter.execute_function("add", &[2, 3]).unwrap(), Some(5));
//! ```

pub mod config;
pub mod control;
pub mod executor;
pub mod frame;
pub mod globals;
pub mod memory;
pub mod ops;
pub mod stack;
mod test_utils;
pub mod value;

pub use config::Config;
pub use executor::Interpreter;
pub use frame::ExecutionContext;
pub use memory::Memory;
pub use stack::Stack;
pub use value::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Undefined local: {0}")]
    UndefinedLocal(String),
    #[error("Undefined global: {0}")]
    UndefinedGlobal(String),
    #[error("Undefined function: {0}")]
    UndefinedFunction(String),
    #[error("Undefined label: {0}")]
    UndefinedLabel(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Out of bounds memory access: {size} bytes at {address}, memory is {len} bytes")]
    OutOfBounds { address: i64, size: usize, len: usize },
    #[error("Memory of {0} pages exceeds the maximum")]
    MemoryTooLarge(u32),
    #[error("Fuel exhausted")]
    FuelExhausted,
    #[error("Call stack overflow")]
    CallStackOverflow,
    #[error("{function} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },
    #[error("Output error: {0}")]
    Output(String),
}

impl From<std::io::Error> for RuntimeError {
    fn from(e: std::io::Error) -> Self {
        RuntimeError::Output(e.to_string())
    }
}
