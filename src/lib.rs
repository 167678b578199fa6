//! A tokenizer, parser, validator and tree-walking interpreter for a small
//! subset of the WebAssembly text format.
//!
//! The subset covers `i32` arithmetic and comparisons, locals and globals,
//! one linear memory, structured control flow (`block`, `loop`, `if`, `br`,
//! `br_if`, `return`) and direct calls. Instructions may be written flat or
//! folded, and the two forms produce the same [`ast::Module`].
//!
//! # Modules
//!
//! - [`wat`] -- Tokenizer and recursive-descent parser.
//! - [`ast`] -- The module representation and its WAT printer.
//! - [`validate`] -- Export, stack-effect and identifier checks.
//! - [`runtime`] -- The interpreter, its operand stack, memory and globals.
//!
//! # Example
//!
//! ```
//! let source = r#"
//!     (module
//!         (func $f (result i32) (i32.const 42))
//!         (export "f" (func $f)))
//! "#;
//! assert_eq!(wati::run(source, "f", &[]).unwrap(), Some(42));
//! ```

pub mod ast;
pub mod runtime;
pub mod validate;
pub mod wat;

use runtime::{Config, Interpreter, RuntimeError};
use validate::ValidationErrors;
use wat::{LexError, ParseError};

/// Any failure along the tokenize, parse, validate, run pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("validation failed:\n{0}")]
    Validation(#[from] ValidationErrors),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Parse, validate and run one function with the default [`Config`].
pub fn run(source: &str, function: &str, args: &[i32]) -> Result<Option<i32>, Error> {
    run_with(source, function, args, Config::new())
}

/// Like [`run`], with an explicit interpreter configuration.
pub fn run_with(source: &str, function: &str, args: &[i32], config: Config) -> Result<Option<i32>, Error> {
    let module = wat::parse_str(source)?;
    validate::validate(&module)?;
    let mut interpreter = Interpreter::new(&module, config)?;
    Ok(interpreter.execute_function(function, args)?)
}
