//! WebAssembly text (WAT) front end: tokenizer and parser.
//!
//! ```
//! use wati::wat;
//!
//! let tokens = wat::tokenize("(module (func $f (result i32) (i32.const 42)))").unwrap();
//! let module = wat::parse(&tokens).unwrap();
//! assert_eq!(module.functions[0].name.as_deref(), Some("$f"));
//! ```
//!
//! Both stages stop at the first error:
//!
//! ```
//! use wati::wat;
//!
//! assert!(wat::tokenize("\"unterminated string").is_err());
//! assert!(wat::parse_str("(module (func (i32.const)))").is_err());
//! ```

mod cursor;
mod error;
mod lexer;
mod parser;
mod token;

pub use error::LexError;
pub use lexer::Lexer;
pub use parser::{parse, ParseError};
pub use token::{parse_i32, parse_int, parse_u32, Keyword, Span, Token, TokenKind};

use crate::ast::Module;

/// Tokenize `source`. The result always ends with [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::tokenize(source)
}

/// Tokenize and parse in one step.
pub fn parse_str(source: &str) -> Result<Module, crate::Error> {
    let tokens = tokenize(source)?;
    Ok(parse(&tokens)?)
}
