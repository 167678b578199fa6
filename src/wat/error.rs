//! Lexical errors.

use super::token::Span;
use std::fmt;

/// An error encountered during tokenization: an illegal character, an
/// unterminated string or block comment, or a malformed number.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl LexError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    pub fn line(&self) -> u32 {
        self.span.line
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.message)
    }
}

impl std::error::Error for LexError {}
