//! Token types for the WAT lexer.
//!
//! This module defines the lexical tokens produced when tokenising the
//! WebAssembly text subset.

use crate::ast::{Opcode, ValueType};
use std::fmt;

/// A location in source text.
///
/// Spans track both byte offsets (for slicing) and line/column (for errors).
/// Columns count Unicode characters, not bytes, for accurate display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Byte offset where this span starts.
    pub start: usize,
    /// Byte offset just past the end of this span.
    pub end: usize,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, counting characters not bytes).
    pub column: u32,
}

impl Span {
    /// A zero-length span at the start of source, for errors without position.
    pub const ZERO: Span = Span {
        start: 0,
        end: 0,
        line: 1,
        column: 1,
    };

    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// A zero-length span just past this one.
    #[must_use]
    pub fn after(&self) -> Span {
        Span::new(self.end, self.end, self.line, self.column + (self.end - self.start) as u32)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A lexical token with its location in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The source text this token was lexed from.
    ///
    /// ```
    /// use wati::wat;
    ///
    /// let source = "(module)";
    /// let tokens = wat::tokenize(source).unwrap();
    /// assert_eq!(tokens[1].text(source), "module");
    /// ```
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.start..self.span.end]
    }
}

/// Reserved words that structure a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Module,
    Func,
    Param,
    Result,
    Local,
    Export,
    Memory,
    Global,
    Mut,
    Then,
    Else,
    End,
}

impl Keyword {
    pub const ALL: [Keyword; 12] = [
        Keyword::Module,
        Keyword::Func,
        Keyword::Param,
        Keyword::Result,
        Keyword::Local,
        Keyword::Export,
        Keyword::Memory,
        Keyword::Global,
        Keyword::Mut,
        Keyword::Then,
        Keyword::Else,
        Keyword::End,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Module => "module",
            Keyword::Func => "func",
            Keyword::Param => "param",
            Keyword::Result => "result",
            Keyword::Local => "local",
            Keyword::Export => "export",
            Keyword::Memory => "memory",
            Keyword::Global => "global",
            Keyword::Mut => "mut",
            Keyword::Then => "then",
            Keyword::Else => "else",
            Keyword::End => "end",
        }
    }
}

/// The kind of token, with associated data where relevant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Opening parenthesis `(`.
    LeftParen,

    /// Closing parenthesis `)`.
    RightParen,

    /// An identifier as written, including the `$` sigil when present.
    ///
    /// Bare words that are neither keywords nor instruction tags (`bad`,
    /// `offset=8`) are identifiers too; the validator decides whether a name
    /// is well formed.
    Id(String),

    /// A numeric literal, kept as source text. See [`parse_int`].
    Number(String),

    /// A string literal with escape sequences resolved.
    String(String),

    /// A value type tag.
    Type(ValueType),

    Keyword(Keyword),

    /// An instruction tag such as `i32.add`.
    Instr(Opcode),

    /// End of input. Always the last token produced by `tokenize`.
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LeftParen => write!(f, "'('"),
            TokenKind::RightParen => write!(f, "')'"),
            TokenKind::Id(id) => write!(f, "'{}'", id),
            TokenKind::Number(n) => write!(f, "'{}'", n),
            TokenKind::String(s) => write!(f, "{:?}", s),
            TokenKind::Type(t) => write!(f, "'{}'", t),
            TokenKind::Keyword(k) => write!(f, "'{}'", k.as_str()),
            TokenKind::Instr(op) => write!(f, "'{}'", op),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// Parse an integer literal: optional sign, decimal or `0x` hex digits, with
/// `_` separators allowed between digits.
///
/// Returns `None` if the text is malformed or the magnitude does not fit in
/// an `i64`.
pub fn parse_int(text: &str) -> Option<i64> {
    let (negative, unsigned) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (digits, radix) = match unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (unsigned, 10),
    };
    if digits.is_empty()
        || digits.starts_with(&['_', '+', '-'][..])
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return None;
    }
    let clean: String = digits.chars().filter(|&c| c != '_').collect();
    let magnitude = i64::from_str_radix(&clean, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse an `i32` literal. Values in `i32::MIN..=u32::MAX` are accepted;
/// unsigned values above `i32::MAX` wrap to their two's-complement meaning.
pub fn parse_i32(text: &str) -> Option<i32> {
    let value = parse_int(text)?;
    if value < i64::from(i32::MIN) || value > i64::from(u32::MAX) {
        return None;
    }
    Some(value as u32 as i32)
}

/// Parse a non-negative literal that fits in a `u32` (indices, page counts,
/// offsets).
pub fn parse_u32(text: &str) -> Option<u32> {
    u32::try_from(parse_int(text)?).ok()
}
