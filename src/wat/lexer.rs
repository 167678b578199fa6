//! Lexer for the WebAssembly text subset.
//!
//! Tokenises source into a stream of tokens. The lexer is an iterator that
//! produces tokens lazily; [`Lexer::tokenize`] collects them and appends the
//! end-of-input token the parser relies on.
//!
//! ```
//! use wati::wat::{Lexer, TokenKind};
//!
//! let tokens = Lexer::tokenize("(func $add)").unwrap();
//! assert_eq!(tokens[2].kind, TokenKind::Id("$add".to_string()));
//! assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
//! ```

use super::cursor::{Cursor, Position};
use super::error::LexError;
use super::token::{Keyword, Token, TokenKind};
use crate::ast::{Opcode, ValueType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static KEYWORDS: Lazy<HashMap<&'static str, Keyword>> =
    Lazy::new(|| Keyword::ALL.iter().map(|k| (k.as_str(), *k)).collect());

static INSTRUCTIONS: Lazy<HashMap<&'static str, Opcode>> =
    Lazy::new(|| Opcode::ALL.iter().map(|op| (op.name(), *op)).collect());

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:0[xX][0-9a-fA-F](?:_?[0-9a-fA-F])*|[0-9](?:_?[0-9])*)$")
        .expect("number pattern is valid")
});

// ============================================================================
// Lexer
// ============================================================================

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
        }
    }

    /// Tokenise the entire source, returning all tokens followed by
    /// [`TokenKind::Eof`], or the first error.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        for token in lexer.by_ref() {
            tokens.push(token?);
        }
        let end = lexer.cursor.position();
        tokens.push(Token::new(TokenKind::Eof, end.span_here()));
        Ok(tokens)
    }

    fn error(&self, message: impl Into<String>, start: Position) -> LexError {
        LexError::new(message, start.span_to(&self.cursor.position()))
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(e) = self.skip_whitespace_and_comments() {
            return Some(Err(e));
        }
        if self.cursor.is_eof() {
            return None;
        }

        let start = self.cursor.position();
        let kind = match self.lex_token(start) {
            Ok(k) => k,
            Err(e) => return Some(Err(e)),
        };
        let span = start.span_to(&self.cursor.position());

        Some(Ok(Token::new(kind, span)))
    }
}

// ============================================================================
// Token dispatch
// ============================================================================

impl<'a> Lexer<'a> {
    fn lex_token(&mut self, start: Position) -> Result<TokenKind, LexError> {
        match self.cursor.peek() {
            Some('(') => {
                self.cursor.advance();
                Ok(TokenKind::LeftParen)
            }
            Some(')') => {
                self.cursor.advance();
                Ok(TokenKind::RightParen)
            }
            Some('"') => self.lex_string(start),
            Some(c) if is_idchar(c) => self.lex_word(start),
            Some(c) => {
                self.cursor.advance();
                Err(self.error(format!("illegal character {:?}", c), start))
            }
            None => Ok(TokenKind::Eof),
        }
    }

    /// Classify a run of identifier characters.
    ///
    /// `$`-prefixed words are identifiers, words starting with a digit (or a
    /// sign followed by a digit) are numbers, then keywords, the type tag and
    /// instruction tags are looked up. Any other bare word is an identifier.
    fn lex_word(&mut self, start: Position) -> Result<TokenKind, LexError> {
        let text = self.cursor.take_while(is_idchar);

        if let Some(name) = text.strip_prefix('$') {
            if name.is_empty() {
                return Err(self.error("empty identifier", start));
            }
            return Ok(TokenKind::Id(text.to_string()));
        }

        if looks_numeric(text) {
            if !NUMBER.is_match(text) {
                return Err(self.error(format!("malformed number '{}'", text), start));
            }
            return Ok(TokenKind::Number(text.to_string()));
        }

        if let Some(keyword) = KEYWORDS.get(text) {
            return Ok(TokenKind::Keyword(*keyword));
        }
        if text == "i32" {
            return Ok(TokenKind::Type(ValueType::I32));
        }
        if let Some(opcode) = INSTRUCTIONS.get(text) {
            return Ok(TokenKind::Instr(*opcode));
        }
        Ok(TokenKind::Id(text.to_string()))
    }
}

// ============================================================================
// Whitespace and comments
// ============================================================================

impl<'a> Lexer<'a> {
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            self.cursor.take_while(|c| c.is_ascii_whitespace());

            match (self.cursor.peek(), self.cursor.peek_second()) {
                (Some(';'), Some(';')) => {
                    self.cursor.take_while(|c| c != '\n');
                }
                (Some('('), Some(';')) => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    /// Skip a `(; … ;)` comment. The comment ends at the first `;)`, so block
    /// comments do not nest.
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start = self.cursor.position();
        self.cursor.advance();
        self.cursor.advance();

        while !self.cursor.starts_with(";)") {
            if self.cursor.advance().is_none() {
                return Err(self.error("unterminated block comment", start));
            }
        }
        self.cursor.advance();
        self.cursor.advance();
        Ok(())
    }
}

// ============================================================================
// Strings
// ============================================================================

impl<'a> Lexer<'a> {
    fn lex_string(&mut self, start: Position) -> Result<TokenKind, LexError> {
        self.cursor.advance();
        let mut value = String::new();
        loop {
            match self.cursor.advance() {
                None | Some('\n') => return Err(self.error("unterminated string", start)),
                Some('"') => break,
                Some('\\') => {
                    let escape_start = self.cursor.position();
                    let escaped = match self.cursor.advance() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some('\\') => '\\',
                        Some(other) => {
                            return Err(
                                self.error(format!("unknown escape '\\{}'", other), escape_start)
                            )
                        }
                        None => return Err(self.error("unterminated string", start)),
                    };
                    value.push(escaped);
                }
                Some(c) => value.push(c),
            }
        }
        Ok(TokenKind::String(value))
    }
}

/// Characters allowed in identifiers, keywords and numbers.
fn is_idchar(c: char) -> bool {
    matches!(
        c,
        '0'..='9'
            | 'a'..='z'
            | 'A'..='Z'
            | '!'
            | '#'
            | '$'
            | '%'
            | '&'
            | '\''
            | '*'
            | '+'
            | '-'
            | '.'
            | '/'
            | ':'
            | '<'
            | '='
            | '>'
            | '?'
            | '@'
            | '\\'
            | '^'
            | '_'
            | '`'
            | '|'
            | '~'
    )
}

fn looks_numeric(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    unsigned.starts_with(|c: char| c.is_ascii_digit())
}
