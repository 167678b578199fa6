//! WAT Parser: token stream -> [`Module`].
//!
//! A recursive-descent parser over the tokens produced by the lexer. Each
//! parsing method corresponds to one grammar production, noted in its doc
//! comment. The parser only moves forward: decisions are made by peeking at
//! the next one or two tokens, never by rewinding.
//!
//! Instruction bodies accept the folded form `(i32.add (i32.const 1) (i32.const
//! 2))` and the flat form `i32.const 1 i32.const 2 i32.add`, freely mixed.
//! Nested operands of a folded instruction are emitted before the instruction
//! itself, so both forms produce the same instruction sequence.

use super::token::{parse_i32, parse_u32, Keyword, Span, Token, TokenKind};
use crate::ast::{
    Export, Func, Global, Index, Instruction, Local, MemArg, Memory, Module, Opcode, Param, ValueType,
};
use std::fmt;

/// Deepest allowed nesting of instruction sequences and folded groups.
const MAX_NESTING: usize = 500;

// ============================================================================
// Error Type
// ============================================================================

/// An error encountered during parsing. Parsing stops at the first error and
/// no partial module is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    /// The offending token, when the error is about a specific token.
    pub found: Option<TokenKind>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            found: None,
        }
    }

    /// Creates an "unexpected X, expected Y" error for `token`.
    pub fn unexpected(token: &Token, expected: &str) -> Self {
        Self {
            message: format!("unexpected {}, expected {}", token.kind, expected),
            span: token.span,
            found: Some(token.kind.clone()),
        }
    }

    pub fn line(&self) -> u32 {
        self.span.line
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at line {}, column {}",
            self.message, self.span.line, self.span.column
        )
    }
}

impl std::error::Error for ParseError {}

// ============================================================================
// Entry point
// ============================================================================

/// Parses a token stream into a [`Module`].
///
/// # Grammar
///
/// ```text
/// module ::= '(' 'module' id? field* ')'
/// ```
///
/// # Example
///
/// ```
/// use wati::wat;
///
/// let tokens = wat::tokenize("(module (func $f (result i32) (i32.const 42)))").unwrap();
/// let module = wat::parse(&tokens).unwrap();
/// assert_eq!(module.functions.len(), 1);
/// ```
pub fn parse(tokens: &[Token]) -> Result<Module, ParseError> {
    Parser::new(tokens).module()
}

/// Function signature sections, in the only order they may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Section {
    Export,
    Param,
    Result,
    Local,
}

impl Section {
    fn keyword(self) -> Keyword {
        match self {
            Section::Export => Keyword::Export,
            Section::Param => Keyword::Param,
            Section::Result => Keyword::Result,
            Section::Local => Keyword::Local,
        }
    }
}

/// Where an instruction sequence ends. The terminator is left for the caller
/// to consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// Folded bodies: `)`.
    Close,
    /// Flat `block`/`loop` bodies and flat else arms: `end`.
    End,
    /// Flat then arms: `else` or `end`.
    ElseOrEnd,
    /// Operands of a folded `if`: `)`, a bare `else`, or a `(then …)` /
    /// `(else …)` group.
    IfArms,
    /// A bare else arm inside a folded `if`: `end` or `)`.
    EndOrClose,
}

impl Stop {
    fn expected(self) -> &'static str {
        match self {
            Stop::Close => "instruction or ')'",
            Stop::End => "instruction or 'end'",
            Stop::ElseOrEnd => "instruction, 'else' or 'end'",
            Stop::IfArms => "instruction, '(then', '(else' or ')'",
            Stop::EndOrClose => "instruction, 'end' or ')'",
        }
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    /// Open instruction sequences and folded groups.
    depth: usize,
    /// Returned by `peek` once the input runs out, so a stream without a
    /// trailing end-of-input token still fails cleanly.
    eof: Token,
}

// ============================================================================
// Token navigation
// ============================================================================

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        let span = tokens.last().map(|t| t.span.after()).unwrap_or(Span::ZERO);
        Self {
            tokens,
            pos: 0,
            depth: 0,
            eof: Token::new(TokenKind::Eof, span),
        }
    }

    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or(&self.eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::unexpected(self.peek(), expected)
    }

    /// Whether the next two tokens are `(` followed by `keyword`.
    fn at_group(&self, keyword: Keyword) -> bool {
        self.peek().kind == TokenKind::LeftParen && self.peek_nth(1).kind == TokenKind::Keyword(keyword)
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek().kind == TokenKind::Keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_left_paren(&mut self) -> Result<(), ParseError> {
        if self.peek().kind != TokenKind::LeftParen {
            return Err(self.unexpected("'('"));
        }
        self.advance();
        Ok(())
    }

    fn expect_right_paren(&mut self, closing: &str) -> Result<(), ParseError> {
        if self.peek().kind != TokenKind::RightParen {
            return Err(self.unexpected(&format!("')' to close '{}'", closing)));
        }
        self.advance();
        Ok(())
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if !self.eat_keyword(keyword) {
            return Err(self.unexpected(&format!("'{}'", keyword.as_str())));
        }
        Ok(())
    }

    /// Consume `(` and the given keyword.
    fn open_group(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        self.expect_left_paren()?;
        self.expect_keyword(keyword)
    }

    fn optional_id(&mut self) -> Option<String> {
        match &self.peek().kind {
            TokenKind::Id(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        }
    }

    /// `label ::= id | u32`, optional after `block`, `loop` and `if`.
    fn optional_label(&mut self) -> Result<Option<Index>, ParseError> {
        match self.peek().kind {
            TokenKind::Id(_) | TokenKind::Number(_) => {
                let token = self.advance();
                index_of(&token).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// `idx ::= id | u32`
    fn index(&mut self, what: &str) -> Result<Index, ParseError> {
        match self.peek().kind {
            TokenKind::Id(_) | TokenKind::Number(_) => {
                let token = self.advance();
                index_of(&token)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn value_type(&mut self) -> Result<ValueType, ParseError> {
        match self.peek().kind {
            TokenKind::Type(ty) => {
                self.advance();
                Ok(ty)
            }
            _ => Err(self.unexpected("value type")),
        }
    }

    fn string(&mut self, what: &str) -> Result<String, ParseError> {
        match &self.peek().kind {
            TokenKind::String(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn i32_literal(&mut self) -> Result<i32, ParseError> {
        match self.peek().kind {
            TokenKind::Number(_) => {
                let token = self.advance();
                i32_of(&token)
            }
            _ => Err(self.unexpected("integer literal")),
        }
    }

    fn u32_literal(&mut self, what: &str) -> Result<u32, ParseError> {
        match &self.peek().kind {
            TokenKind::Number(text) => match parse_u32(text) {
                Some(value) => {
                    self.advance();
                    Ok(value)
                }
                None => Err(ParseError::new(
                    format!("{} out of range: {}", what, text),
                    self.peek().span,
                )),
            },
            _ => Err(self.unexpected(what)),
        }
    }
}

// ============================================================================
// Module fields
// ============================================================================

impl<'t> Parser<'t> {
    /// `module ::= '(' 'module' id? field* ')'`
    fn module(&mut self) -> Result<Module, ParseError> {
        self.open_group(Keyword::Module)?;
        self.optional_id();

        let mut module = Module::new();
        loop {
            match self.peek().kind {
                TokenKind::RightParen => break,
                TokenKind::LeftParen => self.field(&mut module)?,
                _ => return Err(self.unexpected("module field or ')'")),
            }
        }
        self.advance();

        if self.peek().kind != TokenKind::Eof {
            return Err(self.unexpected("end of input after module"));
        }
        Ok(module)
    }

    /// `field ::= func | export | memory | global`
    fn field(&mut self, module: &mut Module) -> Result<(), ParseError> {
        match self.peek_nth(1).kind {
            TokenKind::Keyword(Keyword::Func) => {
                let name_span = self.peek_nth(2).span;
                let func = self.func()?;
                if let Some(name) = &func.name {
                    if module.function_by_name(name).is_some() {
                        return Err(ParseError::new(format!("duplicate function {}", name), name_span));
                    }
                }
                module.functions.push(func);
            }
            TokenKind::Keyword(Keyword::Export) => module.exports.push(self.export()?),
            TokenKind::Keyword(Keyword::Memory) => module.memories.push(self.memory()?),
            TokenKind::Keyword(Keyword::Global) => module.globals.push(self.global()?),
            _ => {
                self.advance();
                return Err(self.unexpected("'func', 'export', 'memory' or 'global'"));
            }
        }
        Ok(())
    }

    /// `func ::= '(' 'func' id? inline_export* param* result* local* instr* ')'`
    fn func(&mut self) -> Result<Func, ParseError> {
        self.open_group(Keyword::Func)?;
        let mut func = Func {
            name: self.optional_id(),
            ..Func::default()
        };

        let mut current = Section::Export;
        while let Some(section) = self.signature_section() {
            if section < current {
                return Err(ParseError::new(
                    format!(
                        "'{}' declared after '{}'",
                        section.keyword().as_str(),
                        current.keyword().as_str()
                    ),
                    self.peek_nth(1).span,
                ));
            }
            current = section;
            match section {
                Section::Export => func.exports.push(self.inline_export()?),
                Section::Param => {
                    for (name, ty) in self.declarations(Keyword::Param)? {
                        func.params.push(Param { name, ty });
                    }
                }
                Section::Result => self.results(&mut func.results)?,
                Section::Local => {
                    for (name, ty) in self.declarations(Keyword::Local)? {
                        func.locals.push(Local { name, ty });
                    }
                }
            }
        }

        func.body = self.sequence(Stop::Close)?;
        self.expect_right_paren("func")?;
        Ok(func)
    }

    fn signature_section(&self) -> Option<Section> {
        if self.peek().kind != TokenKind::LeftParen {
            return None;
        }
        match self.peek_nth(1).kind {
            TokenKind::Keyword(Keyword::Export) => Some(Section::Export),
            TokenKind::Keyword(Keyword::Param) => Some(Section::Param),
            TokenKind::Keyword(Keyword::Result) => Some(Section::Result),
            TokenKind::Keyword(Keyword::Local) => Some(Section::Local),
            _ => None,
        }
    }

    /// `inline_export ::= '(' 'export' string ')'`
    fn inline_export(&mut self) -> Result<String, ParseError> {
        self.open_group(Keyword::Export)?;
        let name = self.string("export name")?;
        self.expect_right_paren("export")?;
        Ok(name)
    }

    /// `param ::= '(' 'param' id valtype ')' | '(' 'param' valtype* ')'`
    ///
    /// `local` has the same shape.
    fn declarations(&mut self, keyword: Keyword) -> Result<Vec<(Option<String>, ValueType)>, ParseError> {
        self.open_group(keyword)?;
        let mut declared = Vec::new();
        if let Some(name) = self.optional_id() {
            declared.push((Some(name), self.value_type()?));
        } else {
            while self.peek().kind != TokenKind::RightParen {
                declared.push((None, self.value_type()?));
            }
        }
        self.expect_right_paren(keyword.as_str())?;
        Ok(declared)
    }

    /// `result ::= '(' 'result' valtype* ')'`
    fn results(&mut self, results: &mut Vec<ValueType>) -> Result<(), ParseError> {
        self.open_group(Keyword::Result)?;
        while self.peek().kind != TokenKind::RightParen {
            let span = self.peek().span;
            results.push(self.value_type()?);
            if results.len() > 1 {
                return Err(ParseError::new("multiple results are not supported", span));
            }
        }
        self.expect_right_paren("result")
    }

    /// `export ::= '(' 'export' string '(' 'func' idx ')' ')'`
    fn export(&mut self) -> Result<Export, ParseError> {
        self.open_group(Keyword::Export)?;
        let name = self.string("export name")?;
        self.open_group(Keyword::Func)?;
        let func = self.index("function reference")?;
        self.expect_right_paren("func")?;
        self.expect_right_paren("export")?;
        Ok(Export { name, func })
    }

    /// `memory ::= '(' 'memory' id? u32 ')'`
    fn memory(&mut self) -> Result<Memory, ParseError> {
        self.open_group(Keyword::Memory)?;
        let name = self.optional_id();
        let pages = self.u32_literal("page count")?;
        self.expect_right_paren("memory")?;
        Ok(Memory { name, pages })
    }

    /// `global ::= '(' 'global' id? globaltype init ')'`
    ///
    /// `globaltype ::= valtype | '(' 'mut' valtype ')'`
    ///
    /// `init ::= '(' 'i32.const' num ')' | 'i32.const' num`
    fn global(&mut self) -> Result<Global, ParseError> {
        self.open_group(Keyword::Global)?;
        let name = self.optional_id();

        let (ty, mutable) = if self.at_group(Keyword::Mut) {
            self.open_group(Keyword::Mut)?;
            let ty = self.value_type()?;
            self.expect_right_paren("mut")?;
            (ty, true)
        } else {
            (self.value_type()?, false)
        };

        let folded = self.peek().kind == TokenKind::LeftParen;
        if folded {
            self.advance();
        }
        if self.peek().kind != TokenKind::Instr(Opcode::I32Const) {
            return Err(self.unexpected("constant initializer 'i32.const'"));
        }
        self.advance();
        let init = self.i32_literal()?;
        if folded {
            self.expect_right_paren("i32.const")?;
        }

        self.expect_right_paren("global")?;
        Ok(Global {
            name,
            ty,
            mutable,
            init,
        })
    }
}

// ============================================================================
// Instructions
// ============================================================================

impl<'t> Parser<'t> {
    fn at_stop(&self, stop: Stop) -> bool {
        let kind = &self.peek().kind;
        let close = *kind == TokenKind::RightParen;
        let end = *kind == TokenKind::Keyword(Keyword::End);
        let bare_else = *kind == TokenKind::Keyword(Keyword::Else);
        match stop {
            Stop::Close => close,
            Stop::End => end,
            Stop::ElseOrEnd => bare_else || end,
            Stop::IfArms => close || bare_else || self.at_group(Keyword::Then) || self.at_group(Keyword::Else),
            Stop::EndOrClose => end || close,
        }
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new("nesting too deep", self.peek().span));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// `instr*` up to (not including) the terminator named by `stop`.
    fn sequence(&mut self, stop: Stop) -> Result<Vec<Instruction>, ParseError> {
        self.nested(|parser| parser.sequence_items(stop))
    }

    fn sequence_items(&mut self, stop: Stop) -> Result<Vec<Instruction>, ParseError> {
        let mut out = Vec::new();
        while !self.at_stop(stop) {
            if self.peek().kind == TokenKind::LeftParen {
                self.folded(&mut out)?;
                continue;
            }
            if let TokenKind::Instr(opcode) = self.peek().kind {
                self.flat(opcode, &mut out)?;
                continue;
            }
            return Err(self.unexpected(stop.expected()));
        }
        Ok(out)
    }

    /// Flat operands: literals and identifiers up to the next instruction
    /// tag, keyword or parenthesis.
    fn operands(&mut self) -> Vec<Token> {
        let mut operands = Vec::new();
        while matches!(
            self.peek().kind,
            TokenKind::Number(_) | TokenKind::Id(_) | TokenKind::String(_)
        ) {
            operands.push(self.advance());
        }
        operands
    }

    /// Optional label after `end` or `else`; it must repeat the construct's
    /// own label.
    fn end_label(&mut self, label: &Option<Index>) -> Result<(), ParseError> {
        if let TokenKind::Id(name) = &self.peek().kind {
            if label.as_ref().and_then(Index::name) != Some(name.as_str()) {
                return Err(ParseError::unexpected(self.peek(), "matching block label"));
            }
            self.advance();
        }
        Ok(())
    }

    /// ```text
    /// flat ::= 'block' label? instr* 'end' id?
    ///        | 'loop' label? instr* 'end' id?
    ///        | 'if' label? instr* ('else' id? instr*)? 'end' id?
    ///        | 'br_if' idx
    ///        | plaininstr operand*
    /// ```
    fn flat(&mut self, opcode: Opcode, out: &mut Vec<Instruction>) -> Result<(), ParseError> {
        let span = self.advance().span;
        match opcode {
            Opcode::Block | Opcode::Loop => {
                let label = self.optional_label()?;
                let body = self.sequence(Stop::End)?;
                self.expect_keyword(Keyword::End)?;
                self.end_label(&label)?;
                out.push(if opcode == Opcode::Block {
                    Instruction::Block { label, body }
                } else {
                    Instruction::Loop { label, body }
                });
            }
            Opcode::If => {
                let label = self.optional_label()?;
                let then = self.sequence(Stop::ElseOrEnd)?;
                let else_ = if self.eat_keyword(Keyword::Else) {
                    self.end_label(&label)?;
                    self.sequence(Stop::End)?
                } else {
                    Vec::new()
                };
                self.expect_keyword(Keyword::End)?;
                self.end_label(&label)?;
                out.push(Instruction::If { label, then, else_ });
            }
            Opcode::BrIf => {
                let target = self.index("branch label")?;
                out.push(Instruction::BrIf {
                    target,
                    condition: Vec::new(),
                });
            }
            _ => {
                let operands = self.operands();
                out.push(leaf(opcode, &operands, span)?);
            }
        }
        Ok(())
    }

    /// ```text
    /// folded ::= '(' 'block' label? instr* ')'
    ///          | '(' 'loop' label? instr* ')'
    ///          | '(' 'if' label? folded* ('(' 'then' instr* ')')? ('(' 'else' instr* ')')? ')'
    ///          | '(' 'br_if' idx instr* ')'
    ///          | '(' plaininstr (operand | folded)* ')'
    /// ```
    fn folded(&mut self, out: &mut Vec<Instruction>) -> Result<(), ParseError> {
        self.nested(|parser| parser.folded_group(out))
    }

    fn folded_group(&mut self, out: &mut Vec<Instruction>) -> Result<(), ParseError> {
        self.expect_left_paren()?;
        let opcode = match self.peek().kind {
            TokenKind::Instr(opcode) => opcode,
            _ => return Err(self.unexpected("instruction")),
        };
        let span = self.advance().span;

        match opcode {
            Opcode::Block | Opcode::Loop => {
                let label = self.optional_label()?;
                let body = self.sequence(Stop::Close)?;
                out.push(if opcode == Opcode::Block {
                    Instruction::Block { label, body }
                } else {
                    Instruction::Loop { label, body }
                });
            }
            Opcode::If => self.folded_if(out)?,
            Opcode::BrIf => {
                let target = self.index("branch label")?;
                let condition = self.sequence(Stop::Close)?;
                out.push(Instruction::BrIf { target, condition });
            }
            _ => {
                let mut operands = Vec::new();
                let mut children = Vec::new();
                loop {
                    match self.peek().kind {
                        TokenKind::Number(_) | TokenKind::Id(_) | TokenKind::String(_) => {
                            operands.push(self.advance())
                        }
                        TokenKind::LeftParen => self.folded(&mut children)?,
                        _ => break,
                    }
                }
                let instruction = leaf(opcode, &operands, span)?;
                out.extend(children);
                out.push(instruction);
            }
        }

        self.expect_right_paren(opcode.name())
    }

    /// The arms of a folded `if`, after the `if` tag.
    ///
    /// With a `(then …)` group, the instructions before it compute the
    /// condition and are emitted ahead of the `if`. Without one, they form the
    /// then arm and the condition is taken from the stack.
    fn folded_if(&mut self, out: &mut Vec<Instruction>) -> Result<(), ParseError> {
        let label = self.optional_label()?;
        let mut condition = self.sequence(Stop::IfArms)?;

        let then = if self.at_group(Keyword::Then) {
            self.open_group(Keyword::Then)?;
            let then = self.sequence(Stop::Close)?;
            self.expect_right_paren("then")?;
            then
        } else {
            std::mem::take(&mut condition)
        };

        let else_ = if self.at_group(Keyword::Else) {
            self.open_group(Keyword::Else)?;
            let else_ = self.sequence(Stop::Close)?;
            self.expect_right_paren("else")?;
            else_
        } else if self.eat_keyword(Keyword::Else) {
            let else_ = self.sequence(Stop::EndOrClose)?;
            self.eat_keyword(Keyword::End);
            else_
        } else {
            Vec::new()
        };

        out.extend(condition);
        out.push(Instruction::If { label, then, else_ });
        Ok(())
    }
}

// ============================================================================
// Leaf instructions
// ============================================================================

/// Build a non-structured instruction from its immediate operands, checking
/// them against the opcode's arity.
fn leaf(opcode: Opcode, operands: &[Token], span: Span) -> Result<Instruction, ParseError> {
    let arity = opcode.arity();
    if !arity.accepts(operands.len()) {
        return Err(ParseError::new(
            format!("'{}' expects {}, found {}", opcode, arity, operands.len()),
            span,
        ));
    }

    let instruction = match opcode {
        Opcode::I32Const => Instruction::I32Const(i32_of(&operands[0])?),
        Opcode::LocalGet => Instruction::LocalGet(index_of(&operands[0])?),
        Opcode::LocalSet => Instruction::LocalSet(index_of(&operands[0])?),
        Opcode::LocalTee => Instruction::LocalTee(index_of(&operands[0])?),
        Opcode::GlobalGet => Instruction::GlobalGet(index_of(&operands[0])?),
        Opcode::GlobalSet => Instruction::GlobalSet(index_of(&operands[0])?),
        Opcode::Br => Instruction::Br(index_of(&operands[0])?),
        Opcode::Call => Instruction::Call(index_of(&operands[0])?),
        Opcode::I32Load => Instruction::I32Load(mem_arg(operands)?),
        Opcode::I32Store => Instruction::I32Store(mem_arg(operands)?),
        _ => Instruction::plain(opcode)
            .ok_or_else(|| ParseError::new(format!("'{}' cannot be used here", opcode), span))?,
    };
    Ok(instruction)
}

fn index_of(token: &Token) -> Result<Index, ParseError> {
    match &token.kind {
        TokenKind::Id(name) => Ok(Index::Named(name.clone())),
        TokenKind::Number(text) => parse_u32(text)
            .map(Index::Position)
            .ok_or_else(|| ParseError::new(format!("index out of range: {}", text), token.span)),
        _ => Err(ParseError::unexpected(token, "identifier or index")),
    }
}

fn i32_of(token: &Token) -> Result<i32, ParseError> {
    match &token.kind {
        TokenKind::Number(text) => parse_i32(text)
            .ok_or_else(|| ParseError::new(format!("i32 constant out of range: {}", text), token.span)),
        _ => Err(ParseError::unexpected(token, "integer literal")),
    }
}

/// `memarg ::= ('offset=' u32)? ('align=' u32)?`
fn mem_arg(operands: &[Token]) -> Result<MemArg, ParseError> {
    let mut arg = MemArg::default();
    for token in operands {
        let text = match &token.kind {
            TokenKind::Id(text) => text.as_str(),
            _ => return Err(ParseError::unexpected(token, "'offset=N' or 'align=N'")),
        };
        let invalid = || ParseError::new(format!("invalid memory immediate: {}", text), token.span);
        if let Some(value) = text.strip_prefix("offset=") {
            arg.offset = parse_u32(value).ok_or_else(invalid)?;
        } else if let Some(value) = text.strip_prefix("align=") {
            arg.align = Some(parse_u32(value).ok_or_else(invalid)?);
        } else {
            return Err(ParseError::unexpected(token, "'offset=N' or 'align=N'"));
        }
    }
    Ok(arg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wat::tokenize;

    fn parse_source(source: &str) -> Result<Module, ParseError> {
        parse(&tokenize(source).expect("tokenize failed"))
    }

    fn body(source: &str) -> Vec<Instruction> {
        let module = parse_source(&format!("(module (func {}))", source)).expect("parse failed");
        module.functions[0].body.clone()
    }

    fn expect_error(source: &str, substring: &str) -> ParseError {
        let err = parse_source(source).expect_err("expected parse error");
        assert!(
            err.message.contains(substring),
            "Expected error containing {:?}, got {:?}",
            substring,
            err.message
        );
        err
    }

    fn named(name: &str) -> Index {
        Index::Named(name.to_string())
    }

    // =========================================================================
    // Module structure
    // =========================================================================

    #[test]
    fn empty_module() {
        assert_eq!(parse_source("(module)").unwrap(), Module::new());
        assert_eq!(parse_source("(module $m)").unwrap(), Module::new());
    }

    #[test]
    fn function_with_export_directive() {
        let module =
            parse_source(r#"(module (func $f (result i32) (i32.const 42)) (export "f" (func $f)))"#).unwrap();
        let func = &module.functions[0];
        assert_eq!(func.name.as_deref(), Some("$f"));
        assert_eq!(func.results, vec![ValueType::I32]);
        assert_eq!(func.body, vec![Instruction::I32Const(42)]);
        assert_eq!(
            module.exports,
            vec![Export {
                name: "f".to_string(),
                func: named("$f"),
            }]
        );
    }

    #[test]
    fn signature_sections() {
        let module = parse_source(
            r#"(module (func $f (export "a") (export "b") (param $x i32) (param i32 i32) (result i32) (local $t i32) (local i32)))"#,
        )
        .unwrap();
        let func = &module.functions[0];
        assert_eq!(func.exports, vec!["a", "b"]);
        assert_eq!(func.params.len(), 3);
        assert_eq!(func.params[0].name.as_deref(), Some("$x"));
        assert_eq!(func.params[1].name, None);
        assert_eq!(func.locals.len(), 2);
        assert_eq!(func.locals[0].name.as_deref(), Some("$t"));
    }

    #[test]
    fn memory_and_globals() {
        let module = parse_source(
            "(module (memory $mem 2) (memory bad 1) (global $g i32 (i32.const -5)) (global (mut i32) i32.const 0x10))",
        )
        .unwrap();
        assert_eq!(module.memories[0].name.as_deref(), Some("$mem"));
        assert_eq!(module.memories[0].pages, 2);
        assert_eq!(module.memories[1].name.as_deref(), Some("bad"));
        assert_eq!(module.globals[0].init, -5);
        assert!(!module.globals[0].mutable);
        assert_eq!(module.globals[1].name, None);
        assert_eq!(module.globals[1].init, 16);
        assert!(module.globals[1].mutable);
    }

    // =========================================================================
    // Instruction forms
    // =========================================================================

    #[test]
    fn folded_operands_come_first() {
        assert_eq!(
            body("(i32.add (i32.const 1) (i32.const 2))"),
            vec![
                Instruction::I32Const(1),
                Instruction::I32Const(2),
                Instruction::I32Add
            ]
        );
    }

    #[test]
    fn flat_and_folded_agree() {
        assert_eq!(
            body("i32.const 7 i32.const 3 i32.sub"),
            body("(i32.sub (i32.const 7) (i32.const 3))")
        );
        assert_eq!(body("(i32.const 7) i32.const 3 (i32.sub)"), body("i32.const 7 i32.const 3 i32.sub"));
    }

    #[test]
    fn flat_block_with_end_label() {
        assert_eq!(
            body("block $b i32.const 1 br $b end $b"),
            vec![Instruction::Block {
                label: Some(named("$b")),
                body: vec![Instruction::I32Const(1), Instruction::Br(named("$b"))],
            }]
        );
    }

    #[test]
    fn folded_loop_with_br_if_condition() {
        assert_eq!(
            body("(loop $l (br_if $l (i32.lt_s (local.get 0) (i32.const 10))))"),
            vec![Instruction::Loop {
                label: Some(named("$l")),
                body: vec![Instruction::BrIf {
                    target: named("$l"),
                    condition: vec![
                        Instruction::LocalGet(Index::Position(0)),
                        Instruction::I32Const(10),
                        Instruction::I32LtS,
                    ],
                }],
            }]
        );
    }

    #[test]
    fn flat_if_else() {
        assert_eq!(
            body("local.get 0 if i32.const 1 else i32.const 2 end"),
            vec![
                Instruction::LocalGet(Index::Position(0)),
                Instruction::If {
                    label: None,
                    then: vec![Instruction::I32Const(1)],
                    else_: vec![Instruction::I32Const(2)],
                }
            ]
        );
    }

    #[test]
    fn folded_if_with_then_and_else_groups() {
        assert_eq!(
            body("(if $t (local.get 0) (then (i32.const 1)) (else (i32.const 2)))"),
            vec![
                Instruction::LocalGet(Index::Position(0)),
                Instruction::If {
                    label: Some(named("$t")),
                    then: vec![Instruction::I32Const(1)],
                    else_: vec![Instruction::I32Const(2)],
                }
            ]
        );
    }

    #[test]
    fn folded_if_without_then_group() {
        assert_eq!(
            body("(if (i32.const 1) (else (i32.const 2)))"),
            vec![Instruction::If {
                label: None,
                then: vec![Instruction::I32Const(1)],
                else_: vec![Instruction::I32Const(2)],
            }]
        );
    }

    #[test]
    fn memory_immediates() {
        assert_eq!(
            body("(i32.store offset=4 align=2 (i32.const 0) (i32.const 9)) i32.load"),
            vec![
                Instruction::I32Const(0),
                Instruction::I32Const(9),
                Instruction::I32Store(MemArg {
                    offset: 4,
                    align: Some(2),
                }),
                Instruction::I32Load(MemArg::default()),
            ]
        );
    }

    #[test]
    fn call_and_return() {
        assert_eq!(
            body("(call $log (i32.const 3)) return nop"),
            vec![
                Instruction::I32Const(3),
                Instruction::Call(named("$log")),
                Instruction::Return,
                Instruction::Nop,
            ]
        );
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn must_start_with_module() {
        let err = expect_error("(func)", "expected 'module'");
        assert_eq!(err.found, Some(TokenKind::Keyword(Keyword::Func)));
        expect_error("module", "expected '('");
        expect_error("", "unexpected end of input");
    }

    #[test]
    fn trailing_tokens_after_module() {
        expect_error("(module) (module)", "expected end of input after module");
    }

    #[test]
    fn unknown_module_field() {
        expect_error("(module (table 1))", "expected 'func', 'export', 'memory' or 'global'");
    }

    #[test]
    fn sections_out_of_order() {
        let err = expect_error("(module (func (result i32) (param i32)))", "'param' declared after 'result'");
        assert_eq!(err.line(), 1);
        expect_error(r#"(module (func (local i32) (export "x")))"#, "'export' declared after 'local'");
    }

    #[test]
    fn malformed_type() {
        expect_error("(module (func (param $x f32)))", "expected value type");
    }

    #[test]
    fn multiple_results_rejected() {
        expect_error("(module (func (result i32 i32)))", "multiple results");
    }

    #[test]
    fn duplicate_function_names() {
        expect_error("(module (func $f) (func $f))", "duplicate function $f");
    }

    #[test]
    fn arity_errors() {
        expect_error("(module (func (i32.const)))", "'i32.const' expects 1 operand, found 0");
        expect_error("(module (func i32.add 1))", "'i32.add' expects 0 operands, found 1");
        expect_error("(module (func (local.get 0 1)))", "'local.get' expects 1 operand, found 2");
    }

    #[test]
    fn unterminated_flat_block() {
        expect_error("(module (func block nop))", "expected instruction or 'end'");
    }

    #[test]
    fn mismatched_end_label() {
        expect_error("(module (func block $a end $b))", "matching block label");
    }

    #[test]
    fn constant_out_of_range() {
        expect_error("(module (func (i32.const 4294967296)))", "out of range");
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let source = format!("(module (func {}))", "(block ".repeat(20_000));
        expect_error(&source, "nesting too deep");

        let source = format!("(module (func {}{}))", "(i32.clz ".repeat(20_000), ")".repeat(20_000));
        expect_error(&source, "nesting too deep");
    }

    #[test]
    fn moderate_nesting_parses() {
        let source = format!("(module (func {}{}))", "(block ".repeat(200), ")".repeat(200));
        assert!(parse_source(&source).is_ok());
    }

    #[test]
    fn error_reports_line() {
        let err = expect_error("(module\n  (func\n    (i32.add 5)))", "expects 0 operands");
        assert_eq!(err.line(), 3);
        assert!(err.to_string().contains("at line 3, column 6"));
    }
}
