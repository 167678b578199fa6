//! The instruction taxonomy shared by the lexer, parser, validator and
//! interpreter.
//!
//! Every instruction tag the tokenizer recognises maps to exactly one
//! [`Opcode`]. The opcode also records how many immediate operands the parser
//! accepts for it.

use serde::Serialize;
use std::fmt;

/// How many immediate operands an instruction takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many literal or identifier operands.
    Exact(usize),
    /// Between `min` and `max` operands inclusive.
    Range(usize, usize),
    /// A structured instruction whose operands are nested instruction
    /// sequences (`block`, `loop`, `if`, `br_if`).
    Nested,
}

impl Arity {
    /// Whether `count` immediate operands satisfy this arity.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::Nested => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(1) => write!(f, "1 operand"),
            Arity::Exact(n) => write!(f, "{} operands", n),
            Arity::Range(min, max) => write!(f, "{} to {} operands", min, max),
            Arity::Nested => write!(f, "nested instructions"),
        }
    }
}

/// An instruction tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Opcode {
    I32Const,
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32GeU,
    I32GtS,
    I32LtS,
    I32LtU,
    I32Clz,
    LocalGet,
    LocalSet,
    LocalTee,
    GlobalGet,
    GlobalSet,
    I32Load,
    I32Store,
    Block,
    Loop,
    If,
    Br,
    BrIf,
    Call,
    Return,
    Nop,
}

impl Opcode {
    /// Every opcode, in table order.
    pub const ALL: [Opcode; 25] = [
        Opcode::I32Const,
        Opcode::I32Add,
        Opcode::I32Sub,
        Opcode::I32Mul,
        Opcode::I32DivS,
        Opcode::I32GeU,
        Opcode::I32GtS,
        Opcode::I32LtS,
        Opcode::I32LtU,
        Opcode::I32Clz,
        Opcode::LocalGet,
        Opcode::LocalSet,
        Opcode::LocalTee,
        Opcode::GlobalGet,
        Opcode::GlobalSet,
        Opcode::I32Load,
        Opcode::I32Store,
        Opcode::Block,
        Opcode::Loop,
        Opcode::If,
        Opcode::Br,
        Opcode::BrIf,
        Opcode::Call,
        Opcode::Return,
        Opcode::Nop,
    ];

    /// The text-format mnemonic.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::I32Const => "i32.const",
            Opcode::I32Add => "i32.add",
            Opcode::I32Sub => "i32.sub",
            Opcode::I32Mul => "i32.mul",
            Opcode::I32DivS => "i32.div_s",
            Opcode::I32GeU => "i32.ge_u",
            Opcode::I32GtS => "i32.gt_s",
            Opcode::I32LtS => "i32.lt_s",
            Opcode::I32LtU => "i32.lt_u",
            Opcode::I32Clz => "i32.clz",
            Opcode::LocalGet => "local.get",
            Opcode::LocalSet => "local.set",
            Opcode::LocalTee => "local.tee",
            Opcode::GlobalGet => "global.get",
            Opcode::GlobalSet => "global.set",
            Opcode::I32Load => "i32.load",
            Opcode::I32Store => "i32.store",
            Opcode::Block => "block",
            Opcode::Loop => "loop",
            Opcode::If => "if",
            Opcode::Br => "br",
            Opcode::BrIf => "br_if",
            Opcode::Call => "call",
            Opcode::Return => "return",
            Opcode::Nop => "nop",
        }
    }

    /// The immediate operand schema checked by the parser.
    pub fn arity(self) -> Arity {
        match self {
            Opcode::I32Const
            | Opcode::LocalGet
            | Opcode::LocalSet
            | Opcode::LocalTee
            | Opcode::GlobalGet
            | Opcode::GlobalSet
            | Opcode::Br
            | Opcode::Call => Arity::Exact(1),
            Opcode::I32Load | Opcode::I32Store => Arity::Range(0, 2),
            Opcode::Block | Opcode::Loop | Opcode::If | Opcode::BrIf => Arity::Nested,
            Opcode::I32Add
            | Opcode::I32Sub
            | Opcode::I32Mul
            | Opcode::I32DivS
            | Opcode::I32GeU
            | Opcode::I32GtS
            | Opcode::I32LtS
            | Opcode::I32LtU
            | Opcode::I32Clz
            | Opcode::Return
            | Opcode::Nop => Arity::Exact(0),
        }
    }

    /// Binary `i32` operators: pop two, push one.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Opcode::I32Add
                | Opcode::I32Sub
                | Opcode::I32Mul
                | Opcode::I32DivS
                | Opcode::I32GeU
                | Opcode::I32GtS
                | Opcode::I32LtS
                | Opcode::I32LtU
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
