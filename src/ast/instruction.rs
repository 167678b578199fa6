//! Instruction tree.

use super::opcode::Opcode;
use serde::Serialize;

/// A reference to a local, global, function or label: either by `$name` or by
/// numeric position.
///
/// For labels a position is a relative depth (`0` is the innermost enclosing
/// construct).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Index {
    Named(String),
    Position(u32),
}

impl Index {
    /// The name, if this is a named reference.
    pub fn name(&self) -> Option<&str> {
        match self {
            Index::Named(name) => Some(name),
            Index::Position(_) => None,
        }
    }
}

/// Static immediates of `i32.load` / `i32.store`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MemArg {
    /// Added to the dynamic address.
    pub offset: u32,
    /// Alignment hint as written. Recorded only.
    pub align: Option<u32>,
}

/// A single instruction. Structured instructions own their nested bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Instruction {
    I32Const(i32),
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32GeU,
    I32GtS,
    I32LtS,
    I32LtU,
    I32Clz,
    LocalGet(Index),
    LocalSet(Index),
    LocalTee(Index),
    GlobalGet(Index),
    GlobalSet(Index),
    I32Load(MemArg),
    I32Store(MemArg),
    Block {
        label: Option<Index>,
        body: Vec<Instruction>,
    },
    Loop {
        label: Option<Index>,
        body: Vec<Instruction>,
    },
    If {
        label: Option<Index>,
        then: Vec<Instruction>,
        else_: Vec<Instruction>,
    },
    Br(Index),
    /// `br_if` with the instructions that compute its condition in folded
    /// form. Flat `br_if` has an empty condition and takes the value already
    /// on the stack.
    BrIf {
        target: Index,
        condition: Vec<Instruction>,
    },
    Call(Index),
    Return,
    Nop,
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::I32Const(_) => Opcode::I32Const,
            Instruction::I32Add => Opcode::I32Add,
            Instruction::I32Sub => Opcode::I32Sub,
            Instruction::I32Mul => Opcode::I32Mul,
            Instruction::I32DivS => Opcode::I32DivS,
            Instruction::I32GeU => Opcode::I32GeU,
            Instruction::I32GtS => Opcode::I32GtS,
            Instruction::I32LtS => Opcode::I32LtS,
            Instruction::I32LtU => Opcode::I32LtU,
            Instruction::I32Clz => Opcode::I32Clz,
            Instruction::LocalGet(_) => Opcode::LocalGet,
            Instruction::LocalSet(_) => Opcode::LocalSet,
            Instruction::LocalTee(_) => Opcode::LocalTee,
            Instruction::GlobalGet(_) => Opcode::GlobalGet,
            Instruction::GlobalSet(_) => Opcode::GlobalSet,
            Instruction::I32Load(_) => Opcode::I32Load,
            Instruction::I32Store(_) => Opcode::I32Store,
            Instruction::Block { .. } => Opcode::Block,
            Instruction::Loop { .. } => Opcode::Loop,
            Instruction::If { .. } => Opcode::If,
            Instruction::Br(_) => Opcode::Br,
            Instruction::BrIf { .. } => Opcode::BrIf,
            Instruction::Call(_) => Opcode::Call,
            Instruction::Return => Opcode::Return,
            Instruction::Nop => Opcode::Nop,
        }
    }

    /// Build a leaf instruction that takes no immediates.
    ///
    /// Returns `None` for opcodes that need operands or nested bodies.
    pub fn plain(opcode: Opcode) -> Option<Instruction> {
        let instruction = match opcode {
            Opcode::I32Add => Instruction::I32Add,
            Opcode::I32Sub => Instruction::I32Sub,
            Opcode::I32Mul => Instruction::I32Mul,
            Opcode::I32DivS => Instruction::I32DivS,
            Opcode::I32GeU => Instruction::I32GeU,
            Opcode::I32GtS => Instruction::I32GtS,
            Opcode::I32LtS => Instruction::I32LtS,
            Opcode::I32LtU => Instruction::I32LtU,
            Opcode::I32Clz => Instruction::I32Clz,
            Opcode::Return => Instruction::Return,
            Opcode::Nop => Instruction::Nop,
            _ => return None,
        };
        Some(instruction)
    }
}
