//! WAT printer.
//!
//! `Display for Module` writes canonical folded text: one field per line,
//! one parenthesized instruction per line, nested bodies indented. Every
//! instruction is printed as its own group, so the output re-parses to the
//! same instruction sequence.

use super::{Export, Func, Global, Index, Instruction, MemArg, Memory, Module};
use std::fmt::{self, Display, Formatter, Write};

const INDENT: &str = "  ";

impl Display for Index {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Index::Named(name) => f.write_str(name),
            Index::Position(n) => write!(f, "{}", n),
        }
    }
}

impl Display for MemArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        if self.offset != 0 {
            write!(f, "offset={}", self.offset)?;
            sep = " ";
        }
        if let Some(align) = self.align {
            write!(f, "{}align={}", sep, align)?;
        }
        Ok(())
    }
}

/// Writes an instruction on a single line.
impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Printer::new(f, None).instruction(self)
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Printer::new(f, Some(0)).module(self)
    }
}

impl Display for Func {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Printer::new(f, Some(0)).func(self)
    }
}

impl Display for Memory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("(memory")?;
        if let Some(name) = &self.name {
            write!(f, " {}", name)?;
        }
        write!(f, " {})", self.pages)
    }
}

impl Display for Global {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("(global")?;
        if let Some(name) = &self.name {
            write!(f, " {}", name)?;
        }
        if self.mutable {
            write!(f, " (mut {})", self.ty)?;
        } else {
            write!(f, " {}", self.ty)?;
        }
        write!(f, " (i32.const {}))", self.init)
    }
}

impl Display for Export {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "(export {} (func {}))", Quoted(&self.name), self.func)
    }
}

/// A string literal with `"` and `\` escaped.
struct Quoted<'a>(&'a str);

impl Display for Quoted<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for c in self.0.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\t' => f.write_str("\\t")?,
                '\r' => f.write_str("\\r")?,
                c => f.write_char(c)?,
            }
        }
        f.write_char('"')
    }
}

struct Printer<'a, 'b> {
    f: &'a mut Formatter<'b>,
    /// Current indentation, or `None` to keep everything on one line.
    depth: Option<usize>,
}

impl<'a, 'b> Printer<'a, 'b> {
    fn new(f: &'a mut Formatter<'b>, depth: Option<usize>) -> Self {
        Printer { f, depth }
    }

    /// Start a nested item: a newline and indentation, or a single space.
    fn line(&mut self) -> fmt::Result {
        match self.depth {
            Some(depth) => {
                self.f.write_char('\n')?;
                for _ in 0..depth {
                    self.f.write_str(INDENT)?;
                }
                Ok(())
            }
            None => self.f.write_char(' '),
        }
    }

    fn nested(&mut self, body: impl FnOnce(&mut Self) -> fmt::Result) -> fmt::Result {
        if let Some(depth) = self.depth.as_mut() {
            *depth += 1;
        }
        let result = body(self);
        if let Some(depth) = self.depth.as_mut() {
            *depth -= 1;
        }
        result
    }

    fn module(&mut self, module: &Module) -> fmt::Result {
        self.f.write_str("(module")?;
        self.nested(|p| {
            for memory in &module.memories {
                p.line()?;
                write!(p.f, "{}", memory)?;
            }
            for global in &module.globals {
                p.line()?;
                write!(p.f, "{}", global)?;
            }
            for func in &module.functions {
                p.line()?;
                p.func(func)?;
            }
            for export in &module.exports {
                p.line()?;
                write!(p.f, "{}", export)?;
            }
            Ok(())
        })?;
        self.f.write_char(')')
    }

    fn func(&mut self, func: &Func) -> fmt::Result {
        self.f.write_str("(func")?;
        if let Some(name) = &func.name {
            write!(self.f, " {}", name)?;
        }
        for export in &func.exports {
            write!(self.f, " (export {})", Quoted(export))?;
        }
        for param in &func.params {
            declaration(self.f, "param", param.name.as_deref(), param.ty)?;
        }
        for result in &func.results {
            write!(self.f, " (result {})", result)?;
        }
        for local in &func.locals {
            declaration(self.f, "local", local.name.as_deref(), local.ty)?;
        }
        self.body(&func.body)?;
        self.f.write_char(')')
    }

    fn body(&mut self, body: &[Instruction]) -> fmt::Result {
        self.nested(|p| {
            for instruction in body {
                p.line()?;
                p.instruction(instruction)?;
            }
            Ok(())
        })
    }

    fn instruction(&mut self, instruction: &Instruction) -> fmt::Result {
        write!(self.f, "({}", instruction.opcode())?;
        match instruction {
            Instruction::I32Const(value) => write!(self.f, " {}", value)?,
            Instruction::LocalGet(index)
            | Instruction::LocalSet(index)
            | Instruction::LocalTee(index)
            | Instruction::GlobalGet(index)
            | Instruction::GlobalSet(index)
            | Instruction::Br(index)
            | Instruction::Call(index) => write!(self.f, " {}", index)?,
            Instruction::I32Load(arg) | Instruction::I32Store(arg) => {
                if *arg != MemArg::default() {
                    write!(self.f, " {}", arg)?;
                }
            }
            Instruction::Block { label, body } | Instruction::Loop { label, body } => {
                self.label(label)?;
                self.body(body)?;
            }
            Instruction::If { label, then, else_ } => {
                self.label(label)?;
                self.nested(|p| {
                    p.line()?;
                    p.arm("then", then)?;
                    if !else_.is_empty() {
                        p.line()?;
                        p.arm("else", else_)?;
                    }
                    Ok(())
                })?;
            }
            Instruction::BrIf { target, condition } => {
                write!(self.f, " {}", target)?;
                self.body(condition)?;
            }
            Instruction::I32Add
            | Instruction::I32Sub
            | Instruction::I32Mul
            | Instruction::I32DivS
            | Instruction::I32GeU
            | Instruction::I32GtS
            | Instruction::I32LtS
            | Instruction::I32LtU
            | Instruction::I32Clz
            | Instruction::Return
            | Instruction::Nop => {}
        }
        self.f.write_char(')')
    }

    fn label(&mut self, label: &Option<Index>) -> fmt::Result {
        match label {
            Some(label) => write!(self.f, " {}", label),
            None => Ok(()),
        }
    }

    fn arm(&mut self, keyword: &str, body: &[Instruction]) -> fmt::Result {
        write!(self.f, "({}", keyword)?;
        self.body(body)?;
        self.f.write_char(')')
    }
}

fn declaration(f: &mut Formatter<'_>, keyword: &str, name: Option<&str>, ty: super::ValueType) -> fmt::Result {
    match name {
        Some(name) => write!(f, " ({} {} {})", keyword, name, ty),
        None => write!(f, " ({} {})", keyword, ty),
    }
}
