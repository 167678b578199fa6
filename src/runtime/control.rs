//! Label stack and branch signals for structured control flow.
//!
//! Each `block`, `loop` and `if` pushes a label while its body runs. A branch
//! resolves its target against this stack into a relative depth, and the
//! resulting [`Flow::Branch`] travels outwards, one construct at a time, until
//! the construct at depth zero handles it.

use super::Value;
use crate::ast::Index;

/// How a sequence of instructions finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Ran off the end.
    Normal,
    /// A branch is in progress. The depth is relative to the construct that
    /// currently sees the signal; `0` means "this one".
    Branch(u32),
    /// `return` executed, carrying the top of the stack at that point.
    Return(Option<Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// Branches exit the block.
    Block,
    /// Branches restart the loop body.
    Loop,
    /// Branches exit the `if`.
    If,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub kind: LabelKind,
    pub name: Option<String>,
}

/// The constructs entered, innermost last, in one function invocation.
#[derive(Debug, Default)]
pub struct LabelStack {
    labels: Vec<Label>,
}

impl LabelStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: LabelKind, label: Option<&Index>) {
        self.labels.push(Label {
            kind,
            name: label.and_then(Index::name).map(str::to_string),
        });
    }

    pub fn pop(&mut self) -> Option<Label> {
        self.labels.pop()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Resolve a branch target into a relative depth.
    ///
    /// Names match the innermost construct carrying that label. A numeric
    /// target is already a depth; a depth equal to the number of active
    /// constructs targets the function body itself, which completes the
    /// function. Returns `None` for targets that are not active.
    pub fn resolve(&self, target: &Index) -> Option<u32> {
        match target {
            Index::Named(name) => self
                .labels
                .iter()
                .rev()
                .position(|label| label.name.as_deref() == Some(name.as_str()))
                .map(|depth| depth as u32),
            Index::Position(depth) => ((*depth as usize) <= self.labels.len()).then_some(*depth),
        }
    }

    /// The label at a relative depth, if it names a construct.
    pub fn get(&self, depth: u32) -> Option<&Label> {
        let depth = depth as usize;
        if depth >= self.labels.len() {
            return None;
        }
        self.labels.get(self.labels.len() - 1 - depth)
    }
}
