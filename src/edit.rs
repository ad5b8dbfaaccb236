//! Line-level edit model shared by the diff builder, suggestion store and
//! composer.
//!
//! An `EditOperation` is a single added or removed line. Operations are
//! clustered into `EditGroup`s, each representing one atomic, selectable
//! suggestion.

use serde::{Deserialize, Serialize};

/// Direction of a single line-level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Addition,
    Deletion,
}

/// One added or removed line.
///
/// `line` is a 0-based index in the coordinate space appropriate to the kind:
/// the new-file index for an `Addition`, the old-file index for a `Deletion`.
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOperation {
    pub kind: EditKind,
    pub line: usize,
    /// Line content without its trailing newline.
    pub content: String,
    /// Index of the parsed change unit this operation came from. Operations
    /// from the same unit cluster together even across kind boundaries.
    pub unit: u32,
}

impl EditOperation {
    pub fn addition(line: usize, content: impl Into<String>, unit: u32) -> Self {
        Self {
            kind: EditKind::Addition,
            line,
            content: content.into(),
            unit,
        }
    }

    pub fn deletion(line: usize, content: impl Into<String>, unit: u32) -> Self {
        Self {
            kind: EditKind::Deletion,
            line,
            content: content.into(),
            unit,
        }
    }

    pub fn is_addition(&self) -> bool {
        self.kind == EditKind::Addition
    }

    pub fn is_deletion(&self) -> bool {
        self.kind == EditKind::Deletion
    }
}

/// Derived type of an edit group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// All operations add lines.
    Addition,
    /// All operations remove lines.
    Deletion,
    /// Removed lines immediately followed by added lines at the same anchor.
    Modification,
}

/// An ordered, non-empty run of operations that are contiguous in source
/// position and represent one atomic change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditGroup {
    pub operations: Vec<EditOperation>,
}

impl EditGroup {
    pub fn new(first: EditOperation) -> Self {
        Self {
            operations: vec![first],
        }
    }

    /// Derive the group type from its operations.
    pub fn kind(&self) -> GroupKind {
        let mut saw_addition = false;
        let mut saw_deletion = false;
        for op in &self.operations {
            match op.kind {
                EditKind::Addition => saw_addition = true,
                EditKind::Deletion => saw_deletion = true,
            }
        }
        match (saw_addition, saw_deletion) {
            (true, true) => GroupKind::Modification,
            (false, true) => GroupKind::Deletion,
            _ => GroupKind::Addition,
        }
    }

    /// Line index of the group's earliest operation.
    pub fn start_line(&self) -> usize {
        self.operations
            .iter()
            .map(|op| op.line)
            .min()
            .unwrap_or(0)
    }

    pub fn added_lines(&self) -> usize {
        self.operations.iter().filter(|op| op.is_addition()).count()
    }

    pub fn removed_lines(&self) -> usize {
        self.operations.iter().filter(|op| op.is_deletion()).count()
    }

    /// Removed line contents joined with newlines, in line order.
    pub fn deleted_text(&self) -> String {
        join_sorted(self.operations.iter().filter(|op| op.is_deletion()))
    }

    /// Added line contents joined with newlines, in line order.
    pub fn added_text(&self) -> String {
        join_sorted(self.operations.iter().filter(|op| op.is_addition()))
    }
}

fn join_sorted<'a>(ops: impl Iterator<Item = &'a EditOperation>) -> String {
    let mut ops: Vec<&EditOperation> = ops.collect();
    ops.sort_by_key(|op| op.line);
    ops.iter()
        .map(|op| op.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cumulative line shift contributed by all groups before a given group.
///
/// Earlier pending edits move the absolute line numbers of later groups;
/// this is recomputed whenever the group list changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineOffset {
    pub added: usize,
    pub removed: usize,
}

impl LineOffset {
    /// Net downward shift (can be negative when more lines were removed).
    pub fn net(&self) -> isize {
        self.added as isize - self.removed as isize
    }
}
