//! Per-document suggestion state.
//!
//! Operations accumulate as the stream resolves; `sort_groups` regenerates
//! the grouped view from scratch each time, so the grouping is a pure
//! function of the operation list and re-running it is always safe.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::edit::{EditGroup, EditKind, EditOperation, GroupKind, LineOffset};

/// All suggestion files, keyed by document id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionStore {
    files: HashMap<String, SuggestionFile>,
}

impl SuggestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the file for a document.
    pub fn add_file(&mut self, document_id: &str) -> &mut SuggestionFile {
        self.files
            .entry(document_id.to_string())
            .or_insert_with(|| SuggestionFile::new(document_id))
    }

    pub fn file(&self, document_id: &str) -> Option<&SuggestionFile> {
        self.files.get(document_id)
    }

    pub fn file_mut(&mut self, document_id: &str) -> Option<&mut SuggestionFile> {
        self.files.get_mut(document_id)
    }

    pub fn remove_file(&mut self, document_id: &str) -> Option<SuggestionFile> {
        self.files.remove(document_id)
    }
}

/// Grouped, navigable suggestions for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionFile {
    pub document_id: String,
    operations: Vec<EditOperation>,
    groups: Vec<EditGroup>,
    offsets: Vec<LineOffset>,
    selected: Option<usize>,
}

impl SuggestionFile {
    pub fn new(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            operations: Vec::new(),
            groups: Vec::new(),
            offsets: Vec::new(),
            selected: None,
        }
    }

    pub fn add_operation(&mut self, operation: EditOperation) {
        self.operations.push(operation);
    }

    pub fn operations(&self) -> &[EditOperation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn clear(&mut self) {
        self.operations.clear();
        self.groups.clear();
        self.offsets.clear();
        self.selected = None;
    }

    /// Rebuild groups and offsets from the current operations.
    ///
    /// Operations are ordered by line, deletions before additions on the
    /// same line, then clustered. The previous selection is kept when it
    /// still points at a group, otherwise it falls back to the first group.
    pub fn sort_groups(&mut self) {
        let mut operations = self.operations.clone();
        operations.sort_by_key(|op| (op.line, op.kind == EditKind::Addition));

        self.groups.clear();
        for op in operations {
            match self.groups.last_mut() {
                Some(group) if belongs_to(group, &op) => group.operations.push(op),
                _ => self.groups.push(EditGroup::new(op)),
            }
        }

        self.offsets.clear();
        let mut running = LineOffset::default();
        for group in &self.groups {
            self.offsets.push(running);
            running.added += group.added_lines();
            running.removed += group.removed_lines();
        }

        self.selected = match self.selected {
            _ if self.groups.is_empty() => None,
            Some(i) if i < self.groups.len() => Some(i),
            _ => Some(0),
        };
    }

    pub fn groups_operations(&self) -> &[EditGroup] {
        &self.groups
    }

    pub fn group_kind(&self, index: usize) -> Option<GroupKind> {
        self.groups.get(index).map(EditGroup::kind)
    }

    /// Cumulative line shift contributed by all groups before `index`.
    pub fn offset_for_group(&self, index: usize) -> LineOffset {
        self.offsets.get(index).copied().unwrap_or_default()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_group(&self) -> Option<&EditGroup> {
        self.groups.get(self.selected?)
    }

    pub fn selected_group_operations(&self) -> &[EditOperation] {
        self.selected_group()
            .map(|group| group.operations.as_slice())
            .unwrap_or(&[])
    }

    pub fn select_next_group(&mut self) {
        if let Some(selected) = self.selected {
            self.selected = Some((selected + 1) % self.groups.len());
        }
    }

    pub fn select_previous_group(&mut self) {
        if let Some(selected) = self.selected {
            self.selected = Some((selected + self.groups.len() - 1) % self.groups.len());
        }
    }
}

/// Whether `op` joins the group ending in the previous sorted operation.
fn belongs_to(group: &EditGroup, op: &EditOperation) -> bool {
    let Some(last) = group.operations.last() else {
        return false;
    };
    // Same parsed unit and still contiguous.
    if op.unit == last.unit && op.line <= last.line + 1 {
        return true;
    }
    // Run of same-kind operations on consecutive lines.
    if op.kind == last.kind && op.line == last.line + 1 {
        return true;
    }
    // Additions landing at the anchor of a pure deletion run.
    op.is_addition()
        && group.operations.iter().all(EditOperation::is_deletion)
        && op.line == group.operations[0].line
}
