//! Line-level diff construction.
//!
//! Two entry points: [`build_operations`] diffs whole before/after snapshots,
//! and [`operations_for_search_replace`] resolves one parsed change unit
//! against the live document by anchoring its `search` payload first.

mod locate;

pub use locate::locate_anchor;

use imara_diff::{Algorithm, Diff, Hunk, InternedInput};
use tracing::debug;

use crate::config::AnchorConfig;
use crate::document::Document;
use crate::edit::EditOperation;

/// Diff two text snapshots into line-level operations.
///
/// Deletions carry old-file line indices, additions carry new-file indices.
/// Within a hunk, deletions precede additions.
pub fn build_operations(before: &str, after: &str, unit: u32) -> Vec<EditOperation> {
    let input = InternedInput::new(before, after);
    let diff = Diff::compute(Algorithm::Histogram, &input);

    let before_lines: Vec<&str> = before.lines().collect();
    let after_lines: Vec<&str> = after.lines().collect();

    let mut operations = Vec::new();
    for Hunk { before, after } in diff.hunks() {
        for line in before {
            let content = before_lines.get(line as usize).copied().unwrap_or("");
            operations.push(EditOperation::deletion(line as usize, content, unit));
        }
        for line in after {
            let content = after_lines.get(line as usize).copied().unwrap_or("");
            operations.push(EditOperation::addition(line as usize, content, unit));
        }
    }
    operations
}

/// Resolve one search/replace unit against the document.
///
/// The `search` payload is anchored in the document (see [`locate_anchor`]),
/// then diffed against `replace`, and the resulting operations are shifted
/// to absolute document lines. Returns `None` when the anchor cannot be
/// found, in which case the unit must be discarded.
pub fn operations_for_search_replace(
    document: &dyn Document,
    search: &str,
    replace: &str,
    unit: u32,
    config: &AnchorConfig,
) -> Option<Vec<EditOperation>> {
    let document_lines: Vec<&str> = document.text().lines().collect();
    let search_lines: Vec<&str> = search.lines().collect();

    let Some(anchor) = locate_anchor(&document_lines, &search_lines, config) else {
        debug!(unit, lines = search_lines.len(), "anchor not found, dropping unit");
        return None;
    };

    // Diff against the document's actual window so whitespace-tolerant and
    // fuzzy anchors do not produce spurious edits for lines the model
    // merely misquoted.
    let window = document_lines[anchor..anchor + search_lines.len()].join("\n");
    let mut operations = build_operations(&window, replace, unit);
    for op in &mut operations {
        op.line += anchor;
    }
    Some(operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextDocument;
    use crate::edit::EditKind;

    /// Replay operations against `before` and check the result.
    fn apply(before: &str, operations: &[EditOperation]) -> String {
        let mut old_lines: Vec<Option<&str>> = before.lines().map(Some).collect();
        for op in operations {
            if op.is_deletion() {
                old_lines[op.line] = None;
            }
        }
        let mut new_lines: Vec<String> = old_lines
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();
        let mut additions: Vec<&EditOperation> =
            operations.iter().filter(|op| op.is_addition()).collect();
        additions.sort_by_key(|op| op.line);
        for op in additions {
            new_lines.insert(op.line.min(new_lines.len()), op.content.clone());
        }
        new_lines.join("\n")
    }

    #[test]
    fn test_round_trip_reproduces_after() {
        let cases = [
            ("a\nb\nc", "a\nx\nc"),
            ("a\nb\nc", "a\nb\nc\nd"),
            ("a\nb\nc\nd", "a\nd"),
            ("", "hello"),
            ("one\ntwo", "two\none"),
            ("same", "same"),
        ];
        for (before, after) in cases {
            let operations = build_operations(before, after, 0);
            assert_eq!(apply(before, &operations), after, "before={before:?}");
        }
    }

    #[test]
    fn test_identical_snapshots_yield_no_operations() {
        assert!(build_operations("a\nb", "a\nb", 0).is_empty());
    }

    #[test]
    fn test_deletions_precede_additions_within_hunk() {
        let operations = build_operations("old line", "new line", 0);
        assert_eq!(operations.len(), 2);
        assert_eq!(operations[0].kind, EditKind::Deletion);
        assert_eq!(operations[0].content, "old line");
        assert_eq!(operations[1].kind, EditKind::Addition);
        assert_eq!(operations[1].content, "new line");
    }

    #[test]
    fn test_operations_carry_unit() {
        let operations = build_operations("a", "b", 7);
        assert!(operations.iter().all(|op| op.unit == 7));
    }

    #[test]
    fn test_search_replace_shifts_to_document_lines() {
        let doc = TextDocument::new("fn main() {\n    let x = 1;\n    print(x);\n}");
        let operations = operations_for_search_replace(
            &doc,
            "    let x = 1;",
            "    let x = 2;",
            0,
            &AnchorConfig::default(),
        )
        .unwrap();
        assert_eq!(operations.len(), 2);
        assert_eq!(operations[0].kind, EditKind::Deletion);
        assert_eq!(operations[0].line, 1);
        assert_eq!(operations[1].kind, EditKind::Addition);
        assert_eq!(operations[1].line, 1);
        assert_eq!(operations[1].content, "    let x = 2;");
    }

    #[test]
    fn test_search_replace_missing_anchor_is_none() {
        let doc = TextDocument::new("nothing to see");
        let result = operations_for_search_replace(
            &doc,
            "fn absent() {",
            "fn absent() { body(); }",
            0,
            &AnchorConfig::default(),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_search_replace_diffs_against_document_window() {
        // Misquoted indentation: the trimmed anchor matches, and the diff
        // runs against the document's own text, so the untouched line stays
        // untouched.
        let doc = TextDocument::new("    keep();\n    change();");
        let operations = operations_for_search_replace(
            &doc,
            "keep();\nchange();",
            "    keep();\n    changed();",
            0,
            &AnchorConfig::default(),
        )
        .unwrap();
        assert_eq!(operations.len(), 2);
        assert!(operations.iter().all(|op| op.line == 1));
    }

    #[test]
    fn test_pure_insertion_after_anchor() {
        let doc = TextDocument::new("start();\nend();");
        let operations = operations_for_search_replace(
            &doc,
            "start();",
            "start();\nmiddle();",
            0,
            &AnchorConfig::default(),
        )
        .unwrap();
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].kind, EditKind::Addition);
        assert_eq!(operations[0].line, 1);
        assert_eq!(operations[0].content, "middle();");
    }
}
