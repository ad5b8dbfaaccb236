//! Inline completion composition.
//!
//! Given the selected edit group and the live cursor, decide whether the
//! group can be shown as ghost text at all, merge it with adjacent groups
//! when that yields one coherent insertion, and compute the exact text and
//! range the editor should render.

use serde::{Deserialize, Serialize};

use crate::config::ComposeConfig;
use crate::document::{Document, Position, Range};
use crate::edit::{EditGroup, GroupKind};
use crate::parse::take_cursor_marker;
use crate::store::SuggestionFile;

/// A composed completion, ready for direct insertion by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineCompletion {
    pub text: String,
    pub range: Range,
    /// Byte offset within `text` where the caret should land after
    /// insertion, when the model marked one; otherwise the host keeps its
    /// default of caret-after-text.
    pub caret_offset: Option<usize>,
}

/// Compose the selected group into an inline completion, or `None` when the
/// group is ineligible, too far from the cursor, or nothing is selected.
pub fn compose_completion(
    document: &dyn Document,
    file: &SuggestionFile,
    cursor: Position,
    config: &ComposeConfig,
) -> Option<InlineCompletion> {
    let groups = file.groups_operations();
    let index = file.selected_index()?;
    let group = groups.get(index)?;

    let (deleted, added) = merge_adjacent(groups, index, group)?;
    let text = eligible_text(&deleted, &added)?;
    let (text, caret) = take_cursor_marker(&text);
    if text.is_empty() {
        return None;
    }

    // Operations are anchored per unit against the live document, so group
    // lines are already live coordinates. Earlier groups are only pending
    // ghost text and shift nothing until accepted.
    let target = group.start_line();

    let distance = target.abs_diff(cursor.line);
    if distance > config.proximity_lines {
        return None;
    }

    let last_line = document.line_count().saturating_sub(1);
    if target == cursor.line {
        let end = document.line_end(cursor.line)?;
        Some(InlineCompletion {
            text,
            range: Range::at(end),
            caret_offset: caret,
        })
    } else if target <= last_line {
        let mut text = text;
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Some(InlineCompletion {
            text,
            range: Range::at(Position::new(target, 0)),
            caret_offset: caret,
        })
    } else {
        let end = document.line_end(last_line)?;
        let mut text = text;
        if !text.starts_with('\n') {
            text.insert(0, '\n');
        }
        Some(InlineCompletion {
            text,
            range: Range::at(end),
            caret_offset: caret.map(|offset| offset + 1),
        })
    }
}

/// Resolve the selected group into effective (deleted, added) text.
///
/// A deletion-only group is merged with an immediately following, adjacent
/// addition group when the pair reads as one rewrite; further adjacent pure
/// additions are appended so a multi-line suggestion shows as one unit. A
/// deletion-only group with no such follower is never shown inline.
fn merge_adjacent(
    groups: &[EditGroup],
    index: usize,
    group: &EditGroup,
) -> Option<(String, String)> {
    let deleted = group.deleted_text();
    let mut added = group.added_text();
    let mut last_line = group_end_line(group);
    let mut next = index + 1;

    if group.kind() == GroupKind::Deletion {
        let follower = groups.get(next)?;
        if follower.kind() != GroupKind::Addition || follower.start_line() > last_line + 1 {
            return None;
        }
        let follower_added = follower.added_text();
        if !merges_with(&deleted, &follower_added) {
            return None;
        }
        added = follower_added;
        last_line = group_end_line(follower);
        next += 1;

        while let Some(trailing) = groups.get(next) {
            if trailing.kind() != GroupKind::Addition || trailing.start_line() > last_line + 1 {
                break;
            }
            added.push('\n');
            added.push_str(&trailing.added_text());
            last_line = group_end_line(trailing);
            next += 1;
        }
    }

    Some((deleted, added))
}

/// Whether a deleted/added pair reads as one rewrite. Prefix match is
/// checked before the newline-start rule; both may apply.
fn merges_with(deleted: &str, added: &str) -> bool {
    added.starts_with(deleted) || is_placeholder(deleted) || added.starts_with('\n')
}

/// Insertion text for an effective group, or `None` when ineligible.
fn eligible_text(deleted: &str, added: &str) -> Option<String> {
    if added.is_empty() {
        // Deletion-only: surfaced through decorations, never as ghost text.
        return None;
    }
    if deleted.is_empty() {
        return Some(added.to_string());
    }
    if let Some(suffix) = added.strip_prefix(deleted) {
        if suffix.is_empty() {
            return None;
        }
        return Some(suffix.to_string());
    }
    if is_placeholder(deleted) {
        return Some(added.to_string());
    }
    if added.starts_with('\n') {
        return Some(added.to_string());
    }
    None
}

/// Text the model is expected to overwrite wholesale: blank lines or the
/// usual elision stubs.
fn is_placeholder(deleted: &str) -> bool {
    let trimmed = deleted.trim();
    trimmed.is_empty() || matches!(trimmed, "..." | "// ..." | "/* ... */")
}

fn group_end_line(group: &EditGroup) -> usize {
    group
        .operations
        .iter()
        .map(|op| op.line)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextDocument;
    use crate::edit::EditOperation;

    fn file_with(operations: Vec<EditOperation>) -> SuggestionFile {
        let mut file = SuggestionFile::new("doc");
        for op in operations {
            file.add_operation(op);
        }
        file.sort_groups();
        file
    }

    fn config() -> ComposeConfig {
        ComposeConfig::default()
    }

    #[test]
    fn test_addition_on_cursor_line_inserts_at_line_end() {
        let doc = TextDocument::new("let x = \nnext();");
        let file = file_with(vec![EditOperation::addition(0, "compute();", 0)]);
        let completion =
            compose_completion(&doc, &file, Position::new(0, 8), &config()).unwrap();
        assert_eq!(completion.text, "compute();");
        assert_eq!(completion.range, Range::at(Position::new(0, 8)));
    }

    #[test]
    fn test_rewrite_without_common_prefix_is_ineligible() {
        let doc = TextDocument::new("var x = 10");
        let file = file_with(vec![
            EditOperation::deletion(0, "var x = 10", 0),
            EditOperation::addition(0, "const x = 10", 0),
        ]);
        assert!(compose_completion(&doc, &file, Position::new(0, 10), &config()).is_none());
    }

    #[test]
    fn test_prefix_rewrite_composes_suffix_only() {
        let doc = TextDocument::new("const y = ");
        let file = file_with(vec![
            EditOperation::deletion(0, "const y = ", 0),
            EditOperation::addition(0, "const y = foo();", 0),
        ]);
        let completion =
            compose_completion(&doc, &file, Position::new(0, 10), &config()).unwrap();
        assert_eq!(completion.text, "foo();");
        assert_eq!(completion.range, Range::at(Position::new(0, 10)));
    }

    #[test]
    fn test_deletion_only_group_is_never_inline() {
        let doc = TextDocument::new("doomed line\nsurvivor");
        let file = file_with(vec![EditOperation::deletion(0, "doomed line", 0)]);
        assert!(compose_completion(&doc, &file, Position::new(0, 0), &config()).is_none());
    }

    #[test]
    fn test_placeholder_deletion_shows_full_addition() {
        let doc = TextDocument::new("fn run() {\n    // ...\n}");
        let file = file_with(vec![
            EditOperation::deletion(1, "    // ...", 0),
            EditOperation::addition(1, "    do_work();", 0),
        ]);
        let completion =
            compose_completion(&doc, &file, Position::new(1, 0), &config()).unwrap();
        assert_eq!(completion.text, "    do_work();");
    }

    #[test]
    fn test_newline_start_means_append_lines() {
        let doc = TextDocument::new("existing();");
        let file = file_with(vec![
            EditOperation::deletion(0, "existing();", 0),
            EditOperation::addition(0, "existing();", 0),
            EditOperation::addition(1, "added();", 0),
        ]);
        // added_text is "existing();\nadded();"; the deleted line is a
        // literal prefix, so only the appended tail is shown.
        let completion =
            compose_completion(&doc, &file, Position::new(0, 11), &config()).unwrap();
        assert_eq!(completion.text, "\nadded();");
    }

    #[test]
    fn test_group_beyond_proximity_is_suppressed() {
        let doc = TextDocument::new("line\n".repeat(20));
        let file = file_with(vec![EditOperation::addition(15, "far()", 0)]);
        assert!(compose_completion(&doc, &file, Position::new(0, 0), &config()).is_none());
    }

    #[test]
    fn test_other_line_target_gets_trailing_newline() {
        let doc = TextDocument::new("a\nb\nc");
        let file = file_with(vec![EditOperation::addition(2, "inserted", 0)]);
        let completion =
            compose_completion(&doc, &file, Position::new(0, 1), &config()).unwrap();
        assert_eq!(completion.text, "inserted\n");
        assert_eq!(completion.range, Range::at(Position::new(2, 0)));
    }

    #[test]
    fn test_past_eof_target_prefixes_newline() {
        let doc = TextDocument::new("only");
        let file = file_with(vec![EditOperation::addition(3, "appended", 0)]);
        let completion =
            compose_completion(&doc, &file, Position::new(0, 4), &config()).unwrap();
        assert_eq!(completion.text, "\nappended");
        assert_eq!(completion.range, Range::at(Position::new(0, 4)));
    }

    #[test]
    fn test_cursor_marker_stripped_and_caret_reported() {
        let doc = TextDocument::new("let v = ");
        let file = file_with(vec![EditOperation::addition(0, "read(<|cursor|>)", 0)]);
        let completion =
            compose_completion(&doc, &file, Position::new(0, 8), &config()).unwrap();
        assert_eq!(completion.text, "read()");
        assert_eq!(completion.caret_offset, Some(5));
    }

    #[test]
    fn test_caret_shifts_with_prefixed_newline() {
        let doc = TextDocument::new("only");
        let file = file_with(vec![EditOperation::addition(2, "go(<|cursor|>)", 0)]);
        let completion =
            compose_completion(&doc, &file, Position::new(0, 4), &config()).unwrap();
        assert_eq!(completion.text, "\ngo()");
        assert_eq!(completion.caret_offset, Some(4));
    }

    #[test]
    fn test_second_group_composes_at_its_own_line() {
        // A group after another pending group still targets its live line;
        // earlier ghost text shifts nothing until accepted.
        let doc = TextDocument::new("one();\ntwo();\nthree();\nfour();\nfive();\nsix();\nseven();");
        let mut file = SuggestionFile::new("doc");
        file.add_operation(EditOperation::addition(2, "two_b();", 0));
        file.add_operation(EditOperation::addition(6, "six_b();", 1));
        file.sort_groups();
        assert_eq!(file.groups_operations().len(), 2);
        file.select_next_group();

        let completion =
            compose_completion(&doc, &file, Position::new(5, 6), &config()).unwrap();
        assert_eq!(completion.text, "six_b();\n");
        assert_eq!(completion.range, Range::at(Position::new(6, 0)));
    }

    #[test]
    fn test_deletion_merges_with_following_addition_group() {
        let doc = TextDocument::new("alpha\nimport old;\nbeta");
        // Distinct units so the store keeps them as separate groups.
        let mut file = SuggestionFile::new("doc");
        file.add_operation(EditOperation::deletion(1, "import old;", 0));
        file.add_operation(EditOperation::addition(2, "import old;", 1));
        file.add_operation(EditOperation::addition(3, "import new;", 1));
        file.sort_groups();
        assert_eq!(file.groups_operations().len(), 2);
        assert_eq!(file.group_kind(0), Some(GroupKind::Deletion));

        let completion =
            compose_completion(&doc, &file, Position::new(1, 0), &config()).unwrap();
        assert_eq!(completion.text, "\nimport new;");
        assert_eq!(completion.range, Range::at(Position::new(1, 11)));
    }
}
