//! Anchor resolution: find the line where a change unit's `search` payload
//! lives in the current document.
//!
//! Models quote surrounding code imperfectly, so matching runs as a quality
//! ladder: exact window equality, then whitespace-tolerant equality, then a
//! fuzzy scan scored by normalized Levenshtein similarity. Anything below
//! the configured minimum is treated as not found and the unit is dropped
//! upstream rather than applied to the wrong place.

use crate::config::AnchorConfig;
use crate::matcher::levenshtein_similarity;

/// Locate the first line of `search_lines` inside `document_lines`.
///
/// Returns the 0-based document line index of the window start, or `None`
/// when no window clears the similarity floor.
pub fn locate_anchor(
    document_lines: &[&str],
    search_lines: &[&str],
    config: &AnchorConfig,
) -> Option<usize> {
    if search_lines.is_empty() || search_lines.len() > document_lines.len() {
        return None;
    }

    let window_count = document_lines.len() - search_lines.len() + 1;

    // Rung 1: exact window.
    for start in 0..window_count {
        if document_lines[start..start + search_lines.len()] == *search_lines {
            return Some(start);
        }
    }

    // Rung 2: whitespace-tolerant window.
    for start in 0..window_count {
        let matches = search_lines
            .iter()
            .zip(&document_lines[start..])
            .all(|(search, doc)| search.trim() == doc.trim());
        if matches {
            return Some(start);
        }
    }

    // Rung 3: best fuzzy window above the floor.
    let needle = search_lines.join("\n");
    let mut best: Option<(usize, f64)> = None;
    for start in 0..window_count {
        let window = document_lines[start..start + search_lines.len()].join("\n");
        let similarity = levenshtein_similarity(&needle, &window);
        if similarity < config.min_similarity {
            continue;
        }
        let better = best.map(|(_, s)| similarity > s).unwrap_or(true);
        if better {
            best = Some((start, similarity));
        }
    }
    best.map(|(start, _)| start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AnchorConfig {
        AnchorConfig::default()
    }

    #[test]
    fn test_exact_window() {
        let doc = vec!["fn main() {", "    let x = 1;", "}"];
        let search = vec!["    let x = 1;"];
        assert_eq!(locate_anchor(&doc, &search, &config()), Some(1));
    }

    #[test]
    fn test_exact_window_preferred_over_trimmed() {
        let doc = vec!["  indented();", "indented();"];
        let search = vec!["indented();"];
        assert_eq!(locate_anchor(&doc, &search, &config()), Some(1));
    }

    #[test]
    fn test_trimmed_window_tolerates_indentation() {
        let doc = vec!["fn main() {", "        let x = 1;", "}"];
        let search = vec!["let x = 1;"];
        assert_eq!(locate_anchor(&doc, &search, &config()), Some(1));
    }

    #[test]
    fn test_fuzzy_window_above_floor() {
        let doc = vec!["let account_balance = fetch_balance();", "return;"];
        // One-char typo in a ~38-char line keeps similarity above 0.9.
        let search = vec!["let acount_balance = fetch_balance();"];
        assert_eq!(locate_anchor(&doc, &search, &config()), Some(0));
    }

    #[test]
    fn test_below_floor_is_not_found() {
        let doc = vec!["completely unrelated line"];
        let search = vec!["fn process(input: &str) -> String {"];
        assert_eq!(locate_anchor(&doc, &search, &config()), None);
    }

    #[test]
    fn test_multiline_window() {
        let doc = vec!["a", "b", "c", "d"];
        let search = vec!["b", "c"];
        assert_eq!(locate_anchor(&doc, &search, &config()), Some(1));
    }

    #[test]
    fn test_search_longer_than_document() {
        let doc = vec!["only line"];
        let search = vec!["one", "two"];
        assert_eq!(locate_anchor(&doc, &search, &config()), None);
    }

    #[test]
    fn test_empty_search_is_not_found() {
        let doc = vec!["x"];
        assert_eq!(locate_anchor(&doc, &[], &config()), None);
    }
}
