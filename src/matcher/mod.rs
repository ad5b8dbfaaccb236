//! Suggestion cache and matcher.
//!
//! Fill-in completions the model already produced are kept in a small
//! history; when the user keeps typing we try to serve the next request
//! from that history instead of going back to the model. Matching runs in
//! two phases: exact classes first (exact, partial typing, backward
//! deletion), which short-circuit on the newest hit, then fuzzy heuristics
//! (multiline partial, fuzzy prefix, context similarity), which compete on
//! confidence.

mod similarity;

pub use similarity::{levenshtein, levenshtein_similarity, trigram_similarity};

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MatcherConfig;

/// A completion the model produced at some earlier cursor context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillInSuggestion {
    /// Text that was suggested for insertion at the cursor.
    pub text: String,
    /// Document text before the cursor at the time of the suggestion.
    pub prefix: String,
    /// Document text after the cursor at the time of the suggestion.
    pub suffix: String,
    pub created_at: DateTime<Utc>,
}

impl FillInSuggestion {
    pub fn new(
        text: impl Into<String>,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            prefix: prefix.into(),
            suffix: suffix.into(),
            created_at: Utc::now(),
        }
    }
}

/// How a cached suggestion matched the current cursor context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Prefix and suffix are byte-identical to the cached context.
    Exact,
    /// The user typed further into the cached suggestion's text.
    PartialTyping,
    /// The user deleted characters backwards from the cached context.
    BackwardDeletion,
    /// The user typed whole leading lines of a multiline suggestion.
    MultilinePartial,
    /// Prefix tails are within a small edit distance.
    FuzzyPrefix,
    /// Surrounding context is structurally similar by trigram overlap.
    ContextSimilarity,
}

/// A matched cached suggestion, adjusted to the current cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Text to insert at the current cursor.
    pub text: String,
    pub kind: MatchKind,
    pub confidence: f64,
}

/// Bounded, newest-first suggestion history.
#[derive(Debug, Clone, Default)]
pub struct SuggestionHistory {
    entries: VecDeque<FillInSuggestion>,
    capacity: usize,
}

impl SuggestionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a suggestion. An exact repeat of the most recent entry is
    /// dropped; once full, the oldest entry is evicted.
    pub fn record(&mut self, suggestion: FillInSuggestion) {
        if let Some(last) = self.entries.back() {
            if last.text == suggestion.text
                && last.prefix == suggestion.prefix
                && last.suffix == suggestion.suffix
            {
                return;
            }
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(suggestion);
    }

    /// Iterate newest first.
    pub fn iter_recent(&self) -> impl Iterator<Item = &FillInSuggestion> {
        self.entries.iter().rev()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Try to serve the current cursor context from the history.
///
/// Exact classes return immediately on the newest matching entry. If none
/// hits, all fuzzy heuristics are scored across the whole history and the
/// highest-confidence result wins.
pub fn match_cached(
    history: &SuggestionHistory,
    prefix: &str,
    suffix: &str,
    config: &MatcherConfig,
) -> Option<MatchResult> {
    let mut best_fuzzy: Option<MatchResult> = None;

    for cached in history.iter_recent() {
        if let Some(result) = match_exact_classes(cached, prefix, suffix) {
            debug!(kind = ?result.kind, confidence = result.confidence, "cache hit");
            return Some(result);
        }

        for result in match_fuzzy_classes(cached, prefix, suffix, config) {
            let better = best_fuzzy
                .as_ref()
                .map(|b| result.confidence > b.confidence)
                .unwrap_or(true);
            if better {
                best_fuzzy = Some(result);
            }
        }
    }

    if let Some(result) = &best_fuzzy {
        debug!(kind = ?result.kind, confidence = result.confidence, "fuzzy cache hit");
    }
    best_fuzzy
}

fn match_exact_classes(
    cached: &FillInSuggestion,
    prefix: &str,
    suffix: &str,
) -> Option<MatchResult> {
    // Exact: identical context, serve the suggestion unchanged.
    if cached.prefix == prefix && cached.suffix == suffix {
        return Some(MatchResult {
            text: cached.text.clone(),
            kind: MatchKind::Exact,
            confidence: 1.0,
        });
    }

    // Partial typing: the user typed the beginning of the suggested text.
    if suffix == cached.suffix && prefix.len() > cached.prefix.len() {
        if let Some(typed) = prefix.strip_prefix(cached.prefix.as_str()) {
            if let Some(remainder) = cached.text.strip_prefix(typed) {
                if !remainder.is_empty() {
                    return Some(MatchResult {
                        text: remainder.to_string(),
                        kind: MatchKind::PartialTyping,
                        confidence: 0.95,
                    });
                }
            }
        }
    }

    // Backward deletion: the user backspaced; re-offer the deleted span
    // plus the original suggestion.
    if suffix == cached.suffix && prefix.len() < cached.prefix.len() {
        if let Some(deleted) = cached.prefix.strip_prefix(prefix) {
            return Some(MatchResult {
                text: format!("{deleted}{}", cached.text),
                kind: MatchKind::BackwardDeletion,
                confidence: 0.9,
            });
        }
    }

    None
}

fn match_fuzzy_classes(
    cached: &FillInSuggestion,
    prefix: &str,
    suffix: &str,
    config: &MatcherConfig,
) -> Vec<MatchResult> {
    let mut results = Vec::new();
    if config.enable_multiline_partial {
        if let Some(result) = match_multiline_partial(cached, prefix, suffix) {
            results.push(result);
        }
    }
    if config.enable_fuzzy_prefix {
        if let Some(result) = match_fuzzy_prefix(cached, prefix, suffix, config) {
            results.push(result);
        }
    }
    if config.enable_context_similarity {
        if let Some(result) = match_context_similarity(cached, prefix, suffix, config) {
            results.push(result);
        }
    }
    results
}

/// The user typed whole leading lines of a multiline suggestion; offer what
/// remains. Typed lines are compared leniently (trimmed).
fn match_multiline_partial(
    cached: &FillInSuggestion,
    prefix: &str,
    suffix: &str,
) -> Option<MatchResult> {
    if suffix != cached.suffix || !cached.text.contains('\n') {
        return None;
    }
    let typed = prefix.strip_prefix(cached.prefix.as_str())?;
    if typed.is_empty() || !typed.contains('\n') {
        return None;
    }

    let suggestion_lines: Vec<&str> = cached.text.split('\n').collect();
    let typed_lines: Vec<&str> = typed.split('\n').collect();
    if typed_lines.len() > suggestion_lines.len() {
        return None;
    }

    // All fully typed lines must match their suggested counterparts.
    let complete_lines = typed_lines.len() - 1;
    for i in 0..complete_lines {
        if typed_lines[i].trim() != suggestion_lines[i].trim() {
            return None;
        }
    }

    let last_typed = typed_lines[complete_lines];
    let expected = suggestion_lines[complete_lines];
    let at_line_boundary = last_typed.is_empty();
    let remainder = if at_line_boundary {
        suggestion_lines[complete_lines..].join("\n")
    } else {
        let tail = expected.strip_prefix(last_typed)?;
        let mut rest = vec![tail];
        rest.extend(&suggestion_lines[complete_lines + 1..]);
        rest.join("\n")
    };
    if remainder.is_empty() {
        return None;
    }

    Some(MatchResult {
        text: remainder,
        kind: MatchKind::MultilinePartial,
        confidence: if at_line_boundary { 0.9 } else { 0.85 },
    })
}

/// Prefix tails within a small edit distance of each other, typically from
/// a typo or trivial edit just before the cursor.
fn match_fuzzy_prefix(
    cached: &FillInSuggestion,
    prefix: &str,
    suffix: &str,
    config: &MatcherConfig,
) -> Option<MatchResult> {
    if suffix != cached.suffix {
        return None;
    }
    let current_tail = char_tail(prefix, config.fuzzy_window);
    let cached_tail = char_tail(&cached.prefix, config.fuzzy_window);
    let distance = levenshtein(current_tail, cached_tail);
    if distance == 0 || distance > config.max_fuzzy_distance {
        return None;
    }
    let longest = current_tail
        .chars()
        .count()
        .max(cached_tail.chars().count());
    if longest == 0 {
        return None;
    }
    Some(MatchResult {
        text: cached.text.clone(),
        kind: MatchKind::FuzzyPrefix,
        confidence: 1.0 - distance as f64 / longest as f64,
    })
}

/// Structural context resemblance via trigram overlap over the nearest
/// lines, weighted toward the prefix side.
fn match_context_similarity(
    cached: &FillInSuggestion,
    prefix: &str,
    suffix: &str,
    config: &MatcherConfig,
) -> Option<MatchResult> {
    let prefix_sim = trigram_similarity(
        last_lines(prefix, config.context_lines),
        last_lines(&cached.prefix, config.context_lines),
    );
    let suffix_sim = trigram_similarity(
        first_lines(suffix, config.context_lines),
        first_lines(&cached.suffix, config.context_lines),
    );
    let combined = 0.6 * prefix_sim + 0.4 * suffix_sim;
    if combined < config.min_context_similarity {
        return None;
    }
    Some(MatchResult {
        text: cached.text.clone(),
        kind: MatchKind::ContextSimilarity,
        confidence: combined,
    })
}

fn char_tail(s: &str, chars: usize) -> &str {
    match s.char_indices().rev().nth(chars.saturating_sub(1)) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

fn last_lines(s: &str, count: usize) -> &str {
    let mut newlines_seen = 0;
    for (idx, byte) in s.bytes().enumerate().rev() {
        if byte == b'\n' {
            newlines_seen += 1;
            if newlines_seen == count {
                return &s[idx + 1..];
            }
        }
    }
    s
}

fn first_lines(s: &str, count: usize) -> &str {
    let mut newlines_seen = 0;
    for (idx, byte) in s.bytes().enumerate() {
        if byte == b'\n' {
            newlines_seen += 1;
            if newlines_seen == count {
                return &s[..idx];
            }
        }
    }
    s
}
