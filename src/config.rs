//! Engine configuration.
//!
//! All tunables live in one serde-friendly value passed into the session at
//! construction, instead of being threaded through call sites as loose
//! booleans. Loading from disk or the host's settings store is the caller's
//! job; this crate only defines the shape and the defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level configuration for one completion session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub matcher: MatcherConfig,
    pub compose: ComposeConfig,
    pub anchor: AnchorConfig,
}

impl EngineConfig {
    /// Parse a configuration value from JSON; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid engine configuration")
    }
}

/// Cache-matcher tunables. Heuristic classes can be toggled individually;
/// the exact classes (exact, partial typing, backward deletion) always run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub enable_multiline_partial: bool,
    pub enable_fuzzy_prefix: bool,
    pub enable_context_similarity: bool,
    /// How many trailing prefix characters to compare for fuzzy matching.
    pub fuzzy_window: usize,
    /// Maximum accepted edit distance inside the fuzzy window.
    pub max_fuzzy_distance: usize,
    /// How many lines of context feed the trigram similarity check.
    pub context_lines: usize,
    /// Minimum combined prefix/suffix similarity to accept a context match.
    pub min_context_similarity: f64,
    /// Retained fill-in suggestions; oldest evicted first.
    pub history_capacity: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            enable_multiline_partial: true,
            enable_fuzzy_prefix: true,
            enable_context_similarity: true,
            fuzzy_window: 50,
            max_fuzzy_distance: 3,
            context_lines: 3,
            min_context_similarity: 0.55,
            history_capacity: 16,
        }
    }
}

/// Inline-composition tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Groups farther than this many lines from the cursor are not shown
    /// inline; they defer to decoration-based display in the host.
    pub proximity_lines: usize,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self { proximity_lines: 5 }
    }
}

/// Anchor-resolution tunables for locating `search` payloads in the live
/// document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// Minimum normalized similarity for a fuzzy anchor match; below this
    /// the change unit is dropped rather than guessed at.
    pub min_similarity: f64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.9,
        }
    }
}
