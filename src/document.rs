//! Minimal document access used by the diff builder and composer.
//!
//! The host editor owns the real buffer; the engine only needs read access
//! to text, line boundaries and position/offset conversion. `TextDocument`
//! is a plain string-backed implementation used by hosts without a richer
//! buffer and by tests.

use serde::{Deserialize, Serialize};

/// A 0-based line/character position. `character` counts chars, not bytes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// An empty range at `position`.
    pub fn at(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Read-only view of an open document.
pub trait Document {
    /// Full document text.
    fn text(&self) -> &str;

    /// Number of lines. An empty document has one (empty) line.
    fn line_count(&self) -> usize;

    /// Content of a line without its trailing newline.
    fn line_text(&self, line: usize) -> Option<&str>;

    /// Byte offset of a position, clamped to the document end. Positions
    /// past the end of a line resolve to the end of that line.
    fn offset_at(&self, position: Position) -> usize;

    /// Range spanning a line's content (newline excluded).
    fn line_range(&self, line: usize) -> Option<Range> {
        let text = self.line_text(line)?;
        Some(Range::new(
            Position::new(line, 0),
            Position::new(line, text.chars().count()),
        ))
    }

    /// Position at the end of a line's content.
    fn line_end(&self, line: usize) -> Option<Position> {
        self.line_range(line).map(|range| range.end)
    }
}

/// String-backed [`Document`] with precomputed line starts.
#[derive(Debug, Clone)]
pub struct TextDocument {
    content: String,
    line_starts: Vec<usize>,
}

impl TextDocument {
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let mut line_starts = vec![0];
        for (i, byte) in content.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            content,
            line_starts,
        }
    }

    fn line_bounds(&self, line: usize) -> Option<(usize, usize)> {
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.content.len());
        Some((start, end))
    }
}

impl Document for TextDocument {
    fn text(&self) -> &str {
        &self.content
    }

    fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    fn line_text(&self, line: usize) -> Option<&str> {
        let (start, end) = self.line_bounds(line)?;
        Some(self.content[start..end].trim_end_matches('\r'))
    }

    fn offset_at(&self, position: Position) -> usize {
        let line = position.line.min(self.line_starts.len() - 1);
        let (start, end) = self.line_bounds(line).unwrap_or((0, 0));
        let line_text = &self.content[start..end];
        line_text
            .char_indices()
            .nth(position.character)
            .map(|(byte_idx, _)| start + byte_idx)
            .unwrap_or(end)
    }
}
