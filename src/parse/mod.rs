//! Streaming parser for model completion responses.
//!
//! Chunks arrive in order and can be arbitrarily small. The parser appends
//! them to a buffer and drains complete change units as soon as they close.
//! Nothing partial is ever emitted mid-stream; truncated tags are only
//! repaired once, conservatively, when the stream-finished signal arrives.
//!
//! Two grammars share the machinery: `<change><search>..</search>
//! <replace>..</replace></change>` blocks for edit synthesis, and a single
//! `<completion>..</completion>` payload for fill-in-the-hole requests.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Marker the prompt embeds at the caret. Preserved verbatim inside payloads
/// so anchoring still sees the model's exact quoting; stripped only when
/// text is finally composed for insertion.
pub const CURSOR_MARKER: &str = "<|cursor|>";

const CHANGE_CLOSE: &str = "</change>";
const SEARCH_OPEN: &str = "<search>";
const SEARCH_CLOSE: &str = "</search>";
const REPLACE_OPEN: &str = "<replace>";
const REPLACE_CLOSE: &str = "</replace>";
const FILL_OPEN: &str = "<completion>";
const FILL_CLOSE: &str = "</completion>";

// Open tag may carry attributes (`<change path="...">`); they are ignored.
static CHANGE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<change(?:\s[^>]*)?>").unwrap());

/// Which response grammar the parser expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    SearchReplace,
    FillIn,
}

/// One fully parsed change unit.
///
/// In fill-in mode `search` is empty and `replace` holds the whole payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeUnit {
    pub search: String,
    pub replace: String,
    /// Byte offset of [`CURSOR_MARKER`] within `replace`, when present.
    pub cursor_offset: Option<usize>,
}

/// Result of feeding one chunk (or the finish signal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseOutcome {
    /// At least one new change unit completed during this call.
    pub has_new_content: bool,
    /// At least one unit has completed and nothing is left pending.
    pub is_complete: bool,
}

/// Incremental parser over one model response stream.
#[derive(Debug, Clone)]
pub struct StreamParser {
    mode: ParseMode,
    buffer: String,
    completed: Vec<ChangeUnit>,
    finished: bool,
}

impl StreamParser {
    pub fn new(mode: ParseMode) -> Self {
        Self {
            mode,
            buffer: String::new(),
            completed: Vec::new(),
            finished: false,
        }
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// All units completed so far, in arrival order.
    pub fn completed_changes(&self) -> &[ChangeUnit] {
        &self.completed
    }

    /// Feed the next chunk. Must not be called after [`finish_stream`];
    /// doing so is a caller bug and fails loudly.
    ///
    /// [`finish_stream`]: StreamParser::finish_stream
    pub fn parse_chunk(&mut self, chunk: &str) -> ParseOutcome {
        assert!(!self.finished, "parse_chunk called after finish_stream");
        self.buffer.push_str(chunk);
        let newly = self.drain_units();
        self.outcome(newly)
    }

    /// Signal end of stream. Attempts one conservative repair of a
    /// truncated closing tag, then drains whatever completes. Idempotent.
    pub fn finish_stream(&mut self) -> ParseOutcome {
        if self.finished {
            return self.outcome(0);
        }
        self.finished = true;
        self.sanitize();
        let newly = self.drain_units();
        if newly == 0 && self.has_pending() {
            debug!(buffered = self.buffer.len(), "unparseable content at end of stream");
        }
        self.outcome(newly)
    }

    fn outcome(&self, newly_completed: usize) -> ParseOutcome {
        ParseOutcome {
            has_new_content: newly_completed > 0,
            is_complete: !self.completed.is_empty() && !self.has_pending(),
        }
    }

    fn has_pending(&self) -> bool {
        match self.mode {
            ParseMode::SearchReplace => self.buffer.contains("<change"),
            ParseMode::FillIn => self.completed.is_empty() && self.buffer.contains("<completion"),
        }
    }

    fn drain_units(&mut self) -> usize {
        match self.mode {
            ParseMode::SearchReplace => self.drain_search_replace(),
            ParseMode::FillIn => self.drain_fill_in(),
        }
    }

    fn drain_search_replace(&mut self) -> usize {
        let mut newly = 0;
        loop {
            let Some(open) = CHANGE_OPEN.find(&self.buffer) else {
                break;
            };
            let body_start = open.end();
            let Some(close_rel) = self.buffer[body_start..].find(CHANGE_CLOSE) else {
                break;
            };
            let body = &self.buffer[body_start..body_start + close_rel];
            match parse_unit_body(body) {
                Some(unit) => {
                    self.completed.push(unit);
                    newly += 1;
                }
                None => warn!("discarding malformed change unit"),
            }
            // Consume the unit and any prose before it.
            self.buffer
                .drain(..body_start + close_rel + CHANGE_CLOSE.len());
        }
        newly
    }

    fn drain_fill_in(&mut self) -> usize {
        // Fill-in responses carry exactly one payload; later pairs are noise.
        if !self.completed.is_empty() {
            return 0;
        }
        let Some(open) = self.buffer.find(FILL_OPEN) else {
            return 0;
        };
        let body_start = open + FILL_OPEN.len();
        let Some(close_rel) = self.buffer[body_start..].find(FILL_CLOSE) else {
            return 0;
        };
        let payload = strip_cdata(&self.buffer[body_start..body_start + close_rel]);
        let unit = ChangeUnit {
            search: String::new(),
            cursor_offset: payload.find(CURSOR_MARKER),
            replace: payload.to_string(),
        };
        self.completed.push(unit);
        self.buffer
            .drain(..body_start + close_rel + FILL_CLOSE.len());
        1
    }

    /// One repair, only when a single pending unit is unambiguous:
    /// complete a truncated closing tag (`</change` without its `>`), or
    /// append the missing `</change>` after a dangling `</replace>`.
    /// A trailing lone `<` or multiple pending units are left untouched.
    fn sanitize(&mut self) {
        let (closing, prerequisites_met, pending_opens) = match self.mode {
            ParseMode::SearchReplace => (
                CHANGE_CLOSE,
                self.buffer.contains(SEARCH_CLOSE) && self.buffer.contains(REPLACE_CLOSE),
                self.buffer.matches("<change").count(),
            ),
            ParseMode::FillIn => (
                FILL_CLOSE,
                self.buffer.contains(FILL_OPEN),
                self.buffer.matches("<completion").count(),
            ),
        };
        if pending_opens != 1 {
            return;
        }

        if prerequisites_met {
            if let Some(partial) = partial_close_len(&self.buffer, closing) {
                let remainder = closing[partial..].to_string();
                debug!(%closing, "completing truncated closing tag");
                self.buffer.push_str(&remainder);
                return;
            }
        }

        if self.mode == ParseMode::SearchReplace
            && self.buffer.trim_end().ends_with(REPLACE_CLOSE)
        {
            debug!("appending missing </change> after dangling </replace>");
            self.buffer.push_str(CHANGE_CLOSE);
        }
    }
}

fn parse_unit_body(body: &str) -> Option<ChangeUnit> {
    let search = strip_cdata(tag_body(body, SEARCH_OPEN, SEARCH_CLOSE)?);
    let replace = strip_cdata(tag_body(body, REPLACE_OPEN, REPLACE_CLOSE)?);
    Some(ChangeUnit {
        search: search.to_string(),
        cursor_offset: replace.find(CURSOR_MARKER),
        replace: replace.to_string(),
    })
}

fn tag_body<'a>(s: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = s.find(open)? + open.len();
    let end = start + s[start..].find(close)?;
    Some(&s[start..end])
}

/// Trim outer whitespace, then unwrap a `<![CDATA[..]]>` envelope if the
/// whole payload is wrapped in one. Content inside CDATA is untouched.
fn strip_cdata(s: &str) -> &str {
    let trimmed = s.trim();
    trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
        .unwrap_or(trimmed)
}

/// Length of the longest buffer suffix that is a proper prefix of `closing`,
/// long enough to be unambiguous (at least `</c`).
fn partial_close_len(buffer: &str, closing: &str) -> Option<usize> {
    (3..closing.len())
        .rev()
        .find(|&len| buffer.ends_with(&closing[..len]))
}

/// Remove the cursor marker for text that is about to be shown or diffed.
pub fn strip_cursor_marker(text: &str) -> String {
    text.replace(CURSOR_MARKER, "")
}

/// Remove cursor markers and report where the first one sat, as a byte
/// offset into the cleaned text. Text after the marker shifts left by the
/// marker's length, so the offset is valid for the returned string.
pub fn take_cursor_marker(text: &str) -> (String, Option<usize>) {
    let offset = text.find(CURSOR_MARKER);
    (strip_cursor_marker(text), offset)
}
