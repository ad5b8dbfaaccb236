//! One completion session: one document, one in-flight model response.
//!
//! The session owns the parser, the suggestion store and the fill-in
//! history, and wires them together. Nothing here is shared or implicitly
//! global; the host constructs a session per request and drops it when the
//! response is consumed or cancelled (cancellation is simply "stop feeding
//! chunks and discard").

use tracing::debug;
use uuid::Uuid;

use crate::compose::{compose_completion, InlineCompletion};
use crate::config::EngineConfig;
use crate::diff::operations_for_search_replace;
use crate::document::{Document, Position, Range};
use crate::matcher::{match_cached, FillInSuggestion, MatchResult, SuggestionHistory};
use crate::parse::{strip_cursor_marker, ChangeUnit, ParseMode, ParseOutcome, StreamParser};
use crate::store::{SuggestionFile, SuggestionStore};

pub struct CompletionSession {
    id: Uuid,
    document_id: String,
    mode: ParseMode,
    config: EngineConfig,
    parser: StreamParser,
    store: SuggestionStore,
    history: SuggestionHistory,
    /// How many completed parser units have been resolved into operations.
    resolved_units: usize,
    /// Fill-in payload awaiting presentation, if any.
    pending_fill: Option<ChangeUnit>,
}

impl CompletionSession {
    pub fn new(document_id: &str, mode: ParseMode, config: EngineConfig) -> Self {
        let history = SuggestionHistory::new(config.matcher.history_capacity);
        Self {
            id: Uuid::new_v4(),
            document_id: document_id.to_string(),
            mode,
            config,
            parser: StreamParser::new(mode),
            store: SuggestionStore::new(),
            history,
            resolved_units: 0,
            pending_fill: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Feed the next response chunk and resolve any newly completed units
    /// against the document.
    pub fn parse_chunk(&mut self, document: &dyn Document, chunk: &str) -> ParseOutcome {
        let outcome = self.parser.parse_chunk(chunk);
        if outcome.has_new_content {
            self.resolve_new_units(document);
        }
        outcome
    }

    /// Signal end of the response stream. Idempotent.
    pub fn finish_stream(&mut self, document: &dyn Document) -> ParseOutcome {
        let outcome = self.parser.finish_stream();
        if outcome.has_new_content {
            self.resolve_new_units(document);
        }
        outcome
    }

    pub fn completed_changes(&self) -> &[ChangeUnit] {
        self.parser.completed_changes()
    }

    fn resolve_new_units(&mut self, document: &dyn Document) {
        let units = self.parser.completed_changes()[self.resolved_units..].to_vec();
        if units.is_empty() {
            return;
        }
        for (i, unit) in units.iter().enumerate() {
            let unit_index = (self.resolved_units + i) as u32;
            debug!(unit = unit_index, "change unit completed");
            match self.mode {
                ParseMode::SearchReplace => {
                    let search = strip_cursor_marker(&unit.search);
                    let replace = strip_cursor_marker(&unit.replace);
                    let resolved = operations_for_search_replace(
                        document,
                        &search,
                        &replace,
                        unit_index,
                        &self.config.anchor,
                    );
                    // Anchor-not-found drops this unit; others still apply.
                    if let Some(operations) = resolved {
                        let file = self.store.add_file(&self.document_id);
                        for op in operations {
                            file.add_operation(op);
                        }
                    }
                }
                ParseMode::FillIn => self.pending_fill = Some(unit.clone()),
            }
        }
        self.resolved_units += units.len();
        if let Some(file) = self.store.file_mut(&self.document_id) {
            file.sort_groups();
        }
    }

    /// Compose the completion to show at `cursor`, if any.
    ///
    /// In fill-in mode the pending payload is presented at the cursor and
    /// recorded into the history so later keystrokes can be served from
    /// cache. In search/replace mode the selected group is composed.
    pub fn provide_inline_completion(
        &mut self,
        document: &dyn Document,
        cursor: Position,
    ) -> Option<InlineCompletion> {
        match self.mode {
            ParseMode::FillIn => {
                let unit = self.pending_fill.as_ref()?;
                let text = strip_cursor_marker(&unit.replace);
                if text.is_empty() {
                    return None;
                }
                let offset = document.offset_at(cursor);
                let full = document.text();
                self.history.record(FillInSuggestion::new(
                    text.as_str(),
                    &full[..offset],
                    &full[offset..],
                ));
                Some(InlineCompletion {
                    text,
                    range: Range::at(cursor),
                    caret_offset: unit.cursor_offset,
                })
            }
            ParseMode::SearchReplace => {
                let file = self.store.file(&self.document_id)?;
                compose_completion(document, file, cursor, &self.config.compose)
            }
        }
    }

    /// Try to answer the current cursor context from the fill-in history.
    pub fn match_cached_suggestion(&self, prefix: &str, suffix: &str) -> Option<MatchResult> {
        match_cached(&self.history, prefix, suffix, &self.config.matcher)
    }

    pub fn record_suggestion(&mut self, suggestion: FillInSuggestion) {
        self.history.record(suggestion);
    }

    pub fn suggestion_file(&self) -> Option<&SuggestionFile> {
        self.store.file(&self.document_id)
    }

    pub fn select_next_group(&mut self) {
        if let Some(file) = self.store.file_mut(&self.document_id) {
            file.select_next_group();
        }
    }

    pub fn select_previous_group(&mut self) {
        if let Some(file) = self.store.file_mut(&self.document_id) {
            file.select_previous_group();
        }
    }
}
