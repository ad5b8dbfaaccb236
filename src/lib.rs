//! Ghosttype: completion synthesis for editor assistants.
//!
//! Turns streamed model responses into precise inline edits: a streaming
//! parser extracts structured change units, a diff builder anchors them in
//! the live document as line-level operations, a suggestion store groups
//! and navigates them, and a composer produces the final ghost text and
//! insertion range. A small cache matcher answers repeat cursor contexts
//! without another model round trip.

pub mod compose;
pub mod config;
pub mod diff;
pub mod document;
pub mod edit;
pub mod matcher;
pub mod parse;
pub mod session;
pub mod store;

pub use compose::InlineCompletion;
pub use config::EngineConfig;
pub use document::{Document, Position, Range, TextDocument};
pub use edit::{EditGroup, EditKind, EditOperation, GroupKind, LineOffset};
pub use matcher::{FillInSuggestion, MatchKind, MatchResult};
pub use parse::{ChangeUnit, ParseMode, ParseOutcome, StreamParser};
pub use session::CompletionSession;
pub use store::{SuggestionFile, SuggestionStore};
