//! Core shared types for sift.
//!
//! Text positions, edits, scope chains and the document interface consumed by
//! the completion engine. The in-memory [`TextBuffer`] implements
//! [`Document`] for embedders that do not bring their own text model.

mod buffer;
mod document;
mod edit;
mod scope;
mod text;

pub use buffer::TextBuffer;
pub use document::{Document, DocumentEdit, DocumentId, TextChange};
pub use edit::{apply_text_edits, normalize_text_edits, EditError, TextEdit};
pub use scope::ScopeChain;
pub use text::{LineIndex, Point, Range, TextRange, TextSize};
