use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{EditError, Point, Range, ScopeChain};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u32);

impl DocumentId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// A replacement of `range` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEdit {
    pub range: Range,
    pub new_text: String,
}

impl DocumentEdit {
    pub fn new(range: Range, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }
}

/// A change notification: `old_range` held `old_text` and now `new_range` holds `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    pub old_range: Range,
    pub new_range: Range,
    pub old_text: String,
    pub new_text: String,
}

/// The read (and transactional edit) surface the completion engine needs from
/// a text document.
pub trait Document: Send + Sync {
    fn id(&self) -> DocumentId;

    /// Path on disk, if the document is backed by a file.
    fn path(&self) -> Option<PathBuf> {
        None
    }

    /// Monotonic version, bumped on every edit.
    fn version(&self) -> u64;

    /// Full-text snapshot.
    fn text(&self) -> Arc<str>;

    fn line_count(&self) -> u32;

    /// Text in `range`, with both ends clipped to the document.
    fn text_in_range(&self, range: Range) -> String;

    /// Cursor positions; the last one is the most recently added ("live") cursor.
    fn cursors(&self) -> Vec<Point>;

    fn last_cursor(&self) -> Option<Point> {
        self.cursors().last().copied()
    }

    fn scope_chain_at(&self, point: Point) -> ScopeChain;

    /// Apply all edits as one transaction; they are computed against the
    /// current snapshot and must not overlap.
    fn transact(&self, edits: Vec<DocumentEdit>) -> Result<Vec<TextChange>, EditError>;
}
