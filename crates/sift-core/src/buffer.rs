//! In-memory [`Document`] implementation.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::edit::{apply_text_edits, normalize_text_edits, EditError, TextEdit};
use crate::{
    Document, DocumentEdit, DocumentId, LineIndex, Point, Range, ScopeChain, TextChange,
    TextRange, TextSize,
};

/// A text buffer with cursors and a static scope map.
///
/// Scope regions are stored as plain ranges and are not shifted by edits;
/// callers that edit inside scoped regions should re-declare them.
pub struct TextBuffer {
    id: DocumentId,
    path: Option<PathBuf>,
    state: RwLock<BufferState>,
}

struct BufferState {
    text: Arc<str>,
    index: LineIndex,
    version: u64,
    cursors: Vec<Point>,
    root_scope: Option<String>,
    scope_regions: Vec<(Range, String)>,
}

impl TextBuffer {
    pub fn new(id: DocumentId, text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self {
            id,
            path: None,
            state: RwLock::new(BufferState {
                index: LineIndex::new(&text),
                text: text.into(),
                version: 0,
                cursors: vec![Point::zero()],
                root_scope: None,
                scope_regions: Vec::new(),
            }),
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Grammar scope covering the whole buffer, e.g. `source.js`.
    pub fn with_root_scope(self, scope: impl Into<String>) -> Self {
        self.state.write().root_scope = Some(scope.into());
        self
    }

    /// Declare `scope` for every point in `range` (inclusive). Later regions nest
    /// inside earlier ones.
    pub fn add_scope_region(&self, range: Range, scope: impl Into<String>) {
        self.state.write().scope_regions.push((range, scope.into()));
    }

    pub fn set_text(&self, text: impl Into<String>) {
        let text: String = text.into();
        let mut state = self.state.write();
        state.index = LineIndex::new(&text);
        state.text = text.into();
        state.version += 1;
        let BufferState {
            text,
            index,
            cursors,
            ..
        } = &mut *state;
        for cursor in cursors.iter_mut() {
            *cursor = index.clip_point(text, *cursor);
        }
    }

    /// Replace all cursors; points are clipped to the buffer. An empty list
    /// leaves a single cursor at the origin.
    pub fn set_cursors(&self, cursors: impl IntoIterator<Item = Point>) {
        let mut state = self.state.write();
        let mut clipped: Vec<Point> = cursors
            .into_iter()
            .map(|point| state.index.clip_point(&state.text, point))
            .collect();
        if clipped.is_empty() {
            clipped.push(Point::zero());
        }
        state.cursors = clipped;
    }

    pub fn set_cursor(&self, cursor: Point) {
        self.set_cursors([cursor]);
    }

    /// Type `text` at every cursor.
    pub fn insert_at_cursors(&self, text: &str) -> Result<Vec<TextChange>, EditError> {
        let edits = self
            .cursors()
            .into_iter()
            .map(|cursor| DocumentEdit::new(Range::empty(cursor), text))
            .collect();
        self.transact(edits)
    }

    /// Delete the character before every cursor.
    pub fn backspace(&self) -> Result<Vec<TextChange>, EditError> {
        let edits = {
            let state = self.state.read();
            state
                .cursors
                .iter()
                .filter_map(|&cursor| {
                    let start = if cursor.column > 0 {
                        Point::new(cursor.row, cursor.column - 1)
                    } else if cursor.row > 0 {
                        state
                            .index
                            .clip_point(&state.text, Point::new(cursor.row - 1, u32::MAX))
                    } else {
                        return None;
                    };
                    Some(DocumentEdit::new(Range::new(start, cursor), ""))
                })
                .collect::<Vec<_>>()
        };
        self.transact(edits)
    }
}

impl Document for TextBuffer {
    fn id(&self) -> DocumentId {
        self.id
    }

    fn path(&self) -> Option<PathBuf> {
        self.path.clone()
    }

    fn version(&self) -> u64 {
        self.state.read().version
    }

    fn text(&self) -> Arc<str> {
        Arc::clone(&self.state.read().text)
    }

    fn line_count(&self) -> u32 {
        self.state.read().index.line_count()
    }

    fn text_in_range(&self, range: Range) -> String {
        let state = self.state.read();
        let start = state.index.clip_point(&state.text, range.start);
        let end = state.index.clip_point(&state.text, range.end);
        let (Some(start), Some(end)) = (
            state.index.offset(&state.text, start),
            state.index.offset(&state.text, end),
        ) else {
            return String::new();
        };
        if start >= end {
            return String::new();
        }
        state.text[TextRange::new(start, end)].to_owned()
    }

    fn cursors(&self) -> Vec<Point> {
        self.state.read().cursors.clone()
    }

    fn scope_chain_at(&self, point: Point) -> ScopeChain {
        let state = self.state.read();
        let nested = state
            .scope_regions
            .iter()
            .filter(|(range, _)| range.contains_point(point))
            .map(|(_, scope)| scope.clone());
        ScopeChain::new(state.root_scope.clone().into_iter().chain(nested))
    }

    fn transact(&self, edits: Vec<DocumentEdit>) -> Result<Vec<TextChange>, EditError> {
        let mut state = self.state.write();

        let mut byte_edits = Vec::with_capacity(edits.len());
        for edit in edits {
            let start = state
                .index
                .offset(&state.text, edit.range.start)
                .ok_or(EditError::InvalidPoint {
                    point: edit.range.start,
                })?;
            let end = state
                .index
                .offset(&state.text, edit.range.end)
                .filter(|end| *end >= start)
                .ok_or(EditError::InvalidPoint {
                    point: edit.range.end,
                })?;
            byte_edits.push(TextEdit::new(TextRange::new(start, end), edit.new_text));
        }
        normalize_text_edits(&state.text, &mut byte_edits)?;
        if byte_edits.is_empty() {
            return Ok(Vec::new());
        }

        let new_text = apply_text_edits(&state.text, &byte_edits)?;
        let new_index = LineIndex::new(&new_text);

        let mut changes = Vec::with_capacity(byte_edits.len());
        let mut shift: i64 = 0;
        for edit in &byte_edits {
            let new_start = (i64::from(u32::from(edit.range.start())) + shift) as u32;
            let new_end = new_start + edit.replacement.len() as u32;
            changes.push(TextChange {
                old_range: state.index.range(&state.text, edit.range),
                new_range: new_index.range(
                    &new_text,
                    TextRange::new(TextSize::from(new_start), TextSize::from(new_end)),
                ),
                old_text: state.text[edit.range].to_owned(),
                new_text: edit.replacement.clone(),
            });
            shift += edit.replacement.len() as i64 - i64::from(u32::from(edit.range.len()));
        }

        let cursors: Vec<Point> = state
            .cursors
            .iter()
            .map(|cursor| {
                let offset = state
                    .index
                    .offset(&state.text, *cursor)
                    .unwrap_or_else(|| state.index.text_len());
                let mapped = map_offset(u32::from(offset), &byte_edits);
                new_index.point(&new_text, TextSize::from(mapped))
            })
            .collect();

        state.text = new_text.into();
        state.index = new_index;
        state.cursors = cursors;
        state.version += 1;

        Ok(changes)
    }
}

/// Map an offset in the old text through sorted, non-overlapping edits.
/// Offsets at the end of an edit (including insertion points) move past the
/// replacement.
fn map_offset(offset: u32, edits: &[TextEdit]) -> u32 {
    let mut shift: i64 = 0;
    for edit in edits {
        let start = u32::from(edit.range.start());
        let end = u32::from(edit.range.end());
        let replacement_len = edit.replacement.len() as i64;
        if offset >= end {
            shift += replacement_len - i64::from(end - start);
            continue;
        }
        if offset > start {
            return (i64::from(start) + shift + replacement_len) as u32;
        }
        break;
    }
    (i64::from(offset) + shift) as u32
}
