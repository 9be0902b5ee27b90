//! Byte-range edits and their application to text snapshots.

use thiserror::Error;

use crate::{Point, TextRange, TextSize};

/// Replace `range` (byte offsets) with `replacement`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TextEdit {
    pub range: TextRange,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(range: TextRange, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    pub fn insert(offset: TextSize, text: impl Into<String>) -> Self {
        Self::new(TextRange::empty(offset), text)
    }

    pub fn delete(range: TextRange) -> Self {
        Self::new(range, String::new())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum EditError {
    #[error("edit range {range:?} is out of bounds for text length {text_len:?}")]
    RangeOutOfBounds { range: TextRange, text_len: TextSize },
    #[error("offset {offset:?} is not a UTF-8 character boundary")]
    InvalidUtf8Boundary { offset: TextSize },
    #[error("overlapping edits: {first:?} overlaps {second:?}")]
    OverlappingEdits { first: TextRange, second: TextRange },
    #[error("point {}:{} is outside the document", point.row, point.column)]
    InvalidPoint { point: Point },
}

fn check_offset(text: &str, offset: TextSize) -> Result<(), EditError> {
    if text.is_char_boundary(usize::from(offset)) {
        Ok(())
    } else {
        Err(EditError::InvalidUtf8Boundary { offset })
    }
}

/// Two edits conflict when their ranges intersect, or when both insert at
/// the same offset (their relative order would be ambiguous).
fn conflicts(first: TextRange, second: TextRange) -> bool {
    first.end() > second.start()
        || (first.is_empty() && second.is_empty() && first.start() == second.start())
}

/// Sort `edits` by range and validate them against `text`.
///
/// Adjacent edits stay separate so each one can still be mapped back to the
/// cursor it was computed for.
pub fn normalize_text_edits(text: &str, edits: &mut [TextEdit]) -> Result<(), EditError> {
    edits.sort_by_key(|edit| (edit.range.start(), edit.range.end()));

    let text_len = TextSize::of(text);
    for edit in edits.iter() {
        if edit.range.end() > text_len {
            return Err(EditError::RangeOutOfBounds {
                range: edit.range,
                text_len,
            });
        }
        check_offset(text, edit.range.start())?;
        check_offset(text, edit.range.end())?;
    }

    match edits
        .windows(2)
        .find(|pair| conflicts(pair[0].range, pair[1].range))
    {
        Some(pair) => Err(EditError::OverlappingEdits {
            first: pair[0].range,
            second: pair[1].range,
        }),
        None => Ok(()),
    }
}

/// Apply `edits` to `text` as one batch. The result does not depend on the
/// order of `edits`.
pub fn apply_text_edits(text: &str, edits: &[TextEdit]) -> Result<String, EditError> {
    let mut edits = edits.to_vec();
    normalize_text_edits(text, &mut edits)?;

    let inserted: usize = edits.iter().map(|edit| edit.replacement.len()).sum();
    let mut out = String::with_capacity(text.len() + inserted);
    let mut copied = 0;
    for edit in &edits {
        let start = usize::from(edit.range.start());
        out.push_str(&text[copied..start]);
        out.push_str(&edit.replacement);
        copied = usize::from(edit.range.end());
    }
    out.push_str(&text[copied..]);
    Ok(out)
}
