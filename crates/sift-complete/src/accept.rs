//! Turning an accepted suggestion into document edits.

use sift_core::{Document, DocumentEdit, Point, Range};
use sift_provider::Suggestion;

/// The trailing part of `insertion` that already follows the cursor.
///
/// Drops leading characters of `insertion` until `following` starts with the
/// remainder and the remainder does not start with a non-word character.
pub fn consumed_suffix<'a>(insertion: &'a str, following: &str, non_word_characters: &str) -> &'a str {
    let mut suffix = insertion;
    while let Some(first) = suffix.chars().next() {
        if following.starts_with(suffix) && !non_word_characters.contains(first) {
            break;
        }
        suffix = &suffix[first.len_utf8()..];
    }
    suffix
}

/// Options for [`replacement_edits`].
#[derive(Debug, Clone, Copy)]
pub struct AcceptOptions<'a> {
    pub consume_suffix: bool,
    pub non_word_characters: &'a str,
}

/// One edit per cursor whose preceding text equals the suggestion's
/// replacement prefix. Other cursors are left alone.
///
/// The edits never overlap: a consumed suffix stops where the next cursor's
/// replacement starts, and a cursor whose prefix reaches back over an earlier
/// cursor (or repeats it) is skipped.
pub fn replacement_edits(
    document: &dyn Document,
    suggestion: &Suggestion,
    options: AcceptOptions<'_>,
) -> Vec<DocumentEdit> {
    let prefix = suggestion.replacement_prefix.as_deref().unwrap_or_default();
    let prefix_len = prefix.chars().count() as u32;
    let inserted = suggestion
        .text
        .as_deref()
        .or(suggestion.snippet.as_deref())
        .unwrap_or_default();
    let suffix_source = suggestion.insertion_text().unwrap_or_default();
    let suffix_source_len = suffix_source.chars().count() as u32;

    let mut edits = Vec::new();
    let mut cursors = document.cursors();
    cursors.sort();
    for cursor in cursors {
        let Some(start_column) = cursor.column.checked_sub(prefix_len) else {
            continue;
        };
        let start = Point::new(cursor.row, start_column);
        if document.text_in_range(Range::new(start, cursor)) != prefix {
            continue;
        }

        let suffix_len = if options.consume_suffix {
            let following = document.text_in_range(Range::new(
                cursor,
                Point::new(cursor.row, cursor.column.saturating_add(suffix_source_len)),
            ));
            consumed_suffix(suffix_source, &following, options.non_word_characters)
                .chars()
                .count() as u32
        } else {
            0
        };

        let end = Point::new(cursor.row, cursor.column + suffix_len);
        edits.push((cursor, DocumentEdit::new(Range::new(start, end), inserted)));
    }
    disjoint(edits)
}

/// Drop or shorten `(cursor, edit)` pairs, sorted by cursor, until no two
/// edits overlap or insert at the same point.
fn disjoint(edits: Vec<(Point, DocumentEdit)>) -> Vec<DocumentEdit> {
    let mut kept: Vec<(Point, DocumentEdit)> = Vec::with_capacity(edits.len());
    for (cursor, edit) in edits {
        if let Some((previous_cursor, previous)) = kept.last_mut() {
            if edit.range.start < *previous_cursor || cursor == *previous_cursor {
                continue;
            }
            if previous.range.end > edit.range.start {
                previous.range.end = edit.range.start;
            }
        }
        kept.push((cursor, edit));
    }
    kept.into_iter().map(|(_, edit)| edit).collect()
}
