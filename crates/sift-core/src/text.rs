//! Text model primitives: sizes, ranges, points, and conversions.

use serde::{Deserialize, Serialize};

pub use text_size::{TextRange, TextSize};

/// A buffer position expressed as (row, column).
///
/// Columns count Unicode scalar values, not bytes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    #[inline]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { row: 0, column: 0 }
    }
}

/// A range between two [`Point`]s. `start` is expected to be `<= end`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Point,
    pub end: Point,
}

impl Range {
    #[inline]
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    #[inline]
    pub const fn empty(point: Point) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Inclusive on both ends.
    #[inline]
    pub fn contains_point(&self, point: Point) -> bool {
        self.start <= point && point <= self.end
    }
}

/// Line spans of one text snapshot. `\n`, `\r\n` and a lone `\r` all end a
/// line; spans exclude the terminator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LineIndex {
    lines: Vec<TextRange>,
    text_len: TextSize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut line_start = 0usize;
        let mut bytes = text.bytes().enumerate().peekable();
        while let Some((at, byte)) = bytes.next() {
            let next_start = match byte {
                b'\n' => at + 1,
                b'\r' if bytes.peek().is_some_and(|&(_, next)| next == b'\n') => {
                    bytes.next();
                    at + 2
                }
                b'\r' => at + 1,
                _ => continue,
            };
            lines.push(span(line_start, at));
            line_start = next_start;
        }
        lines.push(span(line_start, text.len()));

        Self {
            lines,
            text_len: TextSize::of(text),
        }
    }

    #[inline]
    pub fn text_len(&self) -> TextSize {
        self.text_len
    }

    #[inline]
    pub fn line_count(&self) -> u32 {
        self.lines.len() as u32
    }

    #[inline]
    pub fn line_start(&self, line: u32) -> Option<TextSize> {
        self.lines.get(line as usize).map(|span| span.start())
    }

    /// Offset of the end of `line`, excluding the line terminator.
    #[inline]
    pub fn line_end(&self, line: u32) -> Option<TextSize> {
        self.lines.get(line as usize).map(|span| span.end())
    }

    /// Text of `line` without its terminator.
    pub fn line_text<'a>(&self, text: &'a str, line: u32) -> Option<&'a str> {
        text.get(std::ops::Range::<usize>::from(*self.lines.get(line as usize)?))
    }

    /// Row containing `offset`; offsets inside a terminator belong to the
    /// line it ends, offsets past the end to the last line.
    fn row_of(&self, offset: TextSize) -> usize {
        self.lines
            .partition_point(|span| span.start() <= offset)
            .saturating_sub(1)
    }

    /// Convert a byte offset to a [`Point`].
    ///
    /// `text` must be the snapshot this index was built from.
    pub fn point(&self, text: &str, offset: TextSize) -> Point {
        debug_assert_eq!(TextSize::of(text), self.text_len);
        let row = self.row_of(offset.min(self.text_len));
        let span = self.lines[row];
        let end = offset.clamp(span.start(), span.end());
        let column = text
            .get(usize::from(span.start())..usize::from(end))
            .map_or(0, |before| before.chars().count());
        Point::new(row as u32, column as u32)
    }

    /// Convert a [`Point`] into a byte offset; `None` when the row does not
    /// exist or the column is past the end of the line.
    pub fn offset(&self, text: &str, point: Point) -> Option<TextSize> {
        let span = *self.lines.get(point.row as usize)?;
        let line = text.get(std::ops::Range::<usize>::from(span))?;
        let column = point.column as usize;
        if column == 0 {
            return Some(span.start());
        }
        let within = match line.char_indices().nth(column) {
            Some((byte, _)) => byte,
            None if line.chars().count() == column => line.len(),
            None => return None,
        };
        Some(span.start() + TextSize::from(within as u32))
    }

    /// Clamp `point` to the nearest valid position in the snapshot.
    pub fn clip_point(&self, text: &str, point: Point) -> Point {
        if point.row as usize >= self.lines.len() {
            return self.point(text, self.text_len);
        }
        let width = self
            .line_text(text, point.row)
            .map_or(0, |line| line.chars().count() as u32);
        Point::new(point.row, point.column.min(width))
    }

    /// Convert a [`Range`] into a byte range.
    pub fn text_range(&self, text: &str, range: Range) -> Option<TextRange> {
        let start = self.offset(text, range.start)?;
        let end = self.offset(text, range.end)?;
        (start <= end).then(|| TextRange::new(start, end))
    }

    /// Convert a byte range to a [`Range`].
    pub fn range(&self, text: &str, range: TextRange) -> Range {
        Range::new(self.point(text, range.start()), self.point(text, range.end()))
    }
}

fn span(start: usize, end: usize) -> TextRange {
    TextRange::new(TextSize::from(start as u32), TextSize::from(end as u32))
}
