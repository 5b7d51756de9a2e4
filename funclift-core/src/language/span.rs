//! Source spans: byte offsets paired with 1-based line/column ranges

use crate::range::{Position, SourceRange};
use serde::{Deserialize, Serialize};

/// Contiguous region of source code
///
/// `start`/`end` are byte offsets (end exclusive); `range` is the same region
/// as an inclusive 1-based line/column range, columns counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Byte offset of the start of the span (inclusive)
    pub start: usize,
    /// Byte offset of the end of the span (exclusive)
    pub end: usize,
    /// Line/column range of the span (inclusive at both ends)
    pub range: SourceRange,
}

impl SourceSpan {
    /// Get the length of the span in bytes
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Check if this span contains another span
    pub fn contains(&self, other: &SourceSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Line start table used to turn byte offsets into positions
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        LineIndex { line_starts }
    }

    /// 1-based position of the character starting at `offset`
    pub fn position(&self, source: &str, offset: usize) -> Position {
        let offset = offset.min(source.len());
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line.saturating_sub(1)];
        let column = source
            .get(line_start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(offset - line_start);
        Position::new(line as u32, column as u32 + 1)
    }

    /// Byte offset of the first character of a 1-based line
    pub fn line_start(&self, line: u32) -> Option<usize> {
        let index = (line as usize).checked_sub(1)?;
        self.line_starts.get(index).copied()
    }

    /// Build a span for the byte region `start..end`
    ///
    /// The inclusive end position is the position of the last character in the
    /// region. Empty regions collapse to a caret at `start`.
    pub fn span(&self, source: &str, start: usize, end: usize) -> SourceSpan {
        let begin = self.position(source, start);
        let last_char = source
            .get(start..end)
            .and_then(|text| text.char_indices().next_back())
            .map(|(i, _)| start + i);
        let end_position = match last_char {
            Some(offset) => self.position(source, offset),
            None => begin,
        };
        SourceSpan {
            start,
            end,
            range: SourceRange::spanning(begin, end_position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_first_line() {
        let source = "int a = 1;\nint b = 2;\n";
        let index = LineIndex::new(source);
        assert_eq!(index.position(source, 0), Position::new(1, 1));
        assert_eq!(index.position(source, 4), Position::new(1, 5));
    }

    #[test]
    fn test_position_later_line() {
        let source = "int a = 1;\nint b = 2;\n";
        let index = LineIndex::new(source);
        assert_eq!(index.position(source, 11), Position::new(2, 1));
        assert_eq!(index.position(source, 15), Position::new(2, 5));
    }

    #[test]
    fn test_columns_count_characters() {
        let source = "String s = \"héllo\"; int x;";
        let index = LineIndex::new(source);
        let offset = source.find("int").unwrap();
        // "é" is two bytes but one column
        assert_eq!(index.position(source, offset), Position::new(1, 21));
    }

    #[test]
    fn test_span_end_is_inclusive() {
        let source = "    int a = 1;\n";
        let index = LineIndex::new(source);
        let span = index.span(source, 4, 14);
        assert_eq!(span.range.begin(), Position::new(1, 5));
        assert_eq!(span.range.end(), Position::new(1, 14));
        assert_eq!(span.len(), 10);
    }

    #[test]
    fn test_span_across_lines() {
        let source = "foo(\n  a,\n  b)";
        let index = LineIndex::new(source);
        let span = index.span(source, 0, source.len());
        assert_eq!(span.range.begin(), Position::new(1, 1));
        assert_eq!(span.range.end(), Position::new(3, 4));
    }

    #[test]
    fn test_empty_span_is_caret() {
        let source = "x";
        let index = LineIndex::new(source);
        let span = index.span(source, 0, 0);
        assert!(span.is_empty());
        assert_eq!(span.range.begin(), span.range.end());
    }

    #[test]
    fn test_contains() {
        let source = "abcdefghij";
        let index = LineIndex::new(source);
        let outer = index.span(source, 1, 9);
        let inner = index.span(source, 2, 5);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.contains(&outer));
    }

    #[test]
    fn test_line_start() {
        let source = "a\nbc\nd";
        let index = LineIndex::new(source);
        assert_eq!(index.line_start(1), Some(0));
        assert_eq!(index.line_start(2), Some(2));
        assert_eq!(index.line_start(3), Some(5));
        assert_eq!(index.line_start(4), None);
        assert_eq!(index.line_start(0), None);
    }
}
