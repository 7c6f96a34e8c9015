//! Line/column positions for byte offsets.
//!
//! The lexer records spans as byte ranges; diagnostics are reported as
//! 1-based `line:column` pairs. [`Locator`] does the conversion by scanning
//! the source buffer for `\n` terminators. Only `\n` ends a line: a `\r`
//! before it counts as the last column of the line.
//!
//! The scan is O(offset) per query, which is fine at diagnostic volumes.
//! [`LineIndex`] caches line starts for callers that map many positions in
//! the same file.

use std::fmt;

use memchr::{memchr_iter, memrchr};
use serde::{Deserialize, Serialize};

use crate::span::SourceCodeSpan;

/// A position in a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    /// 1-based line number
    pub line: usize,
    /// 1-based column, in bytes
    pub column: usize,
    /// 0-based byte offset from the start of the buffer
    pub offset: usize,
}

impl SourcePosition {
    pub const fn new(line: usize, column: usize, offset: usize) -> Self {
        SourcePosition {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A begin/end pair of positions. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub begin: SourcePosition,
    pub end: SourcePosition,
}

impl SourceRange {
    pub const fn new(begin: SourcePosition, end: SourcePosition) -> Self {
        SourceRange { begin, end }
    }
}

/// Cached line starts for O(log n) position queries.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Offset of the first byte of each line (`line_starts[0]` is always 0)
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Build a line index from source bytes.
    pub fn build(source: &[u8]) -> Self {
        let mut line_starts = Vec::with_capacity(source.len() / 32 + 1);
        line_starts.push(0);
        line_starts.extend(memchr_iter(b'\n', source).map(|newline| newline + 1));
        LineIndex { line_starts }
    }

    /// Number of lines, counting a trailing empty line after a final `\n`.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Offset of the first byte of a 1-based line.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        line.checked_sub(1)
            .and_then(|index| self.line_starts.get(index).copied())
    }

    /// Position of `offset`. The caller guarantees `offset` lies within the
    /// buffer the index was built from.
    pub fn position(&self, offset: usize) -> SourcePosition {
        // line_starts[0] == 0 <= offset, so the partition point is at least 1.
        let line_index = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line_index];
        SourcePosition {
            line: line_index + 1,
            column: offset - line_start + 1,
            offset,
        }
    }
}

/// Maps byte offsets and spans within one source buffer to positions.
#[derive(Debug, Clone)]
pub struct Locator<'a> {
    input: &'a [u8],
    line_index: Option<LineIndex>,
}

impl<'a> Locator<'a> {
    /// Locator that scans `input` on every query.
    pub fn new(input: &'a [u8]) -> Self {
        Locator {
            input,
            line_index: None,
        }
    }

    /// Locator that builds a [`LineIndex`] up front.
    pub fn with_line_index(input: &'a [u8]) -> Self {
        Locator {
            input,
            line_index: Some(LineIndex::build(input)),
        }
    }

    /// The buffer this locator maps.
    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    /// Position of the byte at `offset`.
    ///
    /// `offset == input.len()` is allowed and names the end of the buffer.
    /// Panics if `offset` is past the end.
    pub fn position(&self, offset: usize) -> SourcePosition {
        assert!(
            offset <= self.input.len(),
            "offset {offset} is outside the located source buffer ({} bytes)",
            self.input.len()
        );
        if let Some(index) = &self.line_index {
            return index.position(offset);
        }

        let before = &self.input[..offset];
        let line_terminators = memchr_iter(b'\n', before).count();
        let column = match memrchr(b'\n', before) {
            Some(last_terminator) => offset - last_terminator,
            None => offset + 1,
        };
        SourcePosition {
            line: 1 + line_terminators,
            column,
            offset,
        }
    }

    /// Position of the first byte of `bytes`, which must be a subslice of the
    /// located buffer.
    pub fn position_of(&self, bytes: &[u8]) -> SourcePosition {
        self.position(self.offset_of(bytes.as_ptr()))
    }

    /// Positions of both ends of `span`.
    pub fn range(&self, span: SourceCodeSpan<'_>) -> SourceRange {
        SourceRange {
            begin: self.position(self.offset_of(span.begin_ptr())),
            end: self.position(self.offset_of(span.end_ptr())),
        }
    }

    fn offset_of(&self, ptr: *const u8) -> usize {
        let base = self.input.as_ptr() as usize;
        let address = ptr as usize;
        assert!(
            address >= base && address - base <= self.input.len(),
            "pointer does not point into the located source buffer"
        );
        address - base
    }
}

#[cfg(test)]
mod position_tests {
    use super::*;

    #[test]
    fn test_line_index_simple() {
        let source = b"line1\nline2\nline3";
        let index = LineIndex::build(source);

        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_start(1), Some(0));
        assert_eq!(index.line_start(2), Some(6));
        assert_eq!(index.line_start(3), Some(12));
        assert_eq!(index.line_start(0), None);
        assert_eq!(index.line_start(4), None);

        assert_eq!(index.position(0), SourcePosition::new(1, 1, 0));
        assert_eq!(index.position(4), SourcePosition::new(1, 5, 4));
        // The terminator belongs to the line it ends.
        assert_eq!(index.position(5), SourcePosition::new(1, 6, 5));
        assert_eq!(index.position(6), SourcePosition::new(2, 1, 6));
        assert_eq!(index.position(17), SourcePosition::new(3, 6, 17));
    }

    #[test]
    fn test_carriage_return_is_not_a_terminator() {
        let source = b"ab\r\ncd";
        let locator = Locator::new(source);
        assert_eq!(locator.position(2), SourcePosition::new(1, 3, 2));
        assert_eq!(locator.position(4), SourcePosition::new(2, 1, 4));
    }

    #[test]
    fn test_display_is_line_colon_column() {
        assert_eq!(SourcePosition::new(3, 7, 20).to_string(), "3:7");
    }

    #[test]
    #[should_panic(expected = "outside the located source buffer")]
    fn test_offset_past_end_panics() {
        let locator = Locator::new(b"abc");
        let _ = locator.position(4);
    }
}
