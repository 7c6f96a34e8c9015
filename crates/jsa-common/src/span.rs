//! Source spans.
//!
//! A [`SourceCodeSpan`] is a window into the immutable source buffer that the
//! lexer produced it from. It borrows the bytes rather than storing offsets,
//! so a span can be rendered without the buffer at hand and mapped back to
//! line/column positions with a [`Locator`](crate::Locator) built over the
//! same buffer.

use std::fmt;

/// A byte range borrowed from a source buffer.
#[derive(Clone, Copy, Debug)]
pub struct SourceCodeSpan<'a> {
    bytes: &'a [u8],
}

impl<'a> SourceCodeSpan<'a> {
    /// Wrap a subslice of a source buffer.
    #[inline]
    pub const fn new(bytes: &'a [u8]) -> Self {
        SourceCodeSpan { bytes }
    }

    /// Span covering `source[begin..end]`.
    ///
    /// Panics if the range is out of bounds or reversed.
    pub fn from_offsets(source: &'a [u8], begin: usize, end: usize) -> Self {
        assert!(
            begin <= end && end <= source.len(),
            "span {begin}..{end} out of bounds for source of {} bytes",
            source.len()
        );
        SourceCodeSpan {
            bytes: &source[begin..end],
        }
    }

    #[inline]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Address of the first byte of the span.
    #[inline]
    pub fn begin_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    /// Address one past the last byte of the span.
    #[inline]
    pub fn end_ptr(&self) -> *const u8 {
        self.bytes.as_ptr_range().end
    }
}

impl PartialEq<str> for SourceCodeSpan<'_> {
    fn eq(&self, other: &str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialEq<&str> for SourceCodeSpan<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl fmt::Display for SourceCodeSpan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_compares_against_text() {
        let source = b"let x = 42;";
        let span = SourceCodeSpan::from_offsets(source, 4, 5);
        assert!(span == "x");
        assert!(span != "y");
        assert_eq!(span.len(), 1);
    }

    #[test]
    fn test_span_pointers_cover_the_range() {
        let source = b"hello world";
        let span = SourceCodeSpan::from_offsets(source, 6, 11);
        assert_eq!(span.begin_ptr(), source[6..].as_ptr());
        assert_eq!(span.end_ptr() as usize - span.begin_ptr() as usize, 5);
        assert_eq!(span.to_string(), "world");
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_span_rejects_out_of_bounds_range() {
        let _ = SourceCodeSpan::from_offsets(b"abc", 2, 4);
    }
}
