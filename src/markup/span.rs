//! Span - offset and length into an event buffer
//!
//! Every markup event carries the buffer it was read from plus spans into
//! it, so downstream handlers can re-emit the exact source bytes.

/// A span referencing a portion of an event buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    /// Byte offset into the buffer
    pub offset: u32,
    /// Length in bytes
    pub len: u32,
}

impl Span {
    /// Create a new span
    #[inline]
    pub const fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// Create a span covering `start..end` of a buffer
    #[inline]
    pub fn from_range(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self::new(start as u32, (end - start) as u32)
    }

    /// Create an empty span at `offset` (used for "no value")
    #[inline]
    pub const fn empty_at(offset: u32) -> Self {
        Self { offset, len: 0 }
    }

    /// Check if this span is empty
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the start offset
    #[inline]
    pub const fn start(&self) -> usize {
        self.offset as usize
    }

    /// Get the end offset (exclusive)
    #[inline]
    pub const fn end(&self) -> usize {
        self.offset as usize + self.len as usize
    }

    /// Extract the byte slice from the buffer
    #[inline]
    pub fn slice<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        buffer.get(self.start()..self.end()).unwrap_or(&[])
    }

    /// Extract as UTF-8 string from the buffer
    #[inline]
    pub fn as_str<'a>(&self, buffer: &'a [u8]) -> Option<&'a str> {
        std::str::from_utf8(self.slice(buffer)).ok()
    }

    /// Translate a span from a region starting at `from` to a copy of that
    /// region starting at `to`.
    #[inline]
    pub(crate) fn rebase(&self, from: usize, to: usize) -> Self {
        Self::new((self.start() - from + to) as u32, self.len)
    }
}

/// 1-based line and column of an event in the source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

impl Position {
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_slice() {
        let input = b"<div class=\"a\">";
        let span = Span::from_range(1, 4);
        assert_eq!(span.slice(input), b"div");
        assert_eq!(span.as_str(input), Some("div"));
        assert_eq!(span.end(), 4);
    }

    #[test]
    fn test_out_of_range_slice_is_empty() {
        let span = Span::new(10, 5);
        assert_eq!(span.slice(b"short"), b"");
    }

    #[test]
    fn test_rebase() {
        let span = Span::from_range(12, 15);
        let moved = span.rebase(10, 0);
        assert_eq!(moved, Span::new(2, 3));
    }
}
