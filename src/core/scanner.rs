//! SIMD-accelerated markup scanning using memchr
//!
//! Byte-level cursor used by the markup scanner, plus line/column tracking
//! for event positions.

use memchr::{memchr, memchr_iter, memmem};

/// Cursor over the input bytes
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given input
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    /// Get the current position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Set the current position
    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    /// Check if we've reached the end
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Peek at current byte without advancing
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Peek at byte at offset from current position
    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Byte at an absolute position
    #[inline]
    pub fn byte_at(&self, pos: usize) -> Option<u8> {
        self.input.get(pos).copied()
    }

    /// Advance by n bytes
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.set_position(self.pos + n);
    }

    /// Check if input starts with a byte sequence at current position
    #[inline]
    pub fn starts_with(&self, needle: &[u8]) -> bool {
        self.input[self.pos..].starts_with(needle)
    }

    /// Case-insensitive variant of `starts_with` for ASCII keywords
    #[inline]
    pub fn starts_with_ignore_case(&self, needle: &[u8]) -> bool {
        self.input
            .get(self.pos..self.pos + needle.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(needle))
    }

    /// Find next '<' (tag start) using SIMD
    #[inline]
    pub fn find_tag_start(&self) -> Option<usize> {
        memchr(b'<', &self.input[self.pos..]).map(|i| self.pos + i)
    }

    /// Find next '>' from `from`, ignoring quoting
    #[inline]
    pub fn find_tag_end_from(&self, from: usize) -> Option<usize> {
        memchr(b'>', self.input.get(from..)?).map(|i| from + i)
    }

    /// Find tag end while handling quotes properly
    /// Returns the position of '>' that is not inside quotes
    pub fn find_tag_end_quoted(&self, from: usize) -> Option<usize> {
        let mut pos = from;
        let mut in_single_quote = false;
        let mut in_double_quote = false;

        while pos < self.input.len() {
            match self.input[pos] {
                b'"' if !in_single_quote => in_double_quote = !in_double_quote,
                b'\'' if !in_double_quote => in_single_quote = !in_single_quote,
                b'>' if !in_single_quote && !in_double_quote => return Some(pos),
                _ => {}
            }
            pos += 1;
        }
        None
    }

    /// Find a multi-byte terminator (`-->`, `]]>`, `?>`) from `from`
    #[inline]
    pub fn find_sequence(&self, from: usize, needle: &[u8]) -> Option<usize> {
        memmem::find(self.input.get(from..)?, needle).map(|i| from + i)
    }

    /// Position after a run of XML name characters starting at `from`
    pub fn name_end(&self, from: usize) -> usize {
        let mut end = from;
        while end < self.input.len() && is_name_char(self.input[end]) {
            end += 1;
        }
        end
    }

    /// Position after a run of whitespace starting at `from`, bounded by `to`
    pub fn whitespace_end(&self, from: usize, to: usize) -> usize {
        let mut end = from;
        while end < to && is_whitespace(self.input[end]) {
            end += 1;
        }
        end
    }
}

/// Check if byte is valid XML name start character
/// Allows ASCII letters, underscore, colon, and non-ASCII (UTF-8 Unicode)
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

/// Check if byte is valid XML name character
/// Allows ASCII alphanumeric, punctuation, and non-ASCII (UTF-8 Unicode)
#[inline]
pub fn is_name_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'-' | b'.' | b':') || b >= 0x80
}

#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C')
}

/// Converts byte offsets into 1-based line/column positions.
///
/// Offsets must be requested in non-decreasing order; the tracker only ever
/// scans forward.
#[derive(Debug, Clone)]
pub struct LineTracker {
    line: u32,
    line_start: usize,
    scanned: usize,
}

impl LineTracker {
    pub fn new() -> Self {
        LineTracker {
            line: 1,
            line_start: 0,
            scanned: 0,
        }
    }

    /// Position of `offset` in `input`
    pub fn position(&mut self, input: &[u8], offset: usize) -> crate::markup::Position {
        let offset = offset.min(input.len());
        if offset > self.scanned {
            for newline in memchr_iter(b'\n', &input[self.scanned..offset]) {
                self.line += 1;
                self.line_start = self.scanned + newline + 1;
            }
            self.scanned = offset;
        }
        let col = offset.saturating_sub(self.line_start) + 1;
        crate::markup::Position::new(self.line, col as u32)
    }
}

impl Default for LineTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::Position;

    #[test]
    fn test_find_tag_start() {
        let scanner = Scanner::new(b"hello <world>");
        assert_eq!(scanner.find_tag_start(), Some(6));
    }

    #[test]
    fn test_find_tag_end_quoted() {
        let scanner = Scanner::new(b"<a attr=\">test\">content");
        assert_eq!(scanner.find_tag_end_quoted(0), Some(15));
    }

    #[test]
    fn test_find_sequence() {
        let scanner = Scanner::new(b"<!-- a - b -->rest");
        assert_eq!(scanner.find_sequence(4, b"-->"), Some(11));
        assert_eq!(scanner.find_sequence(12, b"-->"), None);
    }

    #[test]
    fn test_name_end() {
        let scanner = Scanner::new(b"element-name>");
        assert_eq!(scanner.name_end(0), 12);
    }

    #[test]
    fn test_case_insensitive_keyword() {
        let mut scanner = Scanner::new(b"<!doctype html>");
        scanner.advance(2);
        assert!(scanner.starts_with_ignore_case(b"DOCTYPE"));
    }

    #[test]
    fn test_line_tracker() {
        let input = b"ab\ncd\n\nef";
        let mut lines = LineTracker::new();
        assert_eq!(lines.position(input, 0), Position::new(1, 1));
        assert_eq!(lines.position(input, 1), Position::new(1, 2));
        assert_eq!(lines.position(input, 4), Position::new(2, 2));
        assert_eq!(lines.position(input, 8), Position::new(4, 2));
        // Repeated offsets are stable
        assert_eq!(lines.position(input, 8), Position::new(4, 2));
    }
}
