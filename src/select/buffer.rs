//! Element Buffer
//!
//! Holds one element's start event, attributes and inner whitespace until
//! the end of its start tag, when the selectors can be evaluated. The
//! buffered source bytes are copied, since event buffers are only valid for
//! the duration of a single callback.

use crate::markup::{Attribute, MarkupHandler, Position, Span};
use crate::error::HandlerResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartKind {
    Open,
    Standalone { minimized: bool },
}

#[derive(Debug, Clone, Copy)]
enum BufferedEntry {
    Attribute(Attribute),
    WhiteSpace(Span, Position),
}

/// Pending start tag of the element currently being opened
#[derive(Debug, Clone)]
pub struct ElementBuffer {
    bytes: Vec<u8>,
    name: Span,
    kind: StartKind,
    pos: Position,
    entries: Vec<BufferedEntry>,
}

impl ElementBuffer {
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(256),
            name: Span::default(),
            kind: StartKind::Open,
            pos: Position::default(),
            entries: Vec::with_capacity(8),
        }
    }

    fn start(&mut self, buffer: &[u8], name: Span, kind: StartKind, pos: Position) {
        self.bytes.clear();
        self.entries.clear();
        self.bytes.extend_from_slice(name.slice(buffer));
        self.name = Span::from_range(0, self.bytes.len());
        self.kind = kind;
        self.pos = pos;
    }

    /// Begin buffering an open element, discarding any previous content
    pub fn start_open(&mut self, buffer: &[u8], name: Span, pos: Position) {
        self.start(buffer, name, StartKind::Open, pos);
    }

    /// Begin buffering a standalone element, discarding any previous content
    pub fn start_standalone(&mut self, buffer: &[u8], name: Span, minimized: bool, pos: Position) {
        self.start(buffer, name, StartKind::Standalone { minimized }, pos);
    }

    pub fn push_attribute(&mut self, buffer: &[u8], attribute: &Attribute) {
        let (from, to) = attribute.outer_range();
        let base = self.bytes.len();
        self.bytes.extend_from_slice(buffer.get(from..to).unwrap_or(&[]));
        self.entries.push(BufferedEntry::Attribute(Attribute {
            name: attribute.name.rebase(from, base),
            operator: attribute.operator.rebase(from, base),
            value_content: attribute.value_content.rebase(from, base),
            value_outer: attribute.value_outer.rebase(from, base),
            ..*attribute
        }));
    }

    pub fn push_white_space(&mut self, buffer: &[u8], span: Span, pos: Position) {
        let base = self.bytes.len();
        self.bytes.extend_from_slice(span.slice(buffer));
        self.entries.push(BufferedEntry::WhiteSpace(
            Span::from_range(base, self.bytes.len()),
            pos,
        ));
    }

    /// Element name as written in the source
    #[inline]
    pub fn name(&self) -> &[u8] {
        self.name.slice(&self.bytes)
    }

    pub fn attribute_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, BufferedEntry::Attribute(_)))
            .count()
    }

    /// `(name, value)` of every attribute in source order; valueless
    /// attributes have an empty value
    pub fn attributes(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries.iter().filter_map(|entry| match entry {
            BufferedEntry::Attribute(attr) => Some((
                attr.name.slice(&self.bytes),
                attr.value_content.slice(&self.bytes),
            )),
            BufferedEntry::WhiteSpace(..) => None,
        })
    }

    /// Replay the start event and everything buffered after it
    pub fn flush<H: MarkupHandler + ?Sized>(&self, handler: &mut H) -> HandlerResult {
        match self.kind {
            StartKind::Open => handler.open_element_start(&self.bytes, self.name, self.pos)?,
            StartKind::Standalone { minimized } => {
                handler.standalone_element_start(&self.bytes, self.name, minimized, self.pos)?
            }
        }
        for entry in &self.entries {
            match entry {
                BufferedEntry::Attribute(attr) => handler.attribute(&self.bytes, attr)?,
                BufferedEntry::WhiteSpace(span, pos) => {
                    handler.inner_white_space(&self.bytes, *span, *pos)?
                }
            }
        }
        Ok(())
    }
}

impl Default for ElementBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::MarkupWriter;
    use pretty_assertions::assert_eq;

    fn buffered(input: &[u8]) -> ElementBuffer {
        // <a href = "x"  b>
        let mut buffer = ElementBuffer::new();
        buffer.start_open(input, Span::from_range(1, 2), Position::new(1, 1));
        buffer.push_white_space(input, Span::from_range(2, 3), Position::new(1, 3));
        buffer.push_attribute(
            input,
            &Attribute {
                name: Span::from_range(3, 7),
                operator: Span::from_range(7, 10),
                value_content: Span::from_range(11, 12),
                value_outer: Span::from_range(10, 13),
                ..Attribute::default()
            },
        );
        buffer.push_white_space(input, Span::from_range(13, 15), Position::new(1, 14));
        buffer.push_attribute(
            input,
            &Attribute {
                name: Span::from_range(15, 16),
                operator: Span::empty_at(16),
                value_content: Span::empty_at(16),
                value_outer: Span::empty_at(16),
                ..Attribute::default()
            },
        );
        buffer
    }

    #[test]
    fn test_view() {
        let buffer = buffered(b"<a href = \"x\"  b>");
        assert_eq!(buffer.name(), b"a");
        assert_eq!(buffer.attribute_count(), 2);
        let attrs: Vec<_> = buffer.attributes().collect();
        assert_eq!(attrs, vec![(&b"href"[..], &b"x"[..]), (&b"b"[..], &b""[..])]);
    }

    #[test]
    fn test_flush_replays_source_text() {
        let input = b"<a href = \"x\"  b>";
        let buffer = buffered(input);
        let mut writer = MarkupWriter::new(Vec::new());
        buffer.flush(&mut writer).unwrap();
        assert_eq!(writer.into_inner(), b"<a href = \"x\"  b".to_vec());
    }

    #[test]
    fn test_restart_discards_previous_element() {
        let mut buffer = buffered(b"<a href = \"x\"  b>");
        buffer.start_standalone(b"<br/>", Span::from_range(1, 3), true, Position::default());
        assert_eq!(buffer.name(), b"br");
        assert_eq!(buffer.attribute_count(), 0);

        let mut writer = MarkupWriter::new(Vec::new());
        buffer.flush(&mut writer).unwrap();
        assert_eq!(writer.into_inner(), b"<br".to_vec());
    }
}
