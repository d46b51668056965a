//! Markup Writer
//!
//! Re-serializes events to an `io::Write`, byte-for-byte. Feeding every
//! event of a parse into one writer reproduces the input document.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use super::handler::{Attribute, MarkupHandler, XmlDeclaration};
use super::span::{Position, Span};
use crate::error::HandlerResult;

/// Handler that writes the source text of every event it receives
#[derive(Debug, Default)]
pub struct MarkupWriter<W: Write> {
    out: W,
}

impl<W: Write> MarkupWriter<W> {
    pub fn new(out: W) -> Self {
        MarkupWriter { out }
    }

    /// Get the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    #[inline]
    fn write_span(&mut self, buffer: &[u8], span: Span) -> HandlerResult {
        self.out.write_all(span.slice(buffer))?;
        Ok(())
    }
}

impl<W: Write> MarkupHandler for MarkupWriter<W> {
    fn document_start(&mut self) -> HandlerResult {
        Ok(())
    }

    fn document_end(&mut self) -> HandlerResult {
        self.out.flush()?;
        Ok(())
    }

    fn xml_declaration(
        &mut self,
        buffer: &[u8],
        declaration: &XmlDeclaration,
        _pos: Position,
    ) -> HandlerResult {
        self.write_span(buffer, declaration.outer)
    }

    fn doctype(&mut self, buffer: &[u8], outer: Span, _pos: Position) -> HandlerResult {
        self.write_span(buffer, outer)
    }

    fn cdata(&mut self, buffer: &[u8], _content: Span, outer: Span, _pos: Position) -> HandlerResult {
        self.write_span(buffer, outer)
    }

    fn comment(
        &mut self,
        buffer: &[u8],
        _content: Span,
        outer: Span,
        _pos: Position,
    ) -> HandlerResult {
        self.write_span(buffer, outer)
    }

    fn text(&mut self, buffer: &[u8], text: Span, _pos: Position) -> HandlerResult {
        self.write_span(buffer, text)
    }

    fn processing_instruction(
        &mut self,
        buffer: &[u8],
        _target: Span,
        _content: Option<Span>,
        outer: Span,
        _pos: Position,
    ) -> HandlerResult {
        self.write_span(buffer, outer)
    }

    fn standalone_element_start(
        &mut self,
        buffer: &[u8],
        name: Span,
        _minimized: bool,
        _pos: Position,
    ) -> HandlerResult {
        self.out.write_all(b"<")?;
        self.write_span(buffer, name)
    }

    fn standalone_element_end(
        &mut self,
        _buffer: &[u8],
        _name: Span,
        minimized: bool,
        _pos: Position,
    ) -> HandlerResult {
        self.out.write_all(if minimized { b"/>" } else { b">" })?;
        Ok(())
    }

    fn open_element_start(&mut self, buffer: &[u8], name: Span, _pos: Position) -> HandlerResult {
        self.out.write_all(b"<")?;
        self.write_span(buffer, name)
    }

    fn open_element_end(&mut self, _buffer: &[u8], _name: Span, _pos: Position) -> HandlerResult {
        self.out.write_all(b">")?;
        Ok(())
    }

    fn close_element_start(&mut self, buffer: &[u8], name: Span, _pos: Position) -> HandlerResult {
        self.out.write_all(b"</")?;
        self.write_span(buffer, name)
    }

    fn close_element_end(&mut self, _buffer: &[u8], _name: Span, _pos: Position) -> HandlerResult {
        self.out.write_all(b">")?;
        Ok(())
    }

    fn auto_close_element_start(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
        Ok(())
    }

    fn auto_close_element_end(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
        Ok(())
    }

    fn unmatched_close_element_start(
        &mut self,
        buffer: &[u8],
        name: Span,
        _pos: Position,
    ) -> HandlerResult {
        self.out.write_all(b"</")?;
        self.write_span(buffer, name)
    }

    fn unmatched_close_element_end(
        &mut self,
        _buffer: &[u8],
        _name: Span,
        _pos: Position,
    ) -> HandlerResult {
        self.out.write_all(b">")?;
        Ok(())
    }

    fn attribute(&mut self, buffer: &[u8], attribute: &Attribute) -> HandlerResult {
        self.write_span(buffer, attribute.name)?;
        self.write_span(buffer, attribute.operator)?;
        self.write_span(buffer, attribute.value_outer)
    }

    fn inner_white_space(&mut self, buffer: &[u8], span: Span, _pos: Position) -> HandlerResult {
        self.write_span(buffer, span)
    }
}

/// Growable byte buffer that several writers can append to in event order.
///
/// Cloning yields another handle to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the bytes written so far
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.borrow().clone()
    }

    /// Take the bytes written so far, leaving the buffer empty
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.bytes.borrow_mut())
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::markup_scanner::parse;
    use crate::markup::ParsingMode;
    use pretty_assertions::assert_eq;

    fn round_trip(input: &str, mode: ParsingMode) -> String {
        let mut writer = MarkupWriter::new(Vec::new());
        parse(input.as_bytes(), mode, &mut writer).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_round_trip_html() {
        let input = "<!DOCTYPE html>\n<html lang=en><body class = 'x'  >\
                     <br><img src=\"a.png\"/><p>Hello &amp; bye</p></body></html>";
        assert_eq!(round_trip(input, ParsingMode::Html), input);
    }

    #[test]
    fn test_round_trip_xml() {
        let input = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                     <?render fast?><root a='1' b=\"2\" c>\
                     <!-- note --><![CDATA[x < y]]><leaf/><x></x ></root>";
        assert_eq!(round_trip(input, ParsingMode::Xml), input);
    }

    #[test]
    fn test_round_trip_malformed() {
        let input = "<a><b>text</a></c> 1 < 2 <unterminated x=\"";
        assert_eq!(round_trip(input, ParsingMode::Html), input);
    }

    #[test]
    fn test_shared_buffer_interleaves_writers() {
        let shared = SharedBuffer::new();
        let mut first = MarkupWriter::new(shared.clone());
        let mut second = MarkupWriter::new(shared.clone());

        first.text(b"ab", Span::new(0, 1), Position::default()).unwrap();
        second.text(b"ab", Span::new(1, 1), Position::default()).unwrap();
        first.text(b"ab", Span::new(0, 2), Position::default()).unwrap();

        assert_eq!(shared.take(), b"abab".to_vec());
        assert!(shared.to_vec().is_empty());
    }
}
