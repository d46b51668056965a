//! Markup Handler Trait
//!
//! The event interface shared by the scanner, the selection dispatcher and
//! every downstream consumer. Each event carries the buffer it was read from
//! and spans into it; buffers are only valid for the duration of the call.

use super::span::{Position, Span};
use crate::error::HandlerResult;
use crate::select::ParseSelection;

/// Whether markup is interpreted as HTML or XML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParsingMode {
    /// Case-insensitive names, `#id`/`.class` shorthands, void elements
    #[default]
    Html,
    /// Case-sensitive names
    Xml,
}

impl ParsingMode {
    #[inline]
    pub fn is_html(self) -> bool {
        self == ParsingMode::Html
    }
}

/// Attribute spans inside a start tag: `name operator value`
///
/// `operator` covers the `=` together with its surrounding whitespace and
/// `value_outer` includes the quotes, so `name + operator + value_outer`
/// reproduces the source text exactly. Attributes without a value have
/// empty operator and value spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attribute {
    pub name: Span,
    pub operator: Span,
    pub value_content: Span,
    pub value_outer: Span,
    pub name_pos: Position,
    pub operator_pos: Position,
    pub value_pos: Position,
}

impl Attribute {
    /// First and last byte covered by this attribute
    pub fn outer_range(&self) -> (usize, usize) {
        let end = [self.name.end(), self.operator.end(), self.value_outer.end()]
            .into_iter()
            .max()
            .unwrap_or(self.name.end());
        (self.name.start(), end)
    }
}

/// XML declaration spans: `<?xml version="1.0" encoding="UTF-8"?>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XmlDeclaration {
    pub keyword: Span,
    pub version: Option<Span>,
    pub encoding: Option<Span>,
    pub standalone: Option<Span>,
    pub outer: Span,
}

/// Receiver of markup parsing events
///
/// Implemented by the selection dispatcher and by every consumer placed
/// downstream of it. Errors returned by a handler abort the parse and are
/// propagated unchanged to the caller.
pub trait MarkupHandler {
    /// Called once before `document_start` with the parse's selection
    /// record. Handlers that forward events should forward this too.
    fn set_parse_selection(&mut self, _selection: &ParseSelection) {}

    fn document_start(&mut self) -> HandlerResult;

    fn document_end(&mut self) -> HandlerResult;

    fn xml_declaration(
        &mut self,
        buffer: &[u8],
        declaration: &XmlDeclaration,
        pos: Position,
    ) -> HandlerResult;

    fn doctype(&mut self, buffer: &[u8], outer: Span, pos: Position) -> HandlerResult;

    fn cdata(&mut self, buffer: &[u8], content: Span, outer: Span, pos: Position) -> HandlerResult;

    fn comment(&mut self, buffer: &[u8], content: Span, outer: Span, pos: Position)
        -> HandlerResult;

    fn text(&mut self, buffer: &[u8], text: Span, pos: Position) -> HandlerResult;

    fn processing_instruction(
        &mut self,
        buffer: &[u8],
        target: Span,
        content: Option<Span>,
        outer: Span,
        pos: Position,
    ) -> HandlerResult;

    fn standalone_element_start(
        &mut self,
        buffer: &[u8],
        name: Span,
        minimized: bool,
        pos: Position,
    ) -> HandlerResult;

    fn standalone_element_end(
        &mut self,
        buffer: &[u8],
        name: Span,
        minimized: bool,
        pos: Position,
    ) -> HandlerResult;

    fn open_element_start(&mut self, buffer: &[u8], name: Span, pos: Position) -> HandlerResult;

    fn open_element_end(&mut self, buffer: &[u8], name: Span, pos: Position) -> HandlerResult;

    fn close_element_start(&mut self, buffer: &[u8], name: Span, pos: Position) -> HandlerResult;

    fn close_element_end(&mut self, buffer: &[u8], name: Span, pos: Position) -> HandlerResult;

    /// Synthesized close of an element left open; there is no source text.
    fn auto_close_element_start(
        &mut self,
        buffer: &[u8],
        name: Span,
        pos: Position,
    ) -> HandlerResult;

    fn auto_close_element_end(&mut self, buffer: &[u8], name: Span, pos: Position)
        -> HandlerResult;

    /// Close tag that matches no open element.
    fn unmatched_close_element_start(
        &mut self,
        buffer: &[u8],
        name: Span,
        pos: Position,
    ) -> HandlerResult;

    fn unmatched_close_element_end(
        &mut self,
        buffer: &[u8],
        name: Span,
        pos: Position,
    ) -> HandlerResult;

    fn attribute(&mut self, buffer: &[u8], attribute: &Attribute) -> HandlerResult;

    fn inner_white_space(&mut self, buffer: &[u8], span: Span, pos: Position) -> HandlerResult;
}

/// Handler that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHandler;

impl MarkupHandler for NoOpHandler {
    fn document_start(&mut self) -> HandlerResult {
        Ok(())
    }

    fn document_end(&mut self) -> HandlerResult {
        Ok(())
    }

    fn xml_declaration(&mut self, _: &[u8], _: &XmlDeclaration, _: Position) -> HandlerResult {
        Ok(())
    }

    fn doctype(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
        Ok(())
    }

    fn cdata(&mut self, _: &[u8], _: Span, _: Span, _: Position) -> HandlerResult {
        Ok(())
    }

    fn comment(&mut self, _: &[u8], _: Span, _: Span, _: Position) -> HandlerResult {
        Ok(())
    }

    fn text(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
        Ok(())
    }

    fn processing_instruction(
        &mut self,
        _: &[u8],
        _: Span,
        _: Option<Span>,
        _: Span,
        _: Position,
    ) -> HandlerResult {
        Ok(())
    }

    fn standalone_element_start(&mut self, _: &[u8], _: Span, _: bool, _: Position) -> HandlerResult {
        Ok(())
    }

    fn standalone_element_end(&mut self, _: &[u8], _: Span, _: bool, _: Position) -> HandlerResult {
        Ok(())
    }

    fn open_element_start(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
        Ok(())
    }

    fn open_element_end(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
        Ok(())
    }

    fn close_element_start(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
        Ok(())
    }

    fn close_element_end(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
        Ok(())
    }

    fn auto_close_element_start(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
        Ok(())
    }

    fn auto_close_element_end(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
        Ok(())
    }

    fn unmatched_close_element_start(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
        Ok(())
    }

    fn unmatched_close_element_end(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
        Ok(())
    }

    fn attribute(&mut self, _: &[u8], _: &Attribute) -> HandlerResult {
        Ok(())
    }

    fn inner_white_space(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_outer_range() {
        // <a href = "x">
        let attr = Attribute {
            name: Span::from_range(3, 7),
            operator: Span::from_range(7, 10),
            value_content: Span::from_range(11, 12),
            value_outer: Span::from_range(10, 13),
            ..Attribute::default()
        };
        assert_eq!(attr.outer_range(), (3, 13));
    }

    #[test]
    fn test_valueless_attribute_outer_range() {
        let attr = Attribute {
            name: Span::from_range(3, 11),
            operator: Span::empty_at(11),
            value_content: Span::empty_at(11),
            value_outer: Span::empty_at(11),
            ..Attribute::default()
        };
        assert_eq!(attr.outer_range(), (3, 11));
    }

    #[test]
    fn test_default_parsing_mode_is_html() {
        assert!(ParsingMode::default().is_html());
        assert!(!ParsingMode::Xml.is_html());
    }
}
