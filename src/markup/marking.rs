//! Selection Marker
//!
//! Wraps a handler and adds an attribute naming the matching selectors to
//! the start tag of every element it receives while a selection is active,
//! e.g. `<div data-selected="content main">`.

use super::handler::{Attribute, MarkupHandler, XmlDeclaration};
use super::span::{Position, Span};
use crate::error::HandlerResult;
use crate::select::ParseSelection;

pub struct SelectionMarker<H> {
    inner: H,
    attribute_name: String,
    selection: Option<ParseSelection>,
    /// Source buffer for the injected whitespace and attribute
    scratch: Vec<u8>,
}

impl<H: MarkupHandler> SelectionMarker<H> {
    pub fn new(inner: H, attribute_name: impl Into<String>) -> Self {
        Self {
            inner,
            attribute_name: attribute_name.into(),
            selection: None,
            scratch: Vec::with_capacity(64),
        }
    }

    pub fn into_inner(self) -> H {
        self.inner
    }

    /// Forward ` name="sel1 sel2"` to the wrapped handler when any selector
    /// currently matches
    fn mark(&mut self, pos: Position) -> HandlerResult {
        let Some(selection) = &self.selection else {
            return Ok(());
        };
        let matching = selection.matching_selectors();
        if matching.is_empty() {
            return Ok(());
        }

        self.scratch.clear();
        self.scratch.push(b' ');
        self.scratch.extend_from_slice(self.attribute_name.as_bytes());
        let name_end = self.scratch.len();
        self.scratch.push(b'=');
        self.scratch.push(b'"');
        let value_start = self.scratch.len();
        for (i, selector) in matching.iter().enumerate() {
            if i > 0 {
                self.scratch.push(b' ');
            }
            for &b in selector.as_bytes() {
                match b {
                    b'"' => self.scratch.extend_from_slice(b"&quot;"),
                    b'&' => self.scratch.extend_from_slice(b"&amp;"),
                    _ => self.scratch.push(b),
                }
            }
        }
        let value_end = self.scratch.len();
        self.scratch.push(b'"');

        let attribute = Attribute {
            name: Span::from_range(1, name_end),
            operator: Span::from_range(name_end, name_end + 1),
            value_content: Span::from_range(value_start, value_end),
            value_outer: Span::from_range(value_start - 1, value_end + 1),
            name_pos: pos,
            operator_pos: pos,
            value_pos: pos,
        };

        self.inner
            .inner_white_space(&self.scratch, Span::new(0, 1), pos)?;
        self.inner.attribute(&self.scratch, &attribute)
    }
}

impl<H: MarkupHandler> MarkupHandler for SelectionMarker<H> {
    fn set_parse_selection(&mut self, selection: &ParseSelection) {
        self.selection = Some(selection.clone());
        self.inner.set_parse_selection(selection);
    }

    fn document_start(&mut self) -> HandlerResult {
        self.inner.document_start()
    }

    fn document_end(&mut self) -> HandlerResult {
        self.inner.document_end()
    }

    fn xml_declaration(
        &mut self,
        buffer: &[u8],
        declaration: &XmlDeclaration,
        pos: Position,
    ) -> HandlerResult {
        self.inner.xml_declaration(buffer, declaration, pos)
    }

    fn doctype(&mut self, buffer: &[u8], outer: Span, pos: Position) -> HandlerResult {
        self.inner.doctype(buffer, outer, pos)
    }

    fn cdata(&mut self, buffer: &[u8], content: Span, outer: Span, pos: Position) -> HandlerResult {
        self.inner.cdata(buffer, content, outer, pos)
    }

    fn comment(&mut self, buffer: &[u8], content: Span, outer: Span, pos: Position) -> HandlerResult {
        self.inner.comment(buffer, content, outer, pos)
    }

    fn text(&mut self, buffer: &[u8], text: Span, pos: Position) -> HandlerResult {
        self.inner.text(buffer, text, pos)
    }

    fn processing_instruction(
        &mut self,
        buffer: &[u8],
        target: Span,
        content: Option<Span>,
        outer: Span,
        pos: Position,
    ) -> HandlerResult {
        self.inner
            .processing_instruction(buffer, target, content, outer, pos)
    }

    fn standalone_element_start(
        &mut self,
        buffer: &[u8],
        name: Span,
        minimized: bool,
        pos: Position,
    ) -> HandlerResult {
        self.inner
            .standalone_element_start(buffer, name, minimized, pos)
    }

    fn standalone_element_end(
        &mut self,
        buffer: &[u8],
        name: Span,
        minimized: bool,
        pos: Position,
    ) -> HandlerResult {
        self.mark(pos)?;
        self.inner.standalone_element_end(buffer, name, minimized, pos)
    }

    fn open_element_start(&mut self, buffer: &[u8], name: Span, pos: Position) -> HandlerResult {
        self.inner.open_element_start(buffer, name, pos)
    }

    fn open_element_end(&mut self, buffer: &[u8], name: Span, pos: Position) -> HandlerResult {
        self.mark(pos)?;
        self.inner.open_element_end(buffer, name, pos)
    }

    fn close_element_start(&mut self, buffer: &[u8], name: Span, pos: Position) -> HandlerResult {
        self.inner.close_element_start(buffer, name, pos)
    }

    fn close_element_end(&mut self, buffer: &[u8], name: Span, pos: Position) -> HandlerResult {
        self.inner.close_element_end(buffer, name, pos)
    }

    fn auto_close_element_start(
        &mut self,
        buffer: &[u8],
        name: Span,
        pos: Position,
    ) -> HandlerResult {
        self.inner.auto_close_element_start(buffer, name, pos)
    }

    fn auto_close_element_end(&mut self, buffer: &[u8], name: Span, pos: Position) -> HandlerResult {
        self.inner.auto_close_element_end(buffer, name, pos)
    }

    fn unmatched_close_element_start(
        &mut self,
        buffer: &[u8],
        name: Span,
        pos: Position,
    ) -> HandlerResult {
        self.inner.unmatched_close_element_start(buffer, name, pos)
    }

    fn unmatched_close_element_end(
        &mut self,
        buffer: &[u8],
        name: Span,
        pos: Position,
    ) -> HandlerResult {
        self.inner.unmatched_close_element_end(buffer, name, pos)
    }

    fn attribute(&mut self, buffer: &[u8], attribute: &Attribute) -> HandlerResult {
        self.inner.attribute(buffer, attribute)
    }

    fn inner_white_space(&mut self, buffer: &[u8], span: Span, pos: Position) -> HandlerResult {
        self.inner.inner_white_space(buffer, span, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::MarkupWriter;
    use pretty_assertions::assert_eq;

    fn open_tag(marker: &mut SelectionMarker<MarkupWriter<Vec<u8>>>) {
        let input = b"<p>";
        let name = Span::from_range(1, 2);
        marker.open_element_start(input, name, Position::new(1, 1)).unwrap();
        marker.open_element_end(input, name, Position::new(1, 3)).unwrap();
    }

    #[test]
    fn test_marks_matching_selectors() {
        let selection = ParseSelection::new();
        let level = selection.subscribe_level(vec!["p".to_string(), "a\"b".to_string()]);
        selection.update(level, &[true, true]);

        let mut marker = SelectionMarker::new(MarkupWriter::new(Vec::new()), "data-sel");
        marker.set_parse_selection(&selection);
        open_tag(&mut marker);

        let out = marker.into_inner().into_inner();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<p data-sel=\"p a&quot;b\">"
        );
    }

    #[test]
    fn test_no_mark_without_match() {
        let selection = ParseSelection::new();
        let level = selection.subscribe_level(vec!["p".to_string()]);
        selection.update(level, &[false]);

        let mut marker = SelectionMarker::new(MarkupWriter::new(Vec::new()), "data-sel");
        marker.set_parse_selection(&selection);
        open_tag(&mut marker);

        assert_eq!(marker.into_inner().into_inner(), b"<p>".to_vec());
    }
}
