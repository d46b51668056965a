//! Markup Scanner
//!
//! Turns a byte slice into the full markup event interface. Every event
//! carries spans into the original input, so replaying all of them through
//! a `MarkupWriter` reproduces the document byte-for-byte.
//!
//! The scanner is lenient: unterminated constructs and stray `<` become
//! text, close tags auto-close the elements nested inside them, and close
//! tags matching nothing are reported as unmatched.

use log::trace;

use super::scanner::{is_name_char, is_name_start_char, is_whitespace, LineTracker, Scanner};
use crate::error::{HandlerResult, MarkupError};
use crate::markup::{Attribute, MarkupHandler, ParsingMode, Position, Span, XmlDeclaration};
use crate::select::ParseSelection;

/// Spans hold `u32` offsets
const MAX_INPUT_LEN: usize = u32::MAX as usize;

/// HTML elements that never have content
const HTML_VOID_ELEMENTS: &[&[u8]] = &[
    b"area", b"base", b"br", b"col", b"embed", b"hr", b"img", b"input", b"keygen", b"link",
    b"meta", b"param", b"source", b"track", b"wbr",
];

/// HTML elements whose content is not markup
const HTML_RAW_TEXT_ELEMENTS: &[&[u8]] = &[b"script", b"style"];

/// Event-producing scanner over one input document
pub struct MarkupScanner<'a> {
    input: &'a [u8],
    scanner: Scanner<'a>,
    mode: ParsingMode,
    lines: LineTracker,
    /// Names of the currently open elements, outermost first
    open_elements: Vec<Span>,
}

impl<'a> MarkupScanner<'a> {
    pub fn new(input: &'a [u8], mode: ParsingMode) -> Self {
        Self {
            input,
            scanner: Scanner::new(input),
            mode,
            lines: LineTracker::new(),
            open_elements: Vec::with_capacity(16),
        }
    }

    /// Scan the entire document, calling handler methods for each event
    pub fn scan<H: MarkupHandler>(&mut self, handler: &mut H) -> HandlerResult {
        check_input_len(self.input.len())?;
        let selection = ParseSelection::new();
        handler.set_parse_selection(&selection);
        handler.document_start()?;

        while !self.scanner.is_eof() {
            match self.scanner.peek() {
                Some(b'<') => self.scan_markup(handler)?,
                Some(_) => self.scan_text(handler)?,
                None => break,
            }
        }

        let end = self.input.len();
        self.auto_close_to(handler, 0, end)?;
        handler.document_end()
    }

    #[inline]
    fn position(&mut self, offset: usize) -> Position {
        self.lines.position(self.input, offset)
    }

    /// Scan markup starting with '<'
    fn scan_markup<H: MarkupHandler>(&mut self, handler: &mut H) -> HandlerResult {
        let start = self.scanner.position();

        match self.scanner.peek_at(1) {
            Some(b'/') => self.scan_close_tag(handler, start),
            Some(b'!') => {
                if self.scanner.starts_with(b"<!--") {
                    self.scan_comment(handler, start)
                } else if self.scanner.starts_with(b"<![CDATA[") {
                    self.scan_cdata(handler, start)
                } else {
                    self.scanner.advance(2);
                    let is_doctype = self.scanner.starts_with_ignore_case(b"DOCTYPE");
                    self.scanner.set_position(start);
                    if is_doctype {
                        self.scan_doctype(handler, start)
                    } else {
                        // Unknown declaration, kept as text
                        let end = self
                            .scanner
                            .find_tag_end_from(start)
                            .map_or(self.input.len(), |gt| gt + 1);
                        self.emit_text(handler, start, end)
                    }
                }
            }
            Some(b'?') => self.scan_pi(handler, start),
            Some(c) if is_name_start_char(c) => self.scan_start_tag(handler, start),
            _ => {
                // Stray '<', emitted as literal text
                self.emit_text(handler, start, start + 1)
            }
        }
    }

    /// Scan a start tag, standalone or open
    fn scan_start_tag<H: MarkupHandler>(&mut self, handler: &mut H, start: usize) -> HandlerResult {
        let name_start = start + 1;
        let name_end = self.scanner.name_end(name_start);

        let Some(tag_end) = self.scanner.find_tag_end_quoted(name_end) else {
            return self.emit_text(handler, start, self.input.len());
        };

        let minimized = tag_end > name_end && self.input[tag_end - 1] == b'/';
        let body_end = if minimized { tag_end - 1 } else { tag_end };
        let name = Span::from_range(name_start, name_end);
        let standalone = minimized || self.is_void_element(name);

        let pos = self.position(start);
        if standalone {
            handler.standalone_element_start(self.input, name, minimized, pos)?;
        } else {
            handler.open_element_start(self.input, name, pos)?;
        }

        self.scan_attributes(handler, name_end, body_end)?;

        let end_pos = self.position(body_end);
        self.scanner.set_position(tag_end + 1);
        if standalone {
            return handler.standalone_element_end(self.input, name, minimized, end_pos);
        }

        handler.open_element_end(self.input, name, end_pos)?;
        self.open_elements.push(name);

        if self.is_raw_text_element(name) {
            self.scan_raw_text(handler, name)?;
        }
        Ok(())
    }

    /// Scan attributes and the whitespace between them in `from..to`
    fn scan_attributes<H: MarkupHandler>(
        &mut self,
        handler: &mut H,
        from: usize,
        to: usize,
    ) -> HandlerResult {
        let mut pos = from;

        while pos < to {
            if is_whitespace(self.input[pos]) {
                let end = self.scanner.whitespace_end(pos, to);
                let ws_pos = self.position(pos);
                handler.inner_white_space(self.input, Span::from_range(pos, end), ws_pos)?;
                pos = end;
                continue;
            }

            let attribute = self.scan_attribute(pos, to);
            handler.attribute(self.input, &attribute)?;
            pos = attribute.outer_range().1;
        }
        Ok(())
    }

    /// Scan one attribute starting at `from`, never reading past `to`
    fn scan_attribute(&mut self, from: usize, to: usize) -> Attribute {
        let mut name_end = from;
        while name_end < to && !is_whitespace(self.input[name_end]) && self.input[name_end] != b'=' {
            name_end += 1;
        }
        if name_end == from {
            // A lone '=' is taken as the attribute name
            name_end += 1;
        }

        let name = Span::from_range(from, name_end);
        let name_pos = self.position(from);

        let eq = self.scanner.whitespace_end(name_end, to);
        if eq >= to || self.input[eq] != b'=' {
            return Attribute {
                name,
                operator: Span::empty_at(name_end as u32),
                value_content: Span::empty_at(name_end as u32),
                value_outer: Span::empty_at(name_end as u32),
                name_pos,
                operator_pos: name_pos,
                value_pos: name_pos,
            };
        }

        let value_start = self.scanner.whitespace_end(eq + 1, to);
        let operator = Span::from_range(name_end, value_start);
        let operator_pos = self.position(name_end);
        let value_pos = self.position(value_start);

        let (value_content, value_outer) = match self.scanner.byte_at(value_start) {
            Some(quote @ (b'"' | b'\'')) if value_start < to => {
                match memchr::memchr(quote, &self.input[value_start + 1..to]) {
                    Some(i) => {
                        let close = value_start + 1 + i;
                        (
                            Span::from_range(value_start + 1, close),
                            Span::from_range(value_start, close + 1),
                        )
                    }
                    None => (
                        Span::from_range(value_start + 1, to),
                        Span::from_range(value_start, to),
                    ),
                }
            }
            _ => {
                let mut end = value_start;
                while end < to && !is_whitespace(self.input[end]) {
                    end += 1;
                }
                let span = Span::from_range(value_start, end);
                (span, span)
            }
        };

        Attribute {
            name,
            operator,
            value_content,
            value_outer,
            name_pos,
            operator_pos,
            value_pos,
        }
    }

    /// Scan a close tag, auto-closing inner elements or reporting it as
    /// unmatched
    fn scan_close_tag<H: MarkupHandler>(&mut self, handler: &mut H, start: usize) -> HandlerResult {
        let name_start = start + 2;
        let name_end = self.scanner.name_end(name_start);

        let Some(tag_end) = self.scanner.find_tag_end_from(name_end) else {
            return self.emit_text(handler, start, self.input.len());
        };
        if name_end == name_start {
            return self.emit_text(handler, start, tag_end + 1);
        }

        let name = Span::from_range(name_start, name_end);
        let pos = self.position(start);
        let trailing = Span::from_range(name_end, tag_end);

        let open_index = self
            .open_elements
            .iter()
            .rposition(|open| self.names_match(*open, name));

        match open_index {
            Some(index) => {
                self.auto_close_to(handler, index + 1, start)?;
                self.open_elements.pop();

                handler.close_element_start(self.input, name, pos)?;
                if !trailing.is_empty() {
                    let ws_pos = self.position(name_end);
                    handler.inner_white_space(self.input, trailing, ws_pos)?;
                }
                let end_pos = self.position(tag_end);
                handler.close_element_end(self.input, name, end_pos)?;
            }
            None => {
                trace!(
                    "unmatched close tag </{}> at {}:{}",
                    String::from_utf8_lossy(name.slice(self.input)),
                    pos.line,
                    pos.col
                );
                handler.unmatched_close_element_start(self.input, name, pos)?;
                if !trailing.is_empty() {
                    let ws_pos = self.position(name_end);
                    handler.inner_white_space(self.input, trailing, ws_pos)?;
                }
                let end_pos = self.position(tag_end);
                handler.unmatched_close_element_end(self.input, name, end_pos)?;
            }
        }

        self.scanner.set_position(tag_end + 1);
        Ok(())
    }

    /// Auto-close open elements until only `depth` remain
    fn auto_close_to<H: MarkupHandler>(
        &mut self,
        handler: &mut H,
        depth: usize,
        at: usize,
    ) -> HandlerResult {
        while self.open_elements.len() > depth {
            let Some(name) = self.open_elements.pop() else {
                break;
            };
            let pos = self.position(at);
            trace!(
                "auto-closing <{}> at {}:{}",
                String::from_utf8_lossy(name.slice(self.input)),
                pos.line,
                pos.col
            );
            handler.auto_close_element_start(self.input, name, pos)?;
            handler.auto_close_element_end(self.input, name, pos)?;
        }
        Ok(())
    }

    /// Scan text content up to the next '<'
    fn scan_text<H: MarkupHandler>(&mut self, handler: &mut H) -> HandlerResult {
        let start = self.scanner.position();
        let end = self.scanner.find_tag_start().unwrap_or(self.input.len());
        self.emit_text(handler, start, end)
    }

    /// Content of `script`/`style` up to the matching close tag
    fn scan_raw_text<H: MarkupHandler>(&mut self, handler: &mut H, name: Span) -> HandlerResult {
        let from = self.scanner.position();
        let name_bytes = name.slice(self.input);
        let mut search = from;

        let end = loop {
            match self.scanner.find_sequence(search, b"</") {
                Some(lt) => {
                    let candidate_end = lt + 2 + name_bytes.len();
                    let same_name = self
                        .input
                        .get(lt + 2..candidate_end)
                        .is_some_and(|n| n.eq_ignore_ascii_case(name_bytes));
                    if same_name && !self.scanner.byte_at(candidate_end).is_some_and(is_name_char) {
                        break lt;
                    }
                    search = lt + 2;
                }
                None => break self.input.len(),
            }
        };

        if end > from {
            let pos = self.position(from);
            handler.text(self.input, Span::from_range(from, end), pos)?;
        }
        self.scanner.set_position(end);
        Ok(())
    }

    fn scan_comment<H: MarkupHandler>(&mut self, handler: &mut H, start: usize) -> HandlerResult {
        let content_start = start + 4;
        let Some(content_end) = self.scanner.find_sequence(content_start, b"-->") else {
            return self.emit_text(handler, start, self.input.len());
        };
        let pos = self.position(start);
        handler.comment(
            self.input,
            Span::from_range(content_start, content_end),
            Span::from_range(start, content_end + 3),
            pos,
        )?;
        self.scanner.set_position(content_end + 3);
        Ok(())
    }

    fn scan_cdata<H: MarkupHandler>(&mut self, handler: &mut H, start: usize) -> HandlerResult {
        let content_start = start + 9;
        let Some(content_end) = self.scanner.find_sequence(content_start, b"]]>") else {
            return self.emit_text(handler, start, self.input.len());
        };
        let pos = self.position(start);
        handler.cdata(
            self.input,
            Span::from_range(content_start, content_end),
            Span::from_range(start, content_end + 3),
            pos,
        )?;
        self.scanner.set_position(content_end + 3);
        Ok(())
    }

    /// Scan DOCTYPE, handling an internal subset in brackets
    fn scan_doctype<H: MarkupHandler>(&mut self, handler: &mut H, start: usize) -> HandlerResult {
        let mut depth = 0usize;
        let mut end = None;

        for (i, &c) in self.input[start + 9..].iter().enumerate() {
            match c {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => {
                    end = Some(start + 9 + i);
                    break;
                }
                _ => {}
            }
        }

        let Some(gt) = end else {
            return self.emit_text(handler, start, self.input.len());
        };
        let pos = self.position(start);
        handler.doctype(self.input, Span::from_range(start, gt + 1), pos)?;
        self.scanner.set_position(gt + 1);
        Ok(())
    }

    /// Scan a processing instruction or the XML declaration
    fn scan_pi<H: MarkupHandler>(&mut self, handler: &mut H, start: usize) -> HandlerResult {
        let target_start = start + 2;
        let target_end = self.scanner.name_end(target_start);

        let Some(pi_end) = self.scanner.find_sequence(target_end, b"?>") else {
            return self.emit_text(handler, start, self.input.len());
        };
        if target_end == target_start {
            return self.emit_text(handler, start, pi_end + 2);
        }

        let target = Span::from_range(target_start, target_end);
        let outer = Span::from_range(start, pi_end + 2);
        let content_start = self.scanner.whitespace_end(target_end, pi_end);
        let pos = self.position(start);

        if target.slice(self.input) == b"xml" {
            let mut declaration = XmlDeclaration {
                keyword: target,
                outer,
                ..XmlDeclaration::default()
            };
            for (name, value) in self.pseudo_attributes(content_start, pi_end) {
                match name.slice(self.input) {
                    b"version" => declaration.version = Some(value),
                    b"encoding" => declaration.encoding = Some(value),
                    b"standalone" => declaration.standalone = Some(value),
                    _ => {}
                }
            }
            handler.xml_declaration(self.input, &declaration, pos)?;
        } else {
            let content =
                (content_start < pi_end).then(|| Span::from_range(content_start, pi_end));
            handler.processing_instruction(self.input, target, content, outer, pos)?;
        }

        self.scanner.set_position(pi_end + 2);
        Ok(())
    }

    /// `name="value"` pairs inside an XML declaration; value spans exclude
    /// the quotes
    fn pseudo_attributes(&self, from: usize, to: usize) -> Vec<(Span, Span)> {
        let mut pairs = Vec::with_capacity(3);
        let mut pos = from;

        while pos < to {
            pos = self.scanner.whitespace_end(pos, to);
            let name_end = self.scanner.name_end(pos).min(to);
            if name_end == pos {
                break;
            }
            let eq = self.scanner.whitespace_end(name_end, to);
            if eq >= to || self.input[eq] != b'=' {
                break;
            }
            let value_start = self.scanner.whitespace_end(eq + 1, to);
            let Some(quote @ (b'"' | b'\'')) = self.scanner.byte_at(value_start) else {
                break;
            };
            let Some(i) = memchr::memchr(quote, &self.input[value_start + 1..to]) else {
                break;
            };
            let value_end = value_start + 1 + i;
            pairs.push((
                Span::from_range(pos, name_end),
                Span::from_range(value_start + 1, value_end),
            ));
            pos = value_end + 1;
        }
        pairs
    }

    fn emit_text<H: MarkupHandler>(
        &mut self,
        handler: &mut H,
        start: usize,
        end: usize,
    ) -> HandlerResult {
        if end > start {
            let pos = self.position(start);
            handler.text(self.input, Span::from_range(start, end), pos)?;
        }
        self.scanner.set_position(end);
        Ok(())
    }

    fn names_match(&self, open: Span, close: Span) -> bool {
        let (open, close) = (open.slice(self.input), close.slice(self.input));
        if self.mode.is_html() {
            open.eq_ignore_ascii_case(close)
        } else {
            open == close
        }
    }

    fn is_void_element(&self, name: Span) -> bool {
        let name = name.slice(self.input);
        self.mode.is_html() && HTML_VOID_ELEMENTS.iter().any(|v| name.eq_ignore_ascii_case(v))
    }

    fn is_raw_text_element(&self, name: Span) -> bool {
        let name = name.slice(self.input);
        self.mode.is_html() && HTML_RAW_TEXT_ELEMENTS.iter().any(|r| name.eq_ignore_ascii_case(r))
    }
}

fn check_input_len(len: usize) -> HandlerResult {
    if len > MAX_INPUT_LEN {
        return Err(MarkupError::Configuration(format!(
            "input of {} bytes exceeds the {} byte limit",
            len, MAX_INPUT_LEN
        )));
    }
    Ok(())
}

/// Scan `input`, delivering every event to `handler`.
///
/// Inputs longer than `u32::MAX` bytes are rejected before any event is
/// delivered.
pub fn parse<H: MarkupHandler>(input: &[u8], mode: ParsingMode, handler: &mut H) -> HandlerResult {
    MarkupScanner::new(input, mode).scan(handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Test handler that records events as readable strings
    #[derive(Default)]
    struct EventLog {
        events: Vec<String>,
        positions: Vec<(String, Position)>,
        declaration: Option<(String, String)>,
    }

    impl EventLog {
        fn push(&mut self, kind: &str, buffer: &[u8], span: Span) {
            self.events
                .push(format!("{}({})", kind, String::from_utf8_lossy(span.slice(buffer))));
        }
    }

    impl MarkupHandler for EventLog {
        fn document_start(&mut self) -> HandlerResult {
            self.events.push("start".to_string());
            Ok(())
        }

        fn document_end(&mut self) -> HandlerResult {
            self.events.push("end".to_string());
            Ok(())
        }

        fn xml_declaration(
            &mut self,
            buffer: &[u8],
            declaration: &XmlDeclaration,
            _pos: Position,
        ) -> HandlerResult {
            let text = |span: Option<Span>| {
                span.map(|s| String::from_utf8_lossy(s.slice(buffer)).into_owned())
                    .unwrap_or_default()
            };
            self.declaration = Some((text(declaration.version), text(declaration.encoding)));
            self.push("xmldecl", buffer, declaration.outer);
            Ok(())
        }

        fn doctype(&mut self, buffer: &[u8], outer: Span, _pos: Position) -> HandlerResult {
            self.push("doctype", buffer, outer);
            Ok(())
        }

        fn cdata(&mut self, buffer: &[u8], content: Span, _outer: Span, _pos: Position) -> HandlerResult {
            self.push("cdata", buffer, content);
            Ok(())
        }

        fn comment(&mut self, buffer: &[u8], content: Span, _outer: Span, _pos: Position) -> HandlerResult {
            self.push("comment", buffer, content);
            Ok(())
        }

        fn text(&mut self, buffer: &[u8], text: Span, pos: Position) -> HandlerResult {
            self.push("text", buffer, text);
            self.positions.push((String::from_utf8_lossy(text.slice(buffer)).into_owned(), pos));
            Ok(())
        }

        fn processing_instruction(
            &mut self,
            buffer: &[u8],
            target: Span,
            _content: Option<Span>,
            _outer: Span,
            _pos: Position,
        ) -> HandlerResult {
            self.push("pi", buffer, target);
            Ok(())
        }

        fn standalone_element_start(
            &mut self,
            buffer: &[u8],
            name: Span,
            minimized: bool,
            _pos: Position,
        ) -> HandlerResult {
            self.push(if minimized { "minimized" } else { "standalone" }, buffer, name);
            Ok(())
        }

        fn standalone_element_end(&mut self, _: &[u8], _: Span, _: bool, _: Position) -> HandlerResult {
            Ok(())
        }

        fn open_element_start(&mut self, buffer: &[u8], name: Span, pos: Position) -> HandlerResult {
            self.push("open", buffer, name);
            self.positions.push((String::from_utf8_lossy(name.slice(buffer)).into_owned(), pos));
            Ok(())
        }

        fn open_element_end(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
            Ok(())
        }

        fn close_element_start(&mut self, buffer: &[u8], name: Span, _pos: Position) -> HandlerResult {
            self.push("close", buffer, name);
            Ok(())
        }

        fn close_element_end(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
            Ok(())
        }

        fn auto_close_element_start(&mut self, buffer: &[u8], name: Span, _pos: Position) -> HandlerResult {
            self.push("autoclose", buffer, name);
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
            self.push("unmatched", buffer, name);
            Ok(())
        }

        fn unmatched_close_element_end(&mut self, _: &[u8], _: Span, _: Position) -> HandlerResult {
            Ok(())
        }

        fn attribute(&mut self, buffer: &[u8], attribute: &Attribute) -> HandlerResult {
            self.events.push(format!(
                "attr({}|{}|{})",
                String::from_utf8_lossy(attribute.name.slice(buffer)),
                String::from_utf8_lossy(attribute.operator.slice(buffer)),
                String::from_utf8_lossy(attribute.value_content.slice(buffer)),
            ));
            Ok(())
        }

        fn inner_white_space(&mut self, buffer: &[u8], span: Span, _pos: Position) -> HandlerResult {
            self.push("ws", buffer, span);
            Ok(())
        }
    }

    fn events(input: &str, mode: ParsingMode) -> Vec<String> {
        let mut log = EventLog::default();
        parse(input.as_bytes(), mode, &mut log).unwrap();
        log.events
    }

    #[test]
    fn test_simple_nesting() {
        assert_eq!(
            events("<a><b>x</b></a>", ParsingMode::Xml),
            vec!["start", "open(a)", "open(b)", "text(x)", "close(b)", "close(a)", "end"]
        );
    }

    #[test]
    fn test_attribute_spans() {
        assert_eq!(
            events("<a href = \"x\" flag v=1/>", ParsingMode::Xml),
            vec![
                "start",
                "minimized(a)",
                "ws( )",
                "attr(href| = |x)",
                "ws( )",
                "attr(flag||)",
                "ws( )",
                "attr(v|=|1)",
                "end"
            ]
        );
    }

    #[test]
    fn test_void_elements_depend_on_mode() {
        assert_eq!(
            events("<br><p>", ParsingMode::Html),
            vec!["start", "standalone(br)", "open(p)", "autoclose(p)", "end"]
        );
        assert_eq!(
            events("<br>", ParsingMode::Xml),
            vec!["start", "open(br)", "autoclose(br)", "end"]
        );
    }

    #[test]
    fn test_close_tag_auto_closes_inner_elements() {
        assert_eq!(
            events("<a><b><c></a>", ParsingMode::Xml),
            vec![
                "start",
                "open(a)",
                "open(b)",
                "open(c)",
                "autoclose(c)",
                "autoclose(b)",
                "close(a)",
                "end"
            ]
        );
    }

    #[test]
    fn test_unmatched_close_tag() {
        assert_eq!(
            events("<a></x ></a>", ParsingMode::Xml),
            vec!["start", "open(a)", "unmatched(x)", "ws( )", "close(a)", "end"]
        );
    }

    #[test]
    fn test_html_close_tags_ignore_case() {
        assert_eq!(
            events("<DIV></div>", ParsingMode::Html),
            vec!["start", "open(DIV)", "close(div)", "end"]
        );
    }

    #[test]
    fn test_script_content_is_raw_text() {
        assert_eq!(
            events("<script>if (a<b) {}</scripts></script>", ParsingMode::Html),
            vec![
                "start",
                "open(script)",
                "text(if (a<b) {}</scripts>)",
                "close(script)",
                "end"
            ]
        );
    }

    #[test]
    fn test_declarations() {
        let mut log = EventLog::default();
        let input = "<?xml version='1.0' encoding=\"UTF-8\"?><!DOCTYPE r [<!ENTITY e \"v\">]>\
                     <r><!--c--><![CDATA[<d>]]><?go now?></r>";
        parse(input.as_bytes(), ParsingMode::Xml, &mut log).unwrap();
        assert_eq!(
            log.declaration,
            Some(("1.0".to_string(), "UTF-8".to_string()))
        );
        assert_eq!(
            log.events,
            vec![
                "start",
                "xmldecl(<?xml version='1.0' encoding=\"UTF-8\"?>)",
                "doctype(<!DOCTYPE r [<!ENTITY e \"v\">]>)",
                "open(r)",
                "comment(c)",
                "cdata(<d>)",
                "pi(go)",
                "close(r)",
                "end"
            ]
        );
    }

    #[test]
    fn test_malformed_markup_becomes_text() {
        assert_eq!(
            events("1 < 2 <!-- open", ParsingMode::Html),
            vec!["start", "text(1 )", "text(<)", "text( 2 )", "text(<!-- open)", "end"]
        );
        assert_eq!(
            events("<a x=\"1>", ParsingMode::Html),
            vec!["start", "text(<a x=\"1>)", "end"]
        );
    }

    #[test]
    fn test_positions_are_one_based() {
        let mut log = EventLog::default();
        parse(b"<a>\n  <b>hi</b></a>", ParsingMode::Xml, &mut log).unwrap();
        let find = |what: &str| {
            log.positions
                .iter()
                .find(|(s, _)| s == what)
                .map(|(_, p)| *p)
                .unwrap()
        };
        assert_eq!(find("a"), Position::new(1, 1));
        assert_eq!(find("b"), Position::new(2, 3));
        assert_eq!(find("hi"), Position::new(2, 6));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_oversized_input_is_rejected() {
        assert!(check_input_len(MAX_INPUT_LEN).is_ok());
        let err = check_input_len(MAX_INPUT_LEN + 1).unwrap_err();
        assert!(matches!(err, MarkupError::Configuration(_)));
        assert!(err.to_string().contains("4294967296 bytes"));
    }
}
