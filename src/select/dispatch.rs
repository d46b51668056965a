//! Selection Dispatcher
//!
//! A `MarkupHandler` that evaluates every event against a set of compiled
//! selectors and forwards it, unchanged, to either the *selected* or the
//! *unselected* downstream handler. An event is selected when any selector
//! matches it.
//!
//! Element start tags are held in an [`ElementBuffer`] until the end of the
//! tag, since attribute and index conditions can only be decided once all
//! attributes are known.
//!
//! In [`SelectionMode::Block`] a matching element selects its whole subtree
//! up to and including its close tag. In [`SelectionMode::Node`] every node
//! is decided on its own, and a close tag follows the decision made for its
//! open tag.

use log::trace;

use super::buffer::ElementBuffer;
use super::filter::SelectorChain;
use super::repository::CompiledSelectors;
use super::selection::ParseSelection;
use super::{DocumentTarget, SelectionMode};
use crate::error::HandlerResult;
use crate::markup::{Attribute, MarkupHandler, Position, Span, XmlDeclaration};

/// Runtime state of one selector
#[derive(Debug)]
struct SelectorState {
    chain: SelectorChain,
    /// Level of the element whose subtree is being selected (block mode)
    block_level: Option<usize>,
    /// Decision made for the open tag at each level (node mode)
    open_matches: Vec<bool>,
}

/// The node an event describes, for evaluation against the chains
#[derive(Debug, Clone, Copy)]
enum NodeEvent<'a> {
    Element { opens_level: bool },
    Text,
    Comment,
    Cdata,
    DocType,
    XmlDeclaration,
    ProcessingInstruction(&'a [u8]),
}

/// Routes parse events between two handlers according to a selector set
///
/// A dispatcher holds the matching state of exactly one parse. Build a new
/// one from the same [`CompiledSelectors`] for every document.
pub struct SelectionDispatcher<S, U> {
    selected: S,
    unselected: U,
    mode: SelectionMode,
    document_target: DocumentTarget,

    names: Vec<String>,
    states: Vec<SelectorState>,
    /// Per-selector result for the event being dispatched
    matches: Vec<bool>,

    markup_level: usize,
    /// Block index of the children at each level
    markup_blocks: Vec<usize>,
    next_block_index: usize,

    element: ElementBuffer,
    buffering: bool,
    /// Destination of the remaining events of the current close tag
    close_target: bool,

    selection: Option<(ParseSelection, usize)>,
}

impl<S: MarkupHandler, U: MarkupHandler> SelectionDispatcher<S, U> {
    pub fn new(
        selectors: &CompiledSelectors,
        mode: SelectionMode,
        document_target: DocumentTarget,
        selected: S,
        unselected: U,
    ) -> Self {
        let states: Vec<SelectorState> = selectors
            .chains()
            .iter()
            .map(|items| SelectorState {
                chain: SelectorChain::new(items.clone()),
                block_level: None,
                open_matches: Vec::with_capacity(16),
            })
            .collect();

        let mut markup_blocks = Vec::with_capacity(16);
        markup_blocks.push(0);

        SelectionDispatcher {
            selected,
            unselected,
            mode,
            document_target,
            names: selectors.names().to_vec(),
            matches: vec![false; states.len()],
            states,
            markup_level: 0,
            markup_blocks,
            next_block_index: 0,
            element: ElementBuffer::new(),
            buffering: false,
            close_target: false,
            selection: None,
        }
    }

    /// Consume the dispatcher and return `(selected, unselected)`
    pub fn into_handlers(self) -> (S, U) {
        (self.selected, self.unselected)
    }

    pub fn selected(&self) -> &S {
        &self.selected
    }

    pub fn unselected(&self) -> &U {
        &self.unselected
    }

    pub fn markup_level(&self) -> usize {
        self.markup_level
    }

    fn handler(&mut self, selected: bool) -> &mut dyn MarkupHandler {
        if selected {
            &mut self.selected
        } else {
            &mut self.unselected
        }
    }

    /// Evaluate the current node against every selector, recording the
    /// per-selector results, and return whether any matched
    fn evaluate(&mut self, node: NodeEvent<'_>) -> bool {
        let block = self.mode == SelectionMode::Block;
        let level = self.markup_level;
        let block_index = self.markup_blocks[level];

        let mut any = false;
        for (state, matched) in self.states.iter_mut().zip(self.matches.iter_mut()) {
            *matched = if block && state.block_level.is_some() {
                true
            } else {
                let chain = &mut state.chain;
                match node {
                    NodeEvent::Element { opens_level } => {
                        chain.match_element(block, level, block_index, &self.element, opens_level)
                    }
                    NodeEvent::Text => chain.match_text(block, level, block_index),
                    NodeEvent::Comment => chain.match_comment(block, level, block_index),
                    NodeEvent::Cdata => chain.match_cdata(block, level, block_index),
                    NodeEvent::DocType => chain.match_doctype(block, level, block_index),
                    NodeEvent::XmlDeclaration => {
                        chain.match_xml_declaration(block, level, block_index)
                    }
                    NodeEvent::ProcessingInstruction(target) => {
                        chain.match_processing_instruction(block, level, block_index, target)
                    }
                }
            };
            any |= *matched;
        }
        any
    }

    /// Leave the current level for a close tag and decide where the tag goes
    fn close_level(&mut self) -> bool {
        if self.markup_level == 0 {
            panic!(
                "markup level underflow: close tag with no open element (selectors {:?})",
                self.names
            );
        }
        self.markup_level -= 1;
        let level = self.markup_level;

        let mut any = false;
        for (i, (state, matched)) in self.states.iter_mut().zip(self.matches.iter_mut()).enumerate() {
            state.chain.remove_matches_for_level(level);
            *matched = match self.mode {
                SelectionMode::Block => {
                    let inside = state.block_level.is_some_and(|start| start <= level);
                    if state.block_level == Some(level) {
                        trace!("leaving block of \"{}\" at level {}", self.names[i], level);
                        state.block_level = None;
                    }
                    inside
                }
                SelectionMode::Node => match state.open_matches.get_mut(level) {
                    Some(open) => std::mem::take(open),
                    None => false,
                },
            };
            any |= *matched;
        }
        any
    }

    /// Record the open-tag decisions and descend into the element's children
    fn enter_level(&mut self) {
        let level = self.markup_level;
        for (i, (state, matched)) in self.states.iter_mut().zip(&self.matches).enumerate() {
            match self.mode {
                SelectionMode::Block => {
                    if *matched && state.block_level.is_none() {
                        trace!("entering block of \"{}\" at level {}", self.names[i], level);
                        state.block_level = Some(level);
                    }
                }
                SelectionMode::Node => {
                    if state.open_matches.len() <= level {
                        state.open_matches.resize(level + 1, false);
                    }
                    state.open_matches[level] = *matched;
                }
            }
        }

        self.markup_level += 1;
        self.next_block_index += 1;
        if self.markup_blocks.len() <= self.markup_level {
            self.markup_blocks.push(0);
        }
        self.markup_blocks[self.markup_level] = self.next_block_index;
    }

    fn publish_selection(&self) {
        if let Some((selection, level)) = &self.selection {
            selection.update(*level, &self.matches);
        }
    }

    fn retract_selection(&self) {
        if let Some((selection, level)) = &self.selection {
            selection.clear(*level);
        }
    }

    /// Forward one event with the selection published for its duration
    fn forward<F>(&mut self, selected: bool, event: F) -> HandlerResult
    where
        F: FnOnce(&mut dyn MarkupHandler) -> HandlerResult,
    {
        self.publish_selection();
        let result = event(self.handler(selected));
        self.retract_selection();
        result
    }

    /// Replay the buffered start tag, then forward its end event
    fn flush_element<F>(&mut self, selected: bool, end: F) -> HandlerResult
    where
        F: FnOnce(&mut dyn MarkupHandler) -> HandlerResult,
    {
        self.buffering = false;
        self.publish_selection();
        let handler: &mut dyn MarkupHandler = if selected {
            &mut self.selected
        } else {
            &mut self.unselected
        };
        let result = self.element.flush(&mut *handler).and_then(|()| end(handler));
        self.retract_selection();
        result
    }

    fn select_node(
        &mut self,
        node: NodeEvent<'_>,
        event: impl FnOnce(&mut dyn MarkupHandler) -> HandlerResult,
    ) -> HandlerResult {
        let selected = self.evaluate(node);
        self.forward(selected, event)
    }

    fn select_close(
        &mut self,
        event: impl FnOnce(&mut dyn MarkupHandler) -> HandlerResult,
    ) -> HandlerResult {
        let selected = self.close_level();
        self.close_target = selected;
        self.forward(selected, event)
    }
}

impl<S: MarkupHandler, U: MarkupHandler> MarkupHandler for SelectionDispatcher<S, U> {
    fn set_parse_selection(&mut self, selection: &ParseSelection) {
        let level = selection.subscribe_level(self.names.clone());
        self.selection = Some((selection.clone(), level));
        self.selected.set_parse_selection(selection);
        self.unselected.set_parse_selection(selection);
    }

    fn document_start(&mut self) -> HandlerResult {
        let selected = self.document_target == DocumentTarget::Selected;
        self.handler(selected).document_start()
    }

    fn document_end(&mut self) -> HandlerResult {
        let selected = self.document_target == DocumentTarget::Selected;
        self.handler(selected).document_end()
    }

    fn xml_declaration(
        &mut self,
        buffer: &[u8],
        declaration: &XmlDeclaration,
        pos: Position,
    ) -> HandlerResult {
        self.select_node(NodeEvent::XmlDeclaration, |h| {
            h.xml_declaration(buffer, declaration, pos)
        })
    }

    fn doctype(&mut self, buffer: &[u8], outer: Span, pos: Position) -> HandlerResult {
        self.select_node(NodeEvent::DocType, |h| h.doctype(buffer, outer, pos))
    }

    fn cdata(&mut self, buffer: &[u8], content: Span, outer: Span, pos: Position) -> HandlerResult {
        self.select_node(NodeEvent::Cdata, |h| h.cdata(buffer, content, outer, pos))
    }

    fn comment(&mut self, buffer: &[u8], content: Span, outer: Span, pos: Position) -> HandlerResult {
        self.select_node(NodeEvent::Comment, |h| h.comment(buffer, content, outer, pos))
    }

    fn text(&mut self, buffer: &[u8], text: Span, pos: Position) -> HandlerResult {
        self.select_node(NodeEvent::Text, |h| h.text(buffer, text, pos))
    }

    fn processing_instruction(
        &mut self,
        buffer: &[u8],
        target: Span,
        content: Option<Span>,
        outer: Span,
        pos: Position,
    ) -> HandlerResult {
        self.select_node(NodeEvent::ProcessingInstruction(target.slice(buffer)), |h| {
            h.processing_instruction(buffer, target, content, outer, pos)
        })
    }

    fn standalone_element_start(
        &mut self,
        buffer: &[u8],
        name: Span,
        minimized: bool,
        pos: Position,
    ) -> HandlerResult {
        self.element.start_standalone(buffer, name, minimized, pos);
        self.buffering = true;
        Ok(())
    }

    fn standalone_element_end(
        &mut self,
        buffer: &[u8],
        name: Span,
        minimized: bool,
        pos: Position,
    ) -> HandlerResult {
        let selected = self.evaluate(NodeEvent::Element { opens_level: false });
        self.flush_element(selected, |h| {
            h.standalone_element_end(buffer, name, minimized, pos)
        })
    }

    fn open_element_start(&mut self, buffer: &[u8], name: Span, pos: Position) -> HandlerResult {
        self.element.start_open(buffer, name, pos);
        self.buffering = true;
        Ok(())
    }

    fn open_element_end(&mut self, buffer: &[u8], name: Span, pos: Position) -> HandlerResult {
        let selected = self.evaluate(NodeEvent::Element { opens_level: true });
        let result = self.flush_element(selected, |h| h.open_element_end(buffer, name, pos));
        self.enter_level();
        result
    }

    fn close_element_start(&mut self, buffer: &[u8], name: Span, pos: Position) -> HandlerResult {
        self.select_close(|h| h.close_element_start(buffer, name, pos))
    }

    fn close_element_end(&mut self, buffer: &[u8], name: Span, pos: Position) -> HandlerResult {
        let target = self.close_target;
        self.forward(target, |h| h.close_element_end(buffer, name, pos))
    }

    fn auto_close_element_start(
        &mut self,
        buffer: &[u8],
        name: Span,
        pos: Position,
    ) -> HandlerResult {
        self.select_close(|h| h.auto_close_element_start(buffer, name, pos))
    }

    fn auto_close_element_end(&mut self, buffer: &[u8], name: Span, pos: Position) -> HandlerResult {
        let target = self.close_target;
        self.forward(target, |h| h.auto_close_element_end(buffer, name, pos))
    }

    fn unmatched_close_element_start(
        &mut self,
        buffer: &[u8],
        name: Span,
        pos: Position,
    ) -> HandlerResult {
        // No element is closed: inside a selected block the tag belongs to
        // the block, otherwise it matches nothing
        for (state, matched) in self.states.iter().zip(self.matches.iter_mut()) {
            *matched = self.mode == SelectionMode::Block && state.block_level.is_some();
        }
        let selected = self.matches.iter().any(|m| *m);
        self.close_target = selected;
        self.forward(selected, |h| h.unmatched_close_element_start(buffer, name, pos))
    }

    fn unmatched_close_element_end(
        &mut self,
        buffer: &[u8],
        name: Span,
        pos: Position,
    ) -> HandlerResult {
        let target = self.close_target;
        self.forward(target, |h| h.unmatched_close_element_end(buffer, name, pos))
    }

    fn attribute(&mut self, buffer: &[u8], attribute: &Attribute) -> HandlerResult {
        if self.buffering {
            self.element.push_attribute(buffer, attribute);
            return Ok(());
        }
        let target = self.close_target;
        self.forward(target, |h| h.attribute(buffer, attribute))
    }

    fn inner_white_space(&mut self, buffer: &[u8], span: Span, pos: Position) -> HandlerResult {
        if self.buffering {
            self.element.push_white_space(buffer, span, pos);
            return Ok(());
        }
        let target = self.close_target;
        self.forward(target, |h| h.inner_white_space(buffer, span, pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::markup_scanner::parse;
    use crate::markup::{MarkupWriter, ParsingMode, SelectionMarker, SharedBuffer};
    use pretty_assertions::assert_eq;

    fn compile(selectors: &[&str], mode: ParsingMode) -> CompiledSelectors {
        CompiledSelectors::compile(selectors, mode, None).unwrap()
    }

    fn split_with(
        input: &str,
        selectors: &[&str],
        parsing: ParsingMode,
        mode: SelectionMode,
    ) -> (String, String) {
        let compiled = compile(selectors, parsing);
        let mut dispatcher = SelectionDispatcher::new(
            &compiled,
            mode,
            DocumentTarget::Selected,
            MarkupWriter::new(Vec::new()),
            MarkupWriter::new(Vec::new()),
        );
        parse(input.as_bytes(), parsing, &mut dispatcher).unwrap();
        let (selected, unselected) = dispatcher.into_handlers();
        (
            String::from_utf8(selected.into_inner()).unwrap(),
            String::from_utf8(unselected.into_inner()).unwrap(),
        )
    }

    fn block(input: &str, selectors: &[&str]) -> (String, String) {
        split_with(input, selectors, ParsingMode::Html, SelectionMode::Block)
    }

    fn node(input: &str, selectors: &[&str]) -> (String, String) {
        split_with(input, selectors, ParsingMode::Html, SelectionMode::Node)
    }

    #[test]
    fn test_block_selects_subtree() {
        let input =
            "<html><body><div class=\"content\">X<strong>Y</strong></div></body></html>";
        let (selected, unselected) = block(input, &["//div[class='content']"]);
        assert_eq!(selected, "<div class=\"content\">X<strong>Y</strong></div>");
        assert_eq!(unselected, "<html><body></body></html>");
    }

    #[test]
    fn test_block_with_text_selector() {
        let input = "<h1>A</h1><div>B<em>C</em></div>";
        let (selected, unselected) = block(input, &["h1", "div//text()"]);
        assert_eq!(selected, "<h1>A</h1>BC");
        assert_eq!(unselected, "<div><em></em></div>");
    }

    #[test]
    fn test_block_containment_includes_nested_same_name() {
        let input = "<div><p>1</p><div>2</div></div><p>3</p>";
        let (selected, unselected) = block(input, &["/div"]);
        assert_eq!(selected, "<div><p>1</p><div>2</div></div>");
        assert_eq!(unselected, "<p>3</p>");
    }

    #[test]
    fn test_node_mode_selects_tags_only() {
        let input = "<div><p>x</p></div>";
        let (selected, unselected) = node(input, &["div"]);
        assert_eq!(selected, "<div></div>");
        assert_eq!(unselected, "<p>x</p>");

        // Descendants are evaluated on their own
        let (selected, _) = node(input, &["div", "p"]);
        assert_eq!(selected, "<div><p></p></div>");
    }

    #[test]
    fn test_node_mode_nested_matches() {
        let input = "<div><div>a</div><span></span></div>";
        let (selected, unselected) = node(input, &["div/div"]);
        assert_eq!(selected, "<div></div>");
        assert_eq!(unselected, "<div>a<span></span></div>");
    }

    #[test]
    fn test_index_selection() {
        let input = "<ul><li>1</li><li>2</li><li>3</li><li>4</li></ul>\
                     <ul><li>5</li><li>6</li></ul>";
        let (selected, _) = block(input, &["li[odd()]"]);
        assert_eq!(selected, "<li>2</li><li>4</li><li>6</li>");

        let (selected, _) = block(input, &["li[0]"]);
        assert_eq!(selected, "<li>1</li><li>5</li>");

        let (selected, _) = block(input, &["ul[1]/li[>0]"]);
        assert_eq!(selected, "<li>6</li>");
    }

    #[test]
    fn test_index_counts_only_matching_siblings() {
        let input = "<p><a>1</a><a>2</a><b>x</b><a>3</a></p>";
        let (selected, _) = block(input, &["a[odd()]"]);
        assert_eq!(selected, "<a>2</a>");
        let (selected, _) = block(input, &["a[>1]"]);
        assert_eq!(selected, "<a>3</a>");
    }

    #[test]
    fn test_attribute_operators() {
        let matches = |input: &str, selector: &str| !node(input, &[selector]).0.is_empty();

        let element = "<x y=\"abc\"></x>";
        for selector in ["x[y^='ab']", "x[y$='bc']", "x[y*='b']", "x[y='abc']", "x[y]"] {
            assert!(matches(element, selector), "{} should match", selector);
        }
        for selector in ["x[y!='abc']", "x[!y]", "x[y='ABC']"] {
            assert!(!matches(element, selector), "{} should not match", selector);
        }

        let bare = "<x></x>";
        assert!(matches(bare, "x[!y]"));
        assert!(!matches(bare, "x[y]"));
        assert!(matches(bare, "x[y!='abc']"));
    }

    #[test]
    fn test_class_tokens() {
        let matches = |input: &str, selector: &str| !node(input, &[selector]).0.is_empty();

        let classes = "<div class=\"a b c\"></div>";
        assert!(matches(classes, "div.b"));
        assert!(matches(classes, "div[class*='b']"));
        assert!(matches(classes, "div[class='a']"));
        assert!(!matches(classes, "div.d"));

        let empty = "<div class=\"\"></div>";
        assert!(!matches(empty, "div.b"));
        assert!(!matches(empty, "div[class]"));
        assert!(matches(empty, "div[class='']"));
    }

    #[test]
    fn test_round_trip_through_both_streams() {
        let inputs = [
            "<!DOCTYPE html><html><head><title>T</title></head>\
             <body><div id=main class='a b'><p>x<br>y</p><!-- c --></div></body></html>",
            "<ul><li>1<li>2</ul></span> tail < 3",
            "<div><p>a</div><p  class = x >b</p >",
        ];
        let selector_sets: [&[&str]; 4] =
            [&["p"], &["div//text()"], &["#main", "li[1]"], &["comment()", "br"]];

        for input in inputs {
            for selectors in selector_sets {
                for mode in [SelectionMode::Block, SelectionMode::Node] {
                    let shared = SharedBuffer::new();
                    let compiled = compile(selectors, ParsingMode::Html);
                    let mut dispatcher = SelectionDispatcher::new(
                        &compiled,
                        mode,
                        DocumentTarget::Selected,
                        MarkupWriter::new(shared.clone()),
                        MarkupWriter::new(shared.clone()),
                    );
                    parse(input.as_bytes(), ParsingMode::Html, &mut dispatcher).unwrap();
                    assert_eq!(
                        String::from_utf8(shared.take()).unwrap(),
                        input,
                        "{:?} {:?}",
                        selectors,
                        mode
                    );
                }
            }
        }
    }

    #[test]
    fn test_auto_closed_elements() {
        let input = "<div><p>a</div><p>b";
        let (selected, unselected) = block(input, &["p"]);
        assert_eq!(selected, "<p>a<p>b");
        assert_eq!(unselected, "<div></div>");
    }

    #[test]
    fn test_unmatched_close_tags() {
        let input = "<div></span></div></em>";
        let (selected, unselected) = block(input, &["div"]);
        assert_eq!(selected, "<div></span></div>");
        assert_eq!(unselected, "</em>");

        let (selected, unselected) = node(input, &["div"]);
        assert_eq!(selected, "<div></div>");
        assert_eq!(unselected, "</span></em>");
    }

    #[test]
    fn test_xml_node_kinds() {
        let input = "<?xml version=\"1.0\"?><?render fast?><root><![CDATA[x]]><!--c--></root>";
        let split = |selector: &str| {
            split_with(input, &[selector], ParsingMode::Xml, SelectionMode::Node).0
        };
        assert_eq!(split("xmldecl()"), "<?xml version=\"1.0\"?>");
        assert_eq!(split("procinstr('render')"), "<?render fast?>");
        assert_eq!(split("procinstr('other')"), "");
        assert_eq!(split("root/cdata()"), "<![CDATA[x]]>");
        assert_eq!(split("comment()"), "<!--c-->");
        assert_eq!(split("Root"), "");
    }

    #[test]
    fn test_parse_selection_drives_marker() {
        let shared = SharedBuffer::new();
        let compiled = compile(&["p", "p.a"], ParsingMode::Html);
        let mut dispatcher = SelectionDispatcher::new(
            &compiled,
            SelectionMode::Node,
            DocumentTarget::Selected,
            SelectionMarker::new(MarkupWriter::new(shared.clone()), "data-sel"),
            MarkupWriter::new(shared.clone()),
        );
        parse(b"<div><p class=\"a\">x</p><p>y</p></div>", ParsingMode::Html, &mut dispatcher)
            .unwrap();
        assert_eq!(
            String::from_utf8(shared.take()).unwrap(),
            "<div><p class=\"a\" data-sel=\"p p.a\">x</p><p data-sel=\"p\">y</p></div>"
        );
    }

    #[test]
    fn test_nested_dispatchers_publish_both_levels() {
        // Outer blocks on div, inner picks p tags out of those blocks
        let shared = SharedBuffer::new();
        let inner_selectors = compile(&["p"], ParsingMode::Html);
        let inner = SelectionDispatcher::new(
            &inner_selectors,
            SelectionMode::Node,
            DocumentTarget::Selected,
            SelectionMarker::new(MarkupWriter::new(shared.clone()), "m"),
            MarkupWriter::new(shared.clone()),
        );
        let outer_selectors = compile(&["div"], ParsingMode::Html);
        let mut outer = SelectionDispatcher::new(
            &outer_selectors,
            SelectionMode::Block,
            DocumentTarget::Selected,
            inner,
            MarkupWriter::new(shared.clone()),
        );
        parse(b"<p>0</p><div><p>1</p></div>", ParsingMode::Html, &mut outer).unwrap();
        assert_eq!(
            String::from_utf8(shared.take()).unwrap(),
            "<p>0</p><div><p m=\"div p\">1</p></div>"
        );
    }

    #[test]
    #[should_panic(expected = "markup level underflow")]
    fn test_close_without_open_panics() {
        let compiled = compile(&["p"], ParsingMode::Html);
        let mut dispatcher = SelectionDispatcher::new(
            &compiled,
            SelectionMode::Block,
            DocumentTarget::Selected,
            MarkupWriter::new(Vec::new()),
            MarkupWriter::new(Vec::new()),
        );
        let _ = dispatcher.close_element_start(b"</p>", Span::new(2, 1), Position::default());
    }
}
