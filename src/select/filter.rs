//! Selector Filter Chain
//!
//! The per-parse matching automaton for one compiled selector. Each step of
//! the selector gets a filter state holding the depths at which the step is
//! satisfied by a currently open ancestor, plus sibling counters for index
//! conditions. States are stored in an arena indexed like the items, so the
//! "next filter" of step `i` is simply step `i + 1`.
//!
//! A satisfied open element is recorded even when an ancestor already
//! satisfied the same step. An inner match then anchors the next child
//! step, so `//div/p` matches the `p` in `<div><div><p>`.
//!
//! Both tables grow as needed and never shrink during a parse; a closed
//! level is cleared, never removed.

use std::collections::HashMap;
use std::sync::Arc;

use super::buffer::ElementBuffer;
use super::item::{MarkupNode, SelectorItem};

#[derive(Debug, Clone, Default)]
struct FilterState {
    /// `matched_at_depth[d]`: satisfied by the open element at depth `d`
    matched_at_depth: Vec<bool>,
    /// Matching siblings seen so far, per markup block index
    sibling_counters: HashMap<usize, usize>,
}

impl FilterState {
    #[inline]
    fn matched_at(&self, level: usize) -> bool {
        self.matched_at_depth.get(level).copied().unwrap_or(false)
    }

    #[inline]
    fn matched_at_or_above(&self, level: usize) -> bool {
        let end = (level + 1).min(self.matched_at_depth.len());
        self.matched_at_depth[..end].iter().any(|m| *m)
    }

    fn record(&mut self, level: usize) {
        if self.matched_at_depth.len() <= level {
            self.matched_at_depth.resize(level + 1, false);
        }
        self.matched_at_depth[level] = true;
    }

    fn clear(&mut self, level: usize) {
        if let Some(matched) = self.matched_at_depth.get_mut(level) {
            *matched = false;
        }
    }
}

/// Stateful matcher for one selector during one parse
///
/// `block` selects block semantics: a node inside an already matched
/// element counts as matching the final step.
#[derive(Debug, Clone)]
pub struct SelectorChain {
    items: Arc<[SelectorItem]>,
    states: Vec<FilterState>,
}

impl SelectorChain {
    pub fn new(items: Arc<[SelectorItem]>) -> Self {
        let states = vec![FilterState::default(); items.len()];
        SelectorChain { items, states }
    }

    /// Forget all state so the chain can serve a new parse
    pub fn reset(&mut self) {
        for state in &mut self.states {
            state.matched_at_depth.clear();
            state.sibling_counters.clear();
        }
    }

    /// Match an element start tag. `opens_level` is false for standalone
    /// elements, which have no descendants.
    pub fn match_element(
        &mut self,
        block: bool,
        level: usize,
        block_index: usize,
        element: &ElementBuffer,
        opens_level: bool,
    ) -> bool {
        self.match_node(block, level, block_index, &MarkupNode::Element(element), opens_level)
    }

    pub fn match_text(&mut self, block: bool, level: usize, block_index: usize) -> bool {
        self.match_node(block, level, block_index, &MarkupNode::Text, false)
    }

    pub fn match_comment(&mut self, block: bool, level: usize, block_index: usize) -> bool {
        self.match_node(block, level, block_index, &MarkupNode::Comment, false)
    }

    pub fn match_cdata(&mut self, block: bool, level: usize, block_index: usize) -> bool {
        self.match_node(block, level, block_index, &MarkupNode::Cdata, false)
    }

    pub fn match_doctype(&mut self, block: bool, level: usize, block_index: usize) -> bool {
        self.match_node(block, level, block_index, &MarkupNode::DocType, false)
    }

    pub fn match_xml_declaration(&mut self, block: bool, level: usize, block_index: usize) -> bool {
        self.match_node(block, level, block_index, &MarkupNode::XmlDeclaration, false)
    }

    pub fn match_processing_instruction(
        &mut self,
        block: bool,
        level: usize,
        block_index: usize,
        target: &[u8],
    ) -> bool {
        self.match_node(
            block,
            level,
            block_index,
            &MarkupNode::ProcessingInstruction { target },
            false,
        )
    }

    fn match_node(
        &mut self,
        block: bool,
        level: usize,
        block_index: usize,
        node: &MarkupNode<'_>,
        opens_level: bool,
    ) -> bool {
        if self.items.is_empty() {
            return false;
        }
        self.match_at(0, block, level, block_index, node, opens_level)
    }

    fn match_at(
        &mut self,
        idx: usize,
        block: bool,
        level: usize,
        block_index: usize,
        node: &MarkupNode<'_>,
        opens_level: bool,
    ) -> bool {
        let has_next = idx + 1 < self.items.len();
        let previously = self.states[idx].matched_at_or_above(level);

        if self.accepts_level(idx, level) {
            let satisfied = self.evaluate(idx, block_index, node);

            // Recorded even when an ancestor already satisfied this step, so
            // the next step can match direct children of the inner element
            if satisfied && opens_level {
                self.states[idx].record(level);
            }

            if previously {
                return if has_next {
                    self.match_at(idx + 1, block, level, block_index, node, opens_level)
                } else {
                    block || satisfied
                };
            }
            return satisfied && !has_next;
        }

        if previously {
            return if has_next {
                self.match_at(idx + 1, block, level, block_index, node, opens_level)
            } else {
                block
            };
        }
        false
    }

    /// Whether step `idx` may be evaluated against a node at `level`
    #[inline]
    fn accepts_level(&self, idx: usize, level: usize) -> bool {
        self.items[idx].any_level()
            || (idx == 0 && level == 0)
            || (idx > 0 && level > 0 && self.states[idx - 1].matched_at(level - 1))
    }

    /// Predicate first, then the index condition against the count of
    /// matching siblings in the same block
    fn evaluate(&mut self, idx: usize, block_index: usize, node: &MarkupNode<'_>) -> bool {
        let item = &self.items[idx];
        if !item.matches_node(node) {
            return false;
        }
        match item.index() {
            None => true,
            Some(index) => {
                let position = self.states[idx]
                    .sibling_counters
                    .entry(block_index)
                    .and_modify(|count| *count += 1)
                    .or_insert(0);
                index.matches(*position)
            }
        }
    }

    /// Called after the markup level has been decremented for a close tag
    pub fn remove_matches_for_level(&mut self, level: usize) {
        for state in &mut self.states {
            state.clear(level);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{ParsingMode, Position, Span};
    use crate::select::parser::parse_selector;

    /// Drives a chain the way the dispatcher does for a tree of elements
    struct Driver {
        chain: SelectorChain,
        block: bool,
        level: usize,
        blocks: Vec<usize>,
        next_block: usize,
    }

    impl Driver {
        fn new(selector: &str, block: bool) -> Self {
            let items = parse_selector(selector, ParsingMode::Html, None).unwrap();
            Driver {
                chain: SelectorChain::new(items.into()),
                block,
                level: 0,
                blocks: vec![0],
                next_block: 0,
            }
        }

        fn element(name: &str) -> ElementBuffer {
            let mut buffer = ElementBuffer::new();
            buffer.start_open(name.as_bytes(), Span::from_range(0, name.len()), Position::default());
            buffer
        }

        fn open(&mut self, name: &str) -> bool {
            let element = Self::element(name);
            let block_index = self.blocks[self.level];
            let matched = self
                .chain
                .match_element(self.block, self.level, block_index, &element, true);
            self.level += 1;
            self.next_block += 1;
            if self.blocks.len() <= self.level {
                self.blocks.push(0);
            }
            self.blocks[self.level] = self.next_block;
            matched
        }

        fn standalone(&mut self, name: &str) -> bool {
            let element = Self::element(name);
            let block_index = self.blocks[self.level];
            self.chain
                .match_element(self.block, self.level, block_index, &element, false)
        }

        fn text(&mut self) -> bool {
            let block_index = self.blocks[self.level];
            self.chain.match_text(self.block, self.level, block_index)
        }

        fn close(&mut self) {
            self.level -= 1;
            self.chain.remove_matches_for_level(self.level);
        }
    }

    #[test]
    fn test_descendant_steps() {
        let mut d = Driver::new("div//p", false);
        assert!(!d.open("div"));
        assert!(!d.open("section"));
        assert!(d.open("p"));
        d.close();
        d.close();
        d.close();
        // Outside the div again
        assert!(!d.open("p"));
    }

    #[test]
    fn test_child_step_inside_nested_match() {
        // <div><div><p> must match //div/p through the inner div
        let mut d = Driver::new("//div/p", false);
        assert!(!d.open("div"));
        assert!(!d.open("div"));
        assert!(d.open("p"));
        d.close();
        d.close();
        // Direct child of the outer div
        assert!(d.open("p"));
        d.close();
        assert!(!d.open("span"));
        assert!(!d.open("p"));
    }

    #[test]
    fn test_absolute_path_is_anchored() {
        let mut d = Driver::new("/html/body", false);
        assert!(!d.open("html"));
        assert!(!d.open("div"));
        assert!(!d.open("body"));
        d.close();
        d.close();
        assert!(d.open("body"));

        let mut d = Driver::new("/body", false);
        assert!(!d.open("html"));
        assert!(!d.open("body"));
    }

    #[test]
    fn test_block_flag_extends_final_step() {
        let mut node = Driver::new("/html", false);
        assert!(node.open("html"));
        assert!(!node.open("body"));
        assert!(!node.text());

        let mut block = Driver::new("/html", true);
        assert!(block.open("html"));
        assert!(block.open("body"));
        assert!(block.text());
        let last = block.chain.states.last().unwrap();
        assert!(last.matched_at_or_above(1));
    }

    #[test]
    fn test_index_counts_matching_siblings_per_parent() {
        let run = |selector: &str| {
            let mut d = Driver::new(selector, false);
            d.open("ul");
            let mut results = Vec::new();
            for name in ["a", "a", "b", "a"] {
                results.push(d.standalone(name));
            }
            d.close();
            // A second parent starts counting again
            d.open("ul");
            results.push(d.standalone("a"));
            results
        };
        assert_eq!(run("a[0]"), vec![true, false, false, false, true]);
        assert_eq!(run("a[odd()]"), vec![false, true, false, true, false]);
        assert_eq!(run("a[>1]"), vec![false, false, false, true, false]);
        assert_eq!(run("a[<1]"), vec![true, false, false, false, true]);
    }

    #[test]
    fn test_text_steps() {
        let mut d = Driver::new("div//text()", false);
        assert!(!d.text());
        d.open("div");
        assert!(d.text());
        d.open("em");
        assert!(d.text());
        d.close();
        d.close();
        assert!(!d.text());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut d = Driver::new("div/p", false);
        d.open("div");
        d.chain.reset();
        assert!(!d.open("p"));
    }
}
