//! Markup Selector Engine
//!
//! Streaming selection over markup events with:
//! - An XPath/CSS flavored selector language (`div.content//p[odd()]`)
//! - Per-parse matching chains driven by markup depth, no DOM
//! - Block (subtree) and node selection
//! - A bounded cache of compiled selectors with pluggable references

pub mod buffer;
pub mod dispatch;
pub mod filter;
pub mod item;
pub mod lexer;
pub mod parser;
pub mod repository;
pub mod selection;

use std::fmt;
use std::sync::Arc;

use crate::error::MarkupError;
use crate::markup::ParsingMode;

pub use dispatch::SelectionDispatcher;
pub use item::SelectorItem;
pub use parser::parse_selector;
pub use repository::{CompiledSelectors, ReferenceResolver, SelectorRepository};
pub use selection::ParseSelection;

/// Whether a matching element selects its subtree or only itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Block,
    Node,
}

/// Which stream receives the document start and end events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentTarget {
    #[default]
    Selected,
    Unselected,
}

/// Options for a selection run
#[derive(Clone, Default)]
pub struct SelectOptions {
    pub parsing_mode: ParsingMode,
    pub selection_mode: SelectionMode,
    pub document_target: DocumentTarget,
    pub resolver: Option<Arc<dyn ReferenceResolver>>,
}

impl SelectOptions {
    pub fn new(parsing_mode: ParsingMode, selection_mode: SelectionMode) -> Self {
        SelectOptions {
            parsing_mode,
            selection_mode,
            ..Default::default()
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_document_target(mut self, target: DocumentTarget) -> Self {
        self.document_target = target;
        self
    }

    /// Compile `selectors` for these options through the global repository
    pub fn compile<S: AsRef<str>>(&self, selectors: &[S]) -> Result<CompiledSelectors, MarkupError> {
        CompiledSelectors::compile(selectors, self.parsing_mode, self.resolver.as_ref())
    }
}

impl fmt::Debug for SelectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectOptions")
            .field("parsing_mode", &self.parsing_mode)
            .field("selection_mode", &self.selection_mode)
            .field("document_target", &self.document_target)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}
