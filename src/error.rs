//! Error Types
//!
//! Selector compilation errors are reported eagerly, before any markup is
//! parsed. `MarkupError` is the error flowing through the event interface.

use thiserror::Error;

/// Error raised while compiling a selector string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("invalid selector \"{selector}\": {reason}")]
    Syntax { selector: String, reason: String },

    #[error("selector \"{selector}\" combines more than one of #id, .class and %ref in a single step")]
    ConflictingModifiers { selector: String },

    #[error("index modifier must be the last modifier of its step in selector \"{selector}\"")]
    MisplacedIndex { selector: String },

    #[error("selector \"{selector}\" specifies more than one index condition for a single step")]
    DuplicateIndex { selector: String },

    #[error(
        "reference \"{reference}\" in selector \"{selector}\" resolves to {levels} path levels, exactly one is allowed"
    )]
    NonSingularReference {
        selector: String,
        reference: String,
        levels: usize,
    },

    #[error("selector \"{selector}\" combines items that disagree on any-level matching")]
    IncompatibleLevels { selector: String },

    #[error("'{modifier}' modifier in selector \"{selector}\" is only available in HTML mode")]
    HtmlOnlyModifier { selector: String, modifier: char },
}

impl SelectorError {
    pub(crate) fn syntax(selector: &str, reason: impl Into<String>) -> Self {
        SelectorError::Syntax {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }
}

/// Error propagated through markup handlers
#[derive(Debug, Error)]
pub enum MarkupError {
    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Handler(String),
}

/// Result of a single handler callback
pub type HandlerResult = Result<(), MarkupError>;
