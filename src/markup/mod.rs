//! Markup event interface
//!
//! Spans, the `MarkupHandler` trait and the downstream handlers that
//! consume selected and unselected event streams.

pub mod handler;
pub mod marking;
pub mod span;
pub mod writer;

pub use handler::{Attribute, MarkupHandler, NoOpHandler, ParsingMode, XmlDeclaration};
pub use marking::SelectionMarker;
pub use span::{Position, Span};
pub use writer::{MarkupWriter, SharedBuffer};
