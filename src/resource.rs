//! ResourceArc Wrappers
//!
//! Compiled selector sets kept on the Elixir side between calls.

use rustler::ResourceArc;

use crate::error::MarkupError;
use crate::select::{CompiledSelectors, SelectOptions};
use crate::strategy::{split_compiled, SplitOutput};

/// A compiled selector set together with the options it was compiled for.
///
/// Immutable once built; every use instantiates its own matching state, so
/// the same resource may be used from several processes at once.
pub struct SelectorSetResource {
    pub selectors: CompiledSelectors,
    pub options: SelectOptions,
}

impl SelectorSetResource {
    pub fn compile(selectors: &[String], options: SelectOptions) -> Result<Self, MarkupError> {
        let selectors = options.compile(selectors)?;
        Ok(SelectorSetResource { selectors, options })
    }

    pub fn split(&self, input: &[u8]) -> Result<SplitOutput, MarkupError> {
        split_compiled(input, &self.selectors, &self.options)
    }
}

#[rustler::resource_impl]
impl rustler::Resource for SelectorSetResource {}

/// Type alias for the ResourceArc
pub type SelectorSetRef = ResourceArc<SelectorSetResource>;
