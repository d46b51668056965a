//! Single-Pass Selection (Strategy A)
//!
//! Parses a document once and routes every event through a
//! `SelectionDispatcher` into in-memory writers.

use crate::core::markup_scanner::parse;
use crate::core::scanner::{is_name_char, is_name_start_char};
use crate::error::MarkupError;
use crate::markup::{MarkupWriter, NoOpHandler, SelectionMarker, SharedBuffer};
use crate::select::{CompiledSelectors, SelectOptions, SelectionDispatcher};

/// The two halves of a document split by a selector set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitOutput {
    pub selected: Vec<u8>,
    pub unselected: Vec<u8>,
}

/// Split `input` into selected and unselected markup
pub fn split<S: AsRef<str>>(
    input: &[u8],
    selectors: &[S],
    options: &SelectOptions,
) -> Result<SplitOutput, MarkupError> {
    let compiled = options.compile(selectors)?;
    split_compiled(input, &compiled, options)
}

/// Split with an already compiled selector set
///
/// The parsing mode of `selectors` wins over the one in `options`, since the
/// chains were compiled for it.
pub fn split_compiled(
    input: &[u8],
    selectors: &CompiledSelectors,
    options: &SelectOptions,
) -> Result<SplitOutput, MarkupError> {
    let mut dispatcher = SelectionDispatcher::new(
        selectors,
        options.selection_mode,
        options.document_target,
        MarkupWriter::new(Vec::with_capacity(input.len() / 2)),
        MarkupWriter::new(Vec::with_capacity(input.len())),
    );
    parse(input, selectors.parsing_mode(), &mut dispatcher)?;

    let (selected, unselected) = dispatcher.into_handlers();
    Ok(SplitOutput {
        selected: selected.into_inner(),
        unselected: unselected.into_inner(),
    })
}

/// Keep only the selected markup
pub fn extract<S: AsRef<str>>(
    input: &[u8],
    selectors: &[S],
    options: &SelectOptions,
) -> Result<Vec<u8>, MarkupError> {
    let compiled = options.compile(selectors)?;
    extract_compiled(input, &compiled, options)
}

pub fn extract_compiled(
    input: &[u8],
    selectors: &CompiledSelectors,
    options: &SelectOptions,
) -> Result<Vec<u8>, MarkupError> {
    let mut dispatcher = SelectionDispatcher::new(
        selectors,
        options.selection_mode,
        options.document_target,
        MarkupWriter::new(Vec::with_capacity(input.len() / 2)),
        NoOpHandler,
    );
    parse(input, selectors.parsing_mode(), &mut dispatcher)?;

    let (selected, _) = dispatcher.into_handlers();
    Ok(selected.into_inner())
}

/// Reproduce `input` with `attribute="..."` listing the matching selectors
/// added to every selected element
pub fn annotate<S: AsRef<str>>(
    input: &[u8],
    selectors: &[S],
    options: &SelectOptions,
    attribute: &str,
) -> Result<Vec<u8>, MarkupError> {
    let valid = attribute.as_bytes().first().is_some_and(|&b| is_name_start_char(b))
        && attribute.bytes().all(is_name_char);
    if !valid {
        return Err(MarkupError::Configuration(format!(
            "invalid annotation attribute name: {:?}",
            attribute
        )));
    }
    let compiled = options.compile(selectors)?;

    let output = SharedBuffer::new();
    let mut dispatcher = SelectionDispatcher::new(
        &compiled,
        options.selection_mode,
        options.document_target,
        SelectionMarker::new(MarkupWriter::new(output.clone()), attribute),
        MarkupWriter::new(output.clone()),
    );
    parse(input, compiled.parsing_mode(), &mut dispatcher)?;
    drop(dispatcher);

    Ok(output.take())
}
