//! RustySelect - Streaming markup selection without a DOM
//!
//! Selectors such as `div.content//p[odd()]` are compiled once and matched
//! against the event stream of an HTML or XML document in a single forward
//! pass. Events are routed, byte-for-byte, to a selected or an unselected
//! stream.
//!
//! Strategies:
//! A: Single pass into buffers (select_split, select_extract, select_annotate)
//! B: Parallel selector sets (select_parallel)
//! Compiled selector sets can be kept as resources (compile_selectors).

use rustler::{Binary, Encoder, Env, NifResult, ResourceArc, Term};

pub mod core;
pub mod error;
pub mod markup;
pub mod select;
pub mod strategy;

mod resource;
mod term;

use markup::ParsingMode;
use resource::{SelectorSetRef, SelectorSetResource};
use select::{SelectOptions, SelectionMode, SelectorRepository};
use term::{bytes_to_binary, result_term, split_to_term};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Options
// ============================================================================

/// Options arrive as `{html?, block?}`
fn options_from((html, block): (bool, bool)) -> SelectOptions {
    SelectOptions::new(
        if html { ParsingMode::Html } else { ParsingMode::Xml },
        if block { SelectionMode::Block } else { SelectionMode::Node },
    )
}

// ============================================================================
// Strategy A: Single Pass
// ============================================================================

/// Split a document into `{:ok, {selected, unselected}}`
#[rustler::nif]
fn select_split<'a>(
    env: Env<'a>,
    input: Binary<'a>,
    selectors: Vec<String>,
    opts: (bool, bool),
) -> NifResult<Term<'a>> {
    let result = strategy::split(input.as_slice(), &selectors, &options_from(opts));
    Ok(result_term(env, result, |env, output| split_to_term(env, &output)))
}

/// Selected markup only, `{:ok, binary}`
#[rustler::nif]
fn select_extract<'a>(
    env: Env<'a>,
    input: Binary<'a>,
    selectors: Vec<String>,
    opts: (bool, bool),
) -> NifResult<Term<'a>> {
    let result = strategy::extract(input.as_slice(), &selectors, &options_from(opts));
    Ok(result_term(env, result, |env, bytes| bytes_to_binary(env, &bytes)))
}

/// The whole document with matching selectors written into an attribute
#[rustler::nif]
fn select_annotate<'a>(
    env: Env<'a>,
    input: Binary<'a>,
    selectors: Vec<String>,
    opts: (bool, bool),
    attribute: &str,
) -> NifResult<Term<'a>> {
    let result = strategy::annotate(input.as_slice(), &selectors, &options_from(opts), attribute);
    Ok(result_term(env, result, |env, bytes| bytes_to_binary(env, &bytes)))
}

// ============================================================================
// Compiled Selector Sets
// ============================================================================

/// Compile a selector set once for repeated use
#[rustler::nif]
fn compile_selectors<'a>(env: Env<'a>, selectors: Vec<String>, opts: (bool, bool)) -> NifResult<Term<'a>> {
    let result = SelectorSetResource::compile(&selectors, options_from(opts));
    Ok(result_term(env, result, |env, resource| {
        ResourceArc::new(resource).encode(env)
    }))
}

/// Split a document with a compiled selector set
#[rustler::nif]
fn select_compiled<'a>(env: Env<'a>, set: SelectorSetRef, input: Binary<'a>) -> NifResult<Term<'a>> {
    let result = set.split(input.as_slice());
    Ok(result_term(env, result, |env, output| split_to_term(env, &output)))
}

/// Number of selectors held by the process-wide compiled selector cache
#[rustler::nif]
fn repository_size() -> usize {
    SelectorRepository::global().len()
}

// ============================================================================
// Strategy B: Parallel Selection
// ============================================================================

/// Split one document by several selector sets in parallel
#[rustler::nif(schedule = "DirtyCpu")]
fn select_parallel<'a>(
    env: Env<'a>,
    input: Binary<'a>,
    selector_sets: Vec<Vec<String>>,
    opts: (bool, bool),
) -> NifResult<Term<'a>> {
    let results = strategy::split_parallel(input.as_slice(), &selector_sets, &options_from(opts));

    let mut list = Term::list_new_empty(env);
    for result in results.into_iter().rev() {
        let term = result_term(env, result, |env, output| split_to_term(env, &output));
        list = list.list_prepend(term);
    }
    Ok(list)
}

// ============================================================================
// NIF Initialization
// ============================================================================

rustler::init!("Elixir.RustySelect.Native");
