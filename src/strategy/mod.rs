//! Selection Strategy Module
//!
//! Ready-made ways to run a selector set over a document:
//! - Strategy A: Single pass into in-memory buffers (split, extract, annotate)
//! - Strategy B: Parallel selector sets over one document

pub mod split;
pub mod parallel;

pub use parallel::{extract_map, split_parallel};
pub use split::{annotate, extract, extract_compiled, split, split_compiled, SplitOutput};
