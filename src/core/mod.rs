//! Core markup scanning primitives
//!
//! This module contains the building blocks that turn raw bytes into
//! markup events:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - MarkupScanner: lenient scanner driving a `MarkupHandler`

pub mod markup_scanner;
pub mod scanner;
