//! Elixir Term Conversion Utilities
//!
//! Converts selection results and errors to Elixir terms.

use rustler::{Encoder, Env, NewBinary, Term};

use crate::error::MarkupError;
use crate::strategy::SplitOutput;

// Pre-defined atoms for efficiency - created once at compile time
rustler::atoms! {
    ok,
    error,
    selector,
    configuration,
    io,
    handler,
}

/// Create a binary from bytes
pub fn bytes_to_binary<'a>(env: Env<'a>, bytes: &[u8]) -> Term<'a> {
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}

/// `{selected, unselected}` as a pair of binaries
pub fn split_to_term<'a>(env: Env<'a>, output: &SplitOutput) -> Term<'a> {
    (
        bytes_to_binary(env, &output.selected),
        bytes_to_binary(env, &output.unselected),
    )
        .encode(env)
}

/// `{:ok, value}`
pub fn ok_term<'a>(env: Env<'a>, value: Term<'a>) -> Term<'a> {
    (ok(), value).encode(env)
}

/// `{:error, {kind, message}}`, where kind is `:selector`, `:configuration`,
/// `:io` or `:handler`
pub fn error_term<'a>(env: Env<'a>, err: &MarkupError) -> Term<'a> {
    let kind = match err {
        MarkupError::Selector(_) => selector(),
        MarkupError::Configuration(_) => configuration(),
        MarkupError::Io(_) => io(),
        MarkupError::Handler(_) => handler(),
    };
    (error(), (kind, err.to_string())).encode(env)
}

/// Encode a result, splitting errors with [`error_term`]
pub fn result_term<'a, T, F>(env: Env<'a>, result: Result<T, MarkupError>, encode: F) -> Term<'a>
where
    F: FnOnce(Env<'a>, T) -> Term<'a>,
{
    match result {
        Ok(value) => ok_term(env, encode(env, value)),
        Err(err) => error_term(env, &err),
    }
}
