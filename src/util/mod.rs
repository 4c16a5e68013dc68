mod code;
mod logger;
mod position;

use once_cell::unsync::OnceCell;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
/// Line/column location of a byte offset within a source slice.
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// A wrapper around the raw source bytes with a lazily built line-break index,
/// used to resolve byte offsets to [Position]s for diagnostics.
pub struct Code<'c> {
    pub value: &'c [u8],
    line_breaks: OnceCell<Vec<usize>>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// Opt-in debug tracing level for the tokenizer and parser.
pub enum Log<T> {
    None,
    Default(T),
    Success(T),
    Result(T),
    Verbose(T),
}
