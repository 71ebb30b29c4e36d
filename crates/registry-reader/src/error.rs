use std::io;

use thiserror::Error;

/// Errors raised while reading a delimited input.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("unterminated quoted field starting on line {line}")]
    UnterminatedQuote { line: usize },

    #[error("line {line} has {found} columns, expected {expected}")]
    DifferingColumns {
        line: usize,
        expected: usize,
        found: usize,
    },
}
