//! Streaming reader for delimited text inputs.
//!
//! Reads one record at a time from any `BufRead`, honoring the separator,
//! quote, escape and null-token settings stored with a registered input.

mod error;
mod reader;
mod settings;
mod tokenizer;

pub use error::ReaderError;
pub use reader::{DelimitedReader, Row};
pub use settings::ReaderSettings;
pub use tokenizer::{Tokenized, Tokenizer};
