use serde::{Deserialize, Serialize};

/// Parse configuration for a [`DelimitedReader`](crate::DelimitedReader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderSettings {
    pub separator: char,
    pub quote_char: Option<char>,
    pub escape_char: Option<char>,
    pub has_header: bool,
    /// Raw lines discarded before the first record.
    pub skip_lines: usize,
    /// Fields equal to this token read as `None`.
    pub null_value: String,
    /// Drop characters that appear outside quotes.
    pub strict_quotes: bool,
    pub ignore_leading_whitespace: bool,
    /// Skip records whose width differs from the header instead of failing.
    pub skip_differing_lines: bool,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            separator: ',',
            quote_char: Some('"'),
            escape_char: Some('\\'),
            has_header: true,
            skip_lines: 0,
            null_value: String::new(),
            strict_quotes: false,
            ignore_leading_whitespace: true,
            skip_differing_lines: false,
        }
    }
}
