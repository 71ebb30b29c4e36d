//! Field tokenizer.
//!
//! Splits physical lines into fields. A quoted field may continue onto the
//! next line; the tokenizer keeps that state between calls to [`Tokenizer::feed`].

use crate::settings::ReaderSettings;

/// Result of feeding one physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tokenized {
    /// The line closed a record.
    Complete(Vec<String>),
    /// A quoted field is still open; feed the next line.
    Open,
}

#[derive(Debug, Default)]
struct Partial {
    fields: Vec<String>,
    field: String,
    in_quotes: bool,
    quoted: bool,
}

impl Partial {
    fn finish_field(&mut self) {
        self.fields.push(std::mem::take(&mut self.field));
        self.quoted = false;
    }
}

/// Stateful line tokenizer.
#[derive(Debug)]
pub struct Tokenizer {
    separator: char,
    quote: Option<char>,
    escape: Option<char>,
    strict_quotes: bool,
    ignore_leading_whitespace: bool,
    partial: Partial,
    open: bool,
}

impl Tokenizer {
    pub fn new(settings: &ReaderSettings) -> Self {
        Self {
            separator: settings.separator,
            quote: settings.quote_char,
            escape: settings.escape_char,
            strict_quotes: settings.strict_quotes,
            ignore_leading_whitespace: settings.ignore_leading_whitespace,
            partial: Partial::default(),
            open: false,
        }
    }

    /// Whether the previous line ended inside a quoted field.
    pub fn is_open(&self) -> bool {
        self.open
    }

    fn is_escapable(&self, c: char) -> bool {
        Some(c) == self.quote || Some(c) == self.escape
    }

    /// Feeds one line without its terminator.
    pub fn feed(&mut self, line: &str) -> Tokenized {
        let chars: Vec<char> = line.chars().collect();
        if self.open {
            self.partial.field.push('\n');
        }

        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();
            let in_quotes = self.partial.in_quotes;

            if Some(c) == self.escape && next.is_some_and(|n| self.is_escapable(n)) {
                if in_quotes || !self.strict_quotes {
                    self.partial.field.extend(next);
                }
                i += 2;
                continue;
            }

            if Some(c) == self.quote {
                if in_quotes && next == self.quote {
                    self.partial.field.push(c);
                    i += 2;
                    continue;
                }
                self.partial.in_quotes = !in_quotes;
                self.partial.quoted = true;
                i += 1;
                continue;
            }

            if c == self.separator && !in_quotes {
                self.partial.finish_field();
                i += 1;
                continue;
            }

            if !in_quotes {
                if self.strict_quotes {
                    i += 1;
                    continue;
                }
                if self.ignore_leading_whitespace
                    && c.is_whitespace()
                    && self.partial.field.is_empty()
                    && !self.partial.quoted
                {
                    i += 1;
                    continue;
                }
            }

            self.partial.field.push(c);
            i += 1;
        }

        if self.partial.in_quotes {
            self.open = true;
            return Tokenized::Open;
        }

        self.open = false;
        self.partial.finish_field();
        Tokenized::Complete(std::mem::take(&mut self.partial).fields)
    }
}
