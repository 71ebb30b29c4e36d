use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::ReaderError;
use crate::settings::ReaderSettings;
use crate::tokenizer::{Tokenized, Tokenizer};

/// One data record; `None` marks a field equal to the null token.
pub type Row = Vec<Option<String>>;

/// Record-at-a-time reader over a delimited source.
///
/// The header is read (or generated) on construction. The underlying source
/// is released when the reader is dropped.
#[derive(Debug)]
pub struct DelimitedReader<R> {
    source: R,
    settings: ReaderSettings,
    tokenizer: Tokenizer,
    line: usize,
    headers: Vec<String>,
    /// First data record, buffered when the header had to be generated from it.
    pending: Option<(usize, Vec<String>)>,
}

impl DelimitedReader<BufReader<File>> {
    /// Opens `path` for reading with `settings`.
    pub fn open(path: impl AsRef<Path>, settings: ReaderSettings) -> Result<Self, ReaderError> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file), settings)
    }
}

impl<R: BufRead> DelimitedReader<R> {
    pub fn new(source: R, settings: ReaderSettings) -> Result<Self, ReaderError> {
        let tokenizer = Tokenizer::new(&settings);
        let mut reader = Self {
            source,
            settings,
            tokenizer,
            line: 0,
            headers: Vec::new(),
            pending: None,
        };

        reader.skip_raw_lines()?;

        if reader.settings.has_header {
            if let Some((_, names)) = reader.next_fields()? {
                reader.headers = names;
            }
        } else if let Some(first) = reader.next_fields()? {
            reader.headers = (1..=first.1.len()).map(|i| format!("column{}", i)).collect();
            reader.pending = Some(first);
        }

        Ok(reader)
    }

    pub fn column_names(&self) -> &[String] {
        &self.headers
    }

    /// Physical lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.line
    }

    fn skip_raw_lines(&mut self) -> Result<(), ReaderError> {
        let mut buf = Vec::new();
        for _ in 0..self.settings.skip_lines {
            buf.clear();
            if self.source.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            self.line += 1;
        }
        Ok(())
    }

    /// Next complete record with the line it started on.
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than rejected.
    fn next_fields(&mut self) -> Result<Option<(usize, Vec<String>)>, ReaderError> {
        let mut buf = Vec::new();
        let mut start = self.line + 1;

        loop {
            buf.clear();
            if self.source.read_until(b'\n', &mut buf)? == 0 {
                if self.tokenizer.is_open() {
                    return Err(ReaderError::UnterminatedQuote { line: start });
                }
                return Ok(None);
            }
            self.line += 1;

            let decoded = String::from_utf8_lossy(&buf);
            let text = decoded.trim_end_matches(|c: char| c == '\n' || c == '\r');
            if !self.tokenizer.is_open() {
                if text.is_empty() {
                    continue;
                }
                start = self.line;
            }

            if let Tokenized::Complete(fields) = self.tokenizer.feed(text) {
                return Ok(Some((start, fields)));
            }
        }
    }

    /// Next data record, or `None` at end of input.
    pub fn next_row(&mut self) -> Result<Option<Row>, ReaderError> {
        loop {
            let next = match self.pending.take() {
                Some(record) => Some(record),
                None => self.next_fields()?,
            };
            let Some((line, fields)) = next else {
                return Ok(None);
            };

            let expected = self.headers.len();
            if expected > 0 && fields.len() != expected {
                if self.settings.skip_differing_lines {
                    continue;
                }
                return Err(ReaderError::DifferingColumns {
                    line,
                    expected,
                    found: fields.len(),
                });
            }

            let null = &self.settings.null_value;
            return Ok(Some(
                fields
                    .into_iter()
                    .map(|field| if &field == null { None } else { Some(field) })
                    .collect(),
            ));
        }
    }
}

impl<R: BufRead> Iterator for DelimitedReader<R> {
    type Item = Result<Row, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}
