//! Bounded previews of registered data inputs.

use registry_catalog::{Catalog, ParseSettings, RegisteredInput};
use registry_reader::{DelimitedReader, ReaderSettings, Row};
use serde::Serialize;

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::path::PathResolver;

/// Header plus the first rows of an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    /// Number of rows returned.
    pub line_count: usize,
}

/// Reader settings equivalent to a record's parse settings.
pub fn reader_settings(settings: &ParseSettings) -> ReaderSettings {
    ReaderSettings {
        separator: settings.separator,
        quote_char: settings.quote_char,
        escape_char: settings.escape_char,
        has_header: settings.has_header,
        skip_lines: settings.skip_lines,
        null_value: settings.null_value.clone(),
        strict_quotes: settings.strict_quotes,
        ignore_leading_whitespace: settings.ignore_leading_whitespace,
        skip_differing_lines: settings.skip_differing_lines,
    }
}

pub struct PreviewReader<'a, C> {
    catalog: &'a C,
    resolver: &'a PathResolver,
    config: &'a RegistryConfig,
}

impl<'a, C: Catalog> PreviewReader<'a, C> {
    pub fn new(catalog: &'a C, resolver: &'a PathResolver, config: &'a RegistryConfig) -> Self {
        Self {
            catalog,
            resolver,
            config,
        }
    }

    /// Up to `max_lines` rows of input `id`; zero means the configured default.
    pub fn preview(&self, id: u64, max_lines: usize) -> Result<Preview, RegistryError> {
        let input = self
            .catalog
            .retrieve::<RegisteredInput>(id)?
            .ok_or_else(|| RegistryError::not_found("input", id))?;

        let path = self
            .resolver
            .locate_stored(&input.file_name, &self.config.directories.inputs)
            .ok_or_else(|| RegistryError::not_found("file", &input.file_name))?;

        let limit = if max_lines == 0 {
            self.config.preview.default_rows
        } else {
            max_lines
        };

        let read_error = |source| RegistryError::Read {
            path: path.clone(),
            source,
        };

        let mut reader =
            DelimitedReader::open(&path, reader_settings(&input.settings)).map_err(read_error)?;
        let headers = reader.column_names().to_vec();
        let rows = reader
            .by_ref()
            .take(limit)
            .collect::<Result<Vec<Row>, _>>()
            .map_err(read_error)?;
        drop(reader);

        tracing::debug!(id, path = %path.display(), rows = rows.len(), "previewed input");
        Ok(Preview {
            headers,
            line_count: rows.len(),
            rows,
        })
    }
}
