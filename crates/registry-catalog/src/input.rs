//! Registered data inputs and their parse settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityKind, FieldValue};

/// How a delimited input file is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseSettings {
    pub separator: char,
    /// `None` disables quoting.
    pub quote_char: Option<char>,
    /// `None` disables escaping.
    pub escape_char: Option<char>,
    pub has_header: bool,
    pub skip_lines: usize,
    pub null_value: String,
    pub strict_quotes: bool,
    pub ignore_leading_whitespace: bool,
    pub skip_differing_lines: bool,
}

impl Default for ParseSettings {
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

/// A data input known to the catalog.
///
/// `file_name` holds the canonical path when the file could be resolved at
/// registration time, otherwise the string the caller supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub settings: ParseSettings,
    pub registered_at: DateTime<Utc>,
}

impl RegisteredInput {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            id: None,
            file_name: file_name.into(),
            name: None,
            settings: ParseSettings::default(),
            registered_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_settings(mut self, settings: ParseSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// This value re-anchored onto a stored record (id and registration time).
    pub fn replacing(mut self, stored: &RegisteredInput) -> Self {
        self.id = stored.id;
        self.registered_at = stored.registered_at;
        self
    }
}

impl Entity for RegisteredInput {
    const KIND: EntityKind = EntityKind::Input;

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    fn natural_key(&self) -> Option<String> {
        Some(self.file_name.clone())
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => self.id.into(),
            "file_name" => self.file_name.as_str().into(),
            "name" => self.name.clone().into(),
            "has_header" => self.settings.has_header.into(),
            _ => return None,
        };
        Some(value)
    }
}
