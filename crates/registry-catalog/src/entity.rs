//! Entity contract and query predicates.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Table an entity lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Artifact,
    Input,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Artifact => write!(f, "artifact"),
            Self::Input => write!(f, "input"),
        }
    }
}

/// A value a named field can be compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Number(u64),
    Flag(bool),
    Null,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Named-field equality filter. A query ANDs all of its predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: String,
    pub value: FieldValue,
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// A field the entity does not know never matches.
    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        entity
            .field(&self.field)
            .is_some_and(|value| value == self.value)
    }
}

/// A value the catalog can persist.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send {
    /// Table this entity is stored in.
    const KIND: EntityKind;

    /// Surrogate id, `None` until the value has been stored.
    fn id(&self) -> Option<u64>;

    /// Returns the same value carrying `id`.
    fn with_id(self, id: u64) -> Self;

    /// Natural key the store keeps unique within [`Self::KIND`].
    fn natural_key(&self) -> Option<String>;

    /// Looks up a field by name for predicate evaluation.
    fn field(&self, name: &str) -> Option<FieldValue>;
}
