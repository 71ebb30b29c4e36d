//! Algorithm and engine artifacts, and the capability tag registry.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::{Entity, EntityKind, FieldValue};

/// Which managed directory an artifact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Profiling algorithm.
    Algorithm,
    /// Profiling query engine.
    Engine,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [Self::Algorithm, Self::Engine];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Algorithm => "algorithm",
            Self::Engine => "engine",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "algorithm" | "algorithms" => Ok(Self::Algorithm),
            "engine" | "engines" => Ok(Self::Engine),
            other => Err(format!("unknown artifact kind '{}'", other)),
        }
    }
}

/// A declared profiling-task category.
///
/// The set is closed: listing filters by membership in an artifact's tag
/// set and never inspects the artifact itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    UniqueColumnCombination,
    ConditionalUniqueColumnCombination,
    InclusionDependency,
    ConditionalInclusionDependency,
    FunctionalDependency,
    ConditionalFunctionalDependency,
    OrderDependency,
    MultivaluedDependency,
    MatchingDependency,
    BasicStatistics,
    DenialConstraint,
    FileInput,
    TableInput,
    RelationalInput,
    DatabaseConnection,
}

/// Tag that is not in the capability registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown capability tag '{0}'")]
pub struct UnknownCapability(pub String);

impl Capability {
    pub const ALL: [Capability; 15] = [
        Self::UniqueColumnCombination,
        Self::ConditionalUniqueColumnCombination,
        Self::InclusionDependency,
        Self::ConditionalInclusionDependency,
        Self::FunctionalDependency,
        Self::ConditionalFunctionalDependency,
        Self::OrderDependency,
        Self::MultivaluedDependency,
        Self::MatchingDependency,
        Self::BasicStatistics,
        Self::DenialConstraint,
        Self::FileInput,
        Self::TableInput,
        Self::RelationalInput,
        Self::DatabaseConnection,
    ];

    /// Short key, also the field name used in catalog predicates.
    pub fn key(&self) -> &'static str {
        match self {
            Self::UniqueColumnCombination => "ucc",
            Self::ConditionalUniqueColumnCombination => "cucc",
            Self::InclusionDependency => "ind",
            Self::ConditionalInclusionDependency => "cid",
            Self::FunctionalDependency => "fd",
            Self::ConditionalFunctionalDependency => "cfd",
            Self::OrderDependency => "od",
            Self::MultivaluedDependency => "mvd",
            Self::MatchingDependency => "md",
            Self::BasicStatistics => "basic_stat",
            Self::DenialConstraint => "dc",
            Self::FileInput => "file_input",
            Self::TableInput => "table_input",
            Self::RelationalInput => "relational_input",
            Self::DatabaseConnection => "database_connection",
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            Self::UniqueColumnCombination => "unique_column_combination",
            Self::ConditionalUniqueColumnCombination => "conditional_unique_column_combination",
            Self::InclusionDependency => "inclusion_dependency",
            Self::ConditionalInclusionDependency => "conditional_inclusion_dependency",
            Self::FunctionalDependency => "functional_dependency",
            Self::ConditionalFunctionalDependency => "conditional_functional_dependency",
            Self::OrderDependency => "order_dependency",
            Self::MultivaluedDependency => "multivalued_dependency",
            Self::MatchingDependency => "matching_dependency",
            Self::BasicStatistics => "basic_statistics",
            Self::DenialConstraint => "denial_constraint",
            Self::FileInput => "file_input",
            Self::TableInput => "table_input",
            Self::RelationalInput => "relational_input",
            Self::DatabaseConnection => "database_connection",
        }
    }

    /// Whether the capability names a result-producing task rather than an
    /// accepted input kind.
    pub fn has_result(&self) -> bool {
        !matches!(
            self,
            Self::FileInput | Self::TableInput | Self::RelationalInput | Self::DatabaseConnection
        )
    }

    /// Parses a declared tag: the short key, the snake_case name, or the
    /// CamelCase name, case-insensitively.
    pub fn parse(tag: &str) -> Result<Self, UnknownCapability> {
        let folded: String = tag
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        Self::ALL
            .iter()
            .copied()
            .find(|cap| {
                let key = cap.key().replace('_', "");
                let name = cap.variant_name().replace('_', "");
                folded == key || folded == name
            })
            .ok_or_else(|| UnknownCapability(tag.to_string()))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A registered algorithm or engine.
///
/// `file_name` is the natural key and never changes once stored; `id` is a
/// surrogate assigned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub kind: ArtifactKind,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_version: Option<String>,
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, file_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            kind,
            file_name: file_name.into(),
            name: None,
            author: None,
            description: None,
            implementation_title: None,
            implementation_version: None,
            capabilities: BTreeSet::new(),
            registered_at: now,
            updated_at: now,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_implementation(mut self, title: Option<String>, version: Option<String>) -> Self {
        self.implementation_title = title;
        self.implementation_version = version;
        self
    }

    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    /// This value re-anchored onto an already stored record: the stored id,
    /// file name and registration time are kept, everything else comes from
    /// `self`.
    pub fn replacing(mut self, stored: &Artifact) -> Self {
        self.id = stored.id;
        self.kind = stored.kind;
        self.file_name = stored.file_name.clone();
        self.registered_at = stored.registered_at;
        self.updated_at = Utc::now();
        self
    }

    /// Whether the introspected fields of two values agree.
    pub fn same_metadata(&self, other: &Artifact) -> bool {
        self.name == other.name
            && self.author == other.author
            && self.description == other.description
            && self.implementation_title == other.implementation_title
            && self.implementation_version == other.implementation_version
            && self.capabilities == other.capabilities
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.file_name)
    }

    /// Natural key for a kind/file name pair.
    pub fn key_for(kind: ArtifactKind, file_name: &str) -> String {
        format!("{}:{}", kind, file_name)
    }
}

impl Entity for Artifact {
    const KIND: EntityKind = EntityKind::Artifact;

    fn id(&self) -> Option<u64> {
        self.id
    }

    fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    fn natural_key(&self) -> Option<String> {
        Some(Self::key_for(self.kind, &self.file_name))
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => self.id.into(),
            "kind" => self.kind.as_str().into(),
            "file_name" => self.file_name.as_str().into(),
            "name" => self.name.clone().into(),
            "author" => self.author.clone().into(),
            "description" => self.description.clone().into(),
            "implementation_title" => self.implementation_title.clone().into(),
            "implementation_version" => self.implementation_version.clone().into(),
            other => {
                let capability = Capability::ALL.iter().find(|c| c.key() == other)?;
                self.has_capability(*capability).into()
            }
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_keys_and_names() {
        assert_eq!(Capability::parse("fd").unwrap(), Capability::FunctionalDependency);
        assert_eq!(
            Capability::parse("FunctionalDependency").unwrap(),
            Capability::FunctionalDependency
        );
        assert_eq!(
            Capability::parse("conditional_inclusion_dependency").unwrap(),
            Capability::ConditionalInclusionDependency
        );
        assert_eq!(Capability::parse(" BASIC_STAT ").unwrap(), Capability::BasicStatistics);
        assert_eq!(Capability::parse("basic-statistics").unwrap(), Capability::BasicStatistics);
    }

    #[test]
    fn parse_rejects_unknown_tags() {
        let err = Capability::parse("holistic").unwrap_err();
        assert_eq!(err, UnknownCapability("holistic".to_string()));
    }

    #[test]
    fn keys_are_unique() {
        let keys: BTreeSet<_> = Capability::ALL.iter().map(|c| c.key()).collect();
        assert_eq!(keys.len(), Capability::ALL.len());
    }

    #[test]
    fn input_kinds_do_not_produce_results() {
        assert!(Capability::DenialConstraint.has_result());
        assert!(!Capability::RelationalInput.has_result());
    }

    #[test]
    fn capability_fields_report_membership() {
        let artifact = Artifact::new(ArtifactKind::Algorithm, "hyfd.jar")
            .with_capabilities([Capability::FunctionalDependency]);

        assert_eq!(artifact.field("fd"), Some(FieldValue::Flag(true)));
        assert_eq!(artifact.field("ucc"), Some(FieldValue::Flag(false)));
        assert_eq!(artifact.field("no_such_field"), None);
        assert_eq!(
            artifact.field("file_name"),
            Some(FieldValue::Text("hyfd.jar".into()))
        );
    }

    #[test]
    fn replacing_keeps_the_stored_anchor() {
        let stored = Artifact::new(ArtifactKind::Engine, "engine.jar").with_id(7);
        let fresh = Artifact::new(ArtifactKind::Engine, "other.jar")
            .with_name(Some("Fast Engine".into()));

        let merged = fresh.replacing(&stored);
        assert_eq!(merged.id, Some(7));
        assert_eq!(merged.file_name, "engine.jar");
        assert_eq!(merged.registered_at, stored.registered_at);
        assert_eq!(merged.display_name(), "Fast Engine");
    }

    #[test]
    fn kind_parses_plural_forms() {
        assert_eq!("Engines".parse::<ArtifactKind>().unwrap(), ArtifactKind::Engine);
        assert!("plugin".parse::<ArtifactKind>().is_err());
    }
}
