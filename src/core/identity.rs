//! Record identity: opaque, kind-prefixed identifiers
//!
//! Identifiers are opaque strings. Newly generated ones carry a lowercase
//! kind slug and a ULID (`struct-01j9...`), but ids read back from storage
//! or imported by hand are accepted verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Kinds of records that receive generated identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Building (immobile)
    Structure,
    /// Unit inside a building
    Plesso,
    /// Minor sub-asset of a plesso
    Pertinenza,
    /// Provincial road
    Road,
    /// Maintenance / works contract
    Intervention,
    /// Application user
    User,
    /// Audit log row
    Audit,
    /// Nested record (suspension, extension, RUP assignment, floor plan)
    Record,
}

impl EntityKind {
    /// Lowercase slug used as id prefix
    pub fn slug(&self) -> &'static str {
        match self {
            EntityKind::Structure => "struct",
            EntityKind::Plesso => "plesso",
            EntityKind::Pertinenza => "pert",
            EntityKind::Road => "road",
            EntityKind::Intervention => "int",
            EntityKind::User => "user",
            EntityKind::Audit => "log",
            EntityKind::Record => "rec",
        }
    }

    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Structure,
            EntityKind::Plesso,
            EntityKind::Pertinenza,
            EntityKind::Road,
            EntityKind::Intervention,
            EntityKind::User,
            EntityKind::Audit,
            EntityKind::Record,
        ]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for EntityKind {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::all()
            .iter()
            .find(|k| k.slug() == s.to_lowercase())
            .copied()
            .ok_or_else(|| IdParseError::UnknownKind(s.to_string()))
    }
}

/// An opaque record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Generate a fresh identifier for the given kind
    pub fn generate(kind: EntityKind) -> Self {
        Self(format!(
            "{}-{}",
            kind.slug(),
            Ulid::new().to_string().to_lowercase()
        ))
    }

    /// Wrap an existing identifier string
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Kind encoded in a generated id, if any
    pub fn kind(&self) -> Option<EntityKind> {
        self.0
            .split_once('-')
            .and_then(|(slug, _)| slug.parse().ok())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IdParseError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for EntityId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for EntityId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("identifier must not be empty")]
    Empty,

    #[error("unknown record kind: {0}")]
    UnknownKind(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_carries_kind() {
        let id = EntityId::generate(EntityKind::Road);
        assert!(id.as_str().starts_with("road-"));
        assert_eq!(id.kind(), Some(EntityKind::Road));
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = EntityId::generate(EntityKind::Structure);
        let b = EntityId::generate(EntityKind::Structure);
        assert_ne!(a, b);
    }

    #[test]
    fn test_raw_ids_are_opaque() {
        let id = EntityId::from_raw("admin-001");
        assert_eq!(id.kind(), None);
        assert_eq!(id.to_string(), "admin-001");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert_eq!("  ".parse::<EntityId>(), Err(IdParseError::Empty));
        assert_eq!(
            " int-abc ".parse::<EntityId>().unwrap().as_str(),
            "int-abc"
        );
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = EntityId::from_raw("struct-scuola-marconi");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"struct-scuola-marconi\"");
    }
}
