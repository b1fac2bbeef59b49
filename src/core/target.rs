//! Intervention targets
//!
//! Interventions point at exactly one asset. The stored form is the pair
//! (`targetId`, `targetType`); [`ResolvedTarget`] is what a lookup against
//! the current state produces, with dangling references made explicit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::identity::EntityId;
use crate::entities::{Pertinenza, Plesso, Road, Structure};

/// Kind of asset an intervention points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Structure,
    Plesso,
    Pertinenza,
    Road,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Structure => "structure",
            TargetType::Plesso => "plesso",
            TargetType::Pertinenza => "pertinenza",
            TargetType::Road => "road",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "structure" | "building" | "immobile" => Ok(TargetType::Structure),
            "plesso" => Ok(TargetType::Plesso),
            "pertinenza" => Ok(TargetType::Pertinenza),
            "road" | "strada" => Ok(TargetType::Road),
            _ => Err(format!(
                "Unknown target type: '{}'. Use structure, plesso, pertinenza or road",
                s
            )),
        }
    }
}

/// Stored reference from an intervention to its asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    #[serde(rename = "targetId")]
    pub id: EntityId,

    #[serde(rename = "targetType")]
    pub kind: TargetType,
}

impl TargetRef {
    pub fn new(id: impl Into<EntityId>, kind: TargetType) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Result of resolving a [`TargetRef`] against the state
#[derive(Debug, Clone, Copy)]
pub enum ResolvedTarget<'a> {
    Structure(&'a Structure),
    Plesso {
        structure: &'a Structure,
        plesso: &'a Plesso,
    },
    Pertinenza {
        structure: &'a Structure,
        plesso: &'a Plesso,
        pertinenza: &'a Pertinenza,
    },
    Road(&'a Road),
    /// The referenced asset no longer exists
    Unresolved(&'a TargetRef),
}

impl<'a> ResolvedTarget<'a> {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, ResolvedTarget::Unresolved(_))
    }

    /// Human label of the asset, or an "N/D" placeholder when dangling
    pub fn label(&self) -> String {
        match self {
            ResolvedTarget::Structure(s) => s.name.clone(),
            ResolvedTarget::Plesso { structure, plesso } => {
                format!("{} > {}", structure.name, plesso.name)
            }
            ResolvedTarget::Pertinenza {
                structure,
                plesso,
                pertinenza,
            } => format!("{} > {} > {}", structure.name, plesso.name, pertinenza.name),
            ResolvedTarget::Road(r) => r.label(),
            ResolvedTarget::Unresolved(target) => match target.kind {
                TargetType::Road => "Strada N/D".to_string(),
                _ => "Target N/D".to_string(),
            },
        }
    }

    /// Unique code of the asset; pertinenze carry none and use their plesso's
    pub fn unique_code(&self) -> Option<&'a str> {
        match self {
            ResolvedTarget::Structure(s) => s.unique_code.as_deref(),
            ResolvedTarget::Plesso { plesso, .. } => plesso.unique_code.as_deref(),
            ResolvedTarget::Pertinenza { plesso, .. } => plesso.unique_code.as_deref(),
            ResolvedTarget::Road(r) => r.unique_code.as_deref(),
            ResolvedTarget::Unresolved(_) => None,
        }
    }

    /// Cost center of the asset, inherited from the structure when unset
    pub fn cost_center(&self) -> Option<&'a str> {
        match self {
            ResolvedTarget::Structure(s) => s.cost_center.as_deref(),
            ResolvedTarget::Plesso { structure, plesso }
            | ResolvedTarget::Pertinenza {
                structure, plesso, ..
            } => plesso
                .cost_center
                .as_deref()
                .or(structure.cost_center.as_deref()),
            ResolvedTarget::Road(r) => r.cost_center.as_deref(),
            ResolvedTarget::Unresolved(_) => None,
        }
    }
}
