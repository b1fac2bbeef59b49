//! Plesso (sub-unit) and pertinenza entity types

use serde::{Deserialize, Serialize};

use crate::core::code::CodePrefix;
use crate::core::entity::{Coded, Entity, Renamable};
use crate::core::identity::{EntityId, EntityKind};
use crate::entities::technical::TechnicalData;

/// A named unit inside a structure (wing, annex, gym, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plesso {
    pub id: EntityId,

    /// Back-reference to the owning structure
    pub structure_id: EntityId,

    /// Human unique code (`PLX_NNNNNN`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_code: Option<String>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_names: Vec<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_center: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_data: Option<TechnicalData>,

    #[serde(default)]
    pub pertinenze: Vec<Pertinenza>,
}

impl Plesso {
    pub fn new(structure_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(EntityKind::Plesso),
            structure_id,
            unique_code: None,
            name: name.into(),
            previous_names: Vec::new(),
            description: String::new(),
            cost_center: None,
            technical_data: None,
            pertinenze: Vec::new(),
        }
    }
}

impl Entity for Plesso {
    const LABEL: &'static str = "Plesso";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

impl Coded for Plesso {
    const CODE_PREFIX: CodePrefix = CodePrefix::Plx;

    fn unique_code(&self) -> Option<&str> {
        self.unique_code.as_deref()
    }

    fn set_unique_code(&mut self, code: String) {
        self.unique_code = Some(code);
    }
}

impl Renamable for Plesso {
    fn name(&self) -> &str {
        &self.name
    }

    fn previous_names(&self) -> &[String] {
        &self.previous_names
    }

    fn previous_names_mut(&mut self) -> &mut Vec<String> {
        &mut self.previous_names
    }
}

/// Minor sub-asset of a plesso; leaf of the hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pertinenza {
    pub id: EntityId,

    pub plesso_id: EntityId,

    pub name: String,

    #[serde(default)]
    pub description: String,
}

impl Pertinenza {
    pub fn new(plesso_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(EntityKind::Pertinenza),
            plesso_id,
            name: name.into(),
            description: String::new(),
        }
    }
}

impl Entity for Pertinenza {
    const LABEL: &'static str = "Pertinenza";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}
