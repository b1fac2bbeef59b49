//! Structure (immobile) entity type

use serde::{Deserialize, Serialize};

use crate::core::code::CodePrefix;
use crate::core::entity::{Coded, Entity, Renamable};
use crate::core::identity::{EntityId, EntityKind};
use crate::entities::plesso::Plesso;
use crate::entities::technical::{Coordinates, TechnicalData};

/// A building, the top-level physical asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Structure {
    pub id: EntityId,

    /// Human unique code (`IMM_NNNNNN`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_code: Option<String>,

    pub name: String,

    /// Superseded names, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_names: Vec<String>,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_center: Option<String>,

    #[serde(flatten)]
    pub location: Option<Coordinates>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_data: Option<TechnicalData>,

    /// Owned sub-units, in insertion order
    #[serde(default)]
    pub plessi: Vec<Plesso>,
}

impl Structure {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: EntityId::generate(EntityKind::Structure),
            unique_code: None,
            name: name.into(),
            previous_names: Vec::new(),
            address: address.into(),
            description: String::new(),
            cost_center: None,
            location: None,
            technical_data: None,
            plessi: Vec::new(),
        }
    }

    pub fn find_plesso(&self, id: &EntityId) -> Option<&Plesso> {
        self.plessi.iter().find(|p| &p.id == id)
    }
}

impl Entity for Structure {
    const LABEL: &'static str = "Immobile";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

impl Coded for Structure {
    const CODE_PREFIX: CodePrefix = CodePrefix::Imm;

    fn unique_code(&self) -> Option<&str> {
        self.unique_code.as_deref()
    }

    fn set_unique_code(&mut self, code: String) {
        self.unique_code = Some(code);
    }
}

impl Renamable for Structure {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_stored_snapshot_shape() {
        let json = r#"{
            "id": "struct-provincia-sede",
            "name": "Sede Istituzionale Provincia",
            "uniqueCode": "IMM_000105",
            "costCenter": "AMMIN_CENTRALE",
            "address": "Piazza Roma 1, Carbonia",
            "description": "Uffici amministrativi centrali dell'ente.",
            "lat": 39.1633,
            "lng": 8.5222,
            "plessi": []
        }"#;
        let s: Structure = serde_json::from_str(json).unwrap();
        assert_eq!(s.unique_code.as_deref(), Some("IMM_000105"));
        assert_eq!(s.location, Some(Coordinates::new(39.1633, 8.5222)));
        assert!(s.previous_names.is_empty());
    }

    #[test]
    fn test_missing_coordinates_read_as_none() {
        let json = r#"{"id":"s1","name":"Magazzino","plessi":[]}"#;
        let s: Structure = serde_json::from_str(json).unwrap();
        assert_eq!(s.location, None);
        let back = serde_json::to_string(&s).unwrap();
        assert!(!back.contains("lat"));
    }
}
