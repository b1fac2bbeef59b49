//! Road entity type

use serde::{Deserialize, Serialize};

use crate::core::code::CodePrefix;
use crate::core::entity::{Coded, Entity};
use crate::core::identity::{EntityId, EntityKind};
use crate::entities::technical::{Coordinates, TechnicalData};

/// A provincial road
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Road {
    pub id: EntityId,

    /// Route code, e.g. "SP 2"
    pub code: String,

    /// Human unique code (`STR_NNNNNN`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_center: Option<String>,

    pub name: String,

    #[serde(default)]
    pub length_km: f64,

    #[serde(default)]
    pub description: String,

    #[serde(flatten)]
    pub location: Option<Coordinates>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_data: Option<TechnicalData>,
}

impl Road {
    pub fn new(code: impl Into<String>, name: impl Into<String>, length_km: f64) -> Self {
        Self {
            id: EntityId::generate(EntityKind::Road),
            code: code.into(),
            unique_code: None,
            cost_center: None,
            name: name.into(),
            length_km,
            description: String::new(),
            location: None,
            technical_data: None,
        }
    }

    /// "SP 2 - Villaspeciosa - Siliqua"
    pub fn label(&self) -> String {
        format!("{} - {}", self.code, self.name)
    }
}

impl Entity for Road {
    const LABEL: &'static str = "Strada";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> String {
        self.code.clone()
    }
}

impl Coded for Road {
    const CODE_PREFIX: CodePrefix = CodePrefix::Str;

    fn unique_code(&self) -> Option<&str> {
        self.unique_code.as_deref()
    }

    fn set_unique_code(&mut self, code: String) {
        self.unique_code = Some(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_joins_code_and_name() {
        let road = Road::new("SP 15", "Tratto Carbonia - Villamassargia", 12.8);
        assert_eq!(road.label(), "SP 15 - Tratto Carbonia - Villamassargia");
        assert_eq!(road.display_name(), "SP 15");
    }
}
