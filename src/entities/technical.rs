//! Technical data sheet and geographic position shared by asset types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::identity::EntityId;

/// Geographic position written back by the map / geocoding collaborators
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}

/// Surveyed condition of a road surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceStatus {
    Ottimo,
    Buono,
    Sufficiente,
    Degradato,
}

impl fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaintenanceStatus::Ottimo => write!(f, "ottimo"),
            MaintenanceStatus::Buono => write!(f, "buono"),
            MaintenanceStatus::Sufficiente => write!(f, "sufficiente"),
            MaintenanceStatus::Degradato => write!(f, "degradato"),
        }
    }
}

impl FromStr for MaintenanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ottimo" => Ok(MaintenanceStatus::Ottimo),
            "buono" => Ok(MaintenanceStatus::Buono),
            "sufficiente" => Ok(MaintenanceStatus::Sufficiente),
            "degradato" => Ok(MaintenanceStatus::Degradato),
            _ => Err(format!("Unknown maintenance status: {}", s)),
        }
    }
}

/// An attached floor plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorPlan {
    pub id: EntityId,
    pub name: String,
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Technical data block (buildings, plessi and roads use different subsets)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_area: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floors: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heating_system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electrical_system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fire_safety_status: Option<String>,

    /// Road only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pavement_type: Option<String>,

    /// Road only, meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_width: Option<f64>,

    /// Road only
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::blank_as_none"
    )]
    pub maintenance_status: Option<MaintenanceStatus>,

    #[serde(default)]
    pub floor_plans: Vec<FloorPlan>,
}

impl TechnicalData {
    /// Road sheet with surface derived from length and average width
    pub fn for_road(
        pavement_type: Option<String>,
        average_width: Option<f64>,
        maintenance_status: Option<MaintenanceStatus>,
        length_km: f64,
    ) -> Self {
        let surface_area = average_width.map(|w| (w * length_km * 1000.0).round());
        Self {
            pavement_type,
            average_width,
            maintenance_status,
            surface_area,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_maintenance_status_reads_as_none() {
        let data: TechnicalData =
            serde_json::from_str(r#"{"maintenanceStatus":"","floorPlans":[]}"#).unwrap();
        assert_eq!(data.maintenance_status, None);
    }

    #[test]
    fn test_road_surface_is_derived() {
        let data = TechnicalData::for_road(
            Some("Asfalto drenante".into()),
            Some(8.5),
            Some(MaintenanceStatus::Buono),
            24.5,
        );
        assert_eq!(data.surface_area, Some(208250.0));
    }

    #[test]
    fn test_status_parses_case_insensitive() {
        assert_eq!("Degradato".parse(), Ok(MaintenanceStatus::Degradato));
        assert!("rotto".parse::<MaintenanceStatus>().is_err());
    }
}
