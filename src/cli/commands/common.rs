//! Argument groups and output helpers shared by the register commands

use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::entities::{Coordinates, MaintenanceStatus, TechnicalData};

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Record id or unique code
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Record id or unique code
    pub id: String,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Security password for protected deletions (prompted when omitted)
    #[arg(long, env = "EDILGEST_SECURITY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Deletion that only needs a confirmation
#[derive(clap::Args, Debug)]
pub struct ConfirmDeleteArgs {
    /// Record id or unique code
    pub id: String,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Sort/limit options of the register listings
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only records whose name or code contains this text
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Reverse sort order
    #[arg(long, short = 'r')]
    pub reverse: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

impl ListArgs {
    pub fn matches(&self, fields: &[&str]) -> bool {
        match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                fields.iter().any(|f| f.to_lowercase().contains(&term))
            }
            None => true,
        }
    }

    /// Apply reverse and limit to an already sorted listing
    pub fn finish<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if self.reverse {
            items.reverse();
        }
        if let Some(limit) = self.limit {
            items.truncate(limit);
        }
        items
    }
}

/// Map position; both coordinates or neither
#[derive(clap::Args, Debug, Default)]
pub struct LocationArgs {
    /// Latitude (decimal degrees)
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude (decimal degrees)
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,
}

impl LocationArgs {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }
}

/// Technical sheet fields for buildings and plessi
#[derive(clap::Args, Debug, Default)]
pub struct BuildingTechArgs {
    /// Gross surface area (m²)
    #[arg(long)]
    pub surface: Option<f64>,

    /// Volume (m³)
    #[arg(long)]
    pub volume: Option<f64>,

    /// Number of floors
    #[arg(long)]
    pub floors: Option<u32>,

    #[arg(long)]
    pub heating: Option<String>,

    #[arg(long)]
    pub electrical: Option<String>,

    #[arg(long)]
    pub water: Option<String>,

    /// Fire safety certificate status
    #[arg(long)]
    pub fire_safety: Option<String>,
}

impl BuildingTechArgs {
    fn is_empty(&self) -> bool {
        self.surface.is_none()
            && self.volume.is_none()
            && self.floors.is_none()
            && self.heating.is_none()
            && self.electrical.is_none()
            && self.water.is_none()
            && self.fire_safety.is_none()
    }

    /// Overlay the given fields on an existing sheet
    pub fn apply(self, current: Option<TechnicalData>) -> Option<TechnicalData> {
        if self.is_empty() {
            return current;
        }
        let mut data = current.unwrap_or_default();
        if self.surface.is_some() {
            data.surface_area = self.surface;
        }
        if self.volume.is_some() {
            data.volume = self.volume;
        }
        if self.floors.is_some() {
            data.floors = self.floors;
        }
        if self.heating.is_some() {
            data.heating_system = self.heating;
        }
        if self.electrical.is_some() {
            data.electrical_system = self.electrical;
        }
        if self.water.is_some() {
            data.water_system = self.water;
        }
        if self.fire_safety.is_some() {
            data.fire_safety_status = self.fire_safety;
        }
        Some(data)
    }
}

/// Technical sheet fields for roads
#[derive(clap::Args, Debug, Default)]
pub struct RoadTechArgs {
    /// Pavement type
    #[arg(long)]
    pub pavement: Option<String>,

    /// Average carriageway width (m)
    #[arg(long)]
    pub width: Option<f64>,

    /// Surface condition (ottimo, buono, sufficiente, degradato)
    #[arg(long)]
    pub condition: Option<MaintenanceStatus>,
}

impl RoadTechArgs {
    /// Overlay on an existing sheet, re-deriving the surface from the length
    pub fn apply(self, current: Option<TechnicalData>, length_km: f64) -> Option<TechnicalData> {
        if self.pavement.is_none() && self.width.is_none() && self.condition.is_none() {
            return current;
        }
        let current = current.unwrap_or_default();
        let mut data = TechnicalData::for_road(
            self.pavement.or(current.pavement_type),
            self.width.or(current.average_width),
            self.condition.or(current.maintenance_status),
            length_km,
        );
        data.floor_plans = current.floor_plans;
        Some(data)
    }
}

/// Print a single record as JSON or YAML
///
/// Returns `false` for the other formats so the caller renders its own view.
pub fn print_structured<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
            Ok(true)
        }
        OutputFormat::Yaml | OutputFormat::Auto => {
            print!("{}", serde_yml::to_string(value).into_diagnostic()?);
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Print a listing as JSON or YAML; `false` for the tabular formats
pub fn print_structured_list<T: Serialize>(items: &[T], format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).into_diagnostic()?);
            Ok(true)
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(items).into_diagnostic()?);
            Ok(true)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_building_tech_overlay_keeps_unset_fields() {
        let current = TechnicalData {
            floors: Some(3),
            heating_system: Some("Caldaia a condensazione".into()),
            ..Default::default()
        };
        let args = BuildingTechArgs {
            floors: Some(4),
            ..Default::default()
        };
        let data = args.apply(Some(current)).unwrap();
        assert_eq!(data.floors, Some(4));
        assert_eq!(data.heating_system.as_deref(), Some("Caldaia a condensazione"));

        assert_eq!(BuildingTechArgs::default().apply(None), None);
    }

    #[test]
    fn test_road_tech_overlay_rederives_surface() {
        let args = RoadTechArgs {
            width: Some(7.0),
            ..Default::default()
        };
        let data = args.apply(None, 2.0).unwrap();
        assert_eq!(data.surface_area, Some(14000.0));
    }

    #[test]
    fn test_list_args_search_and_limit() {
        let args = ListArgs {
            search: Some("MARCONI".into()),
            reverse: true,
            limit: Some(2),
            count: false,
        };
        assert!(args.matches(&["Liceo Marconi", "IMM_000101"]));
        assert!(!args.matches(&["Sede"]));
        assert_eq!(args.finish(vec![1, 2, 3]), vec![3, 2]);
    }
}
