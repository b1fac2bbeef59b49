//! Record type definitions
//!
//! **Asset hierarchy:**
//! - [`Structure`] - Buildings, each owning its [`Plesso`] sub-units
//! - [`Plesso`] - Units inside a building, each owning [`Pertinenza`] leaves
//! - [`Road`] - Provincial roads, independent of the building hierarchy
//!
//! **Works:**
//! - [`Intervention`] - Maintenance/works contracts tied to one target asset
//!
//! **Administration:**
//! - [`User`] - Accounts with a role and accessible sections
//! - [`settings`] - Notification, scheduled export, security and manual records

pub mod intervention;
pub mod plesso;
pub mod road;
pub mod settings;
pub mod structure;
pub mod technical;
pub mod user;

pub use intervention::{Extension, Intervention, InterventionType, RupAssignment, Suspension};
pub use plesso::{Pertinenza, Plesso};
pub use road::Road;
pub use settings::{
    ExportFrequency, ManualEntry, NotificationSettings, ScheduledExportConfig, SecurityPolicy,
};
pub use structure::Structure;
pub use technical::{Coordinates, FloorPlan, MaintenanceStatus, TechnicalData};
pub use user::{Role, Section, User};

use serde::{Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;

/// Read an optional value stored as a string, treating `""` as absent
///
/// Stored snapshots contain empty strings for dates and selects that were
/// never filled in.
pub(crate) fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        Some(s) if !s.trim().is_empty() => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}
