//! Technical registry - one listing over buildings, plessi and roads
//!
//! Buildings and their plessi form one category, roads the other. Each row
//! carries the asset's technical sheet so the registry can be read without
//! opening every record.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::core::entity::former_names;
use crate::core::identity::EntityId;
use crate::core::state::AppState;
use crate::entities::{MaintenanceStatus, TechnicalData};

/// Which half of the registry to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistryCategory {
    #[default]
    Buildings,
    Roads,
}

/// Kind of a registry row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Structure,
    Plesso,
    Road,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Structure => write!(f, "Fabbricato"),
            AssetKind::Plesso => write!(f, "Unità"),
            AssetKind::Road => write!(f, "Strada"),
        }
    }
}

/// One asset as shown in the registry
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryAsset {
    pub id: EntityId,
    pub kind: AssetKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_code: Option<String>,
    /// Route code, roads only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_code: Option<String>,
    /// Building name, plessi only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_center: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub previous_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_data: Option<TechnicalData>,
    pub interventions: usize,
}

impl RegistryAsset {
    pub fn maintenance_status(&self) -> Option<MaintenanceStatus> {
        self.technical_data.as_ref().and_then(|t| t.maintenance_status)
    }

    pub fn surface_area(&self) -> Option<f64> {
        self.technical_data.as_ref().and_then(|t| t.surface_area)
    }

    /// Second line of a listing: parent building, else address or route code
    pub fn context(&self) -> Option<&str> {
        self.parent_name
            .as_deref()
            .or(self.address.as_deref())
            .or(self.route_code.as_deref())
    }

    fn matches_text(&self, needle: &str) -> bool {
        let hit = |text: Option<&str>| text.map_or(false, |t| t.to_lowercase().contains(needle));
        hit(Some(self.name.as_str()))
            || hit(self.address.as_deref())
            || hit(self.unique_code.as_deref())
            || hit(self.parent_name.as_deref())
            || hit(self.route_code.as_deref())
    }
}

/// Registry filters; `None` means "all"
#[derive(Debug, Clone, Default)]
pub struct RegistryFilter {
    pub category: RegistryCategory,
    /// Free text over name, address, codes and parent building
    pub text: Option<String>,
    pub cost_center: Option<String>,
    /// Structure or plesso; only meaningful for buildings
    pub kind: Option<AssetKind>,
    /// Surveyed road condition; rows without one never match
    pub road_status: Option<MaintenanceStatus>,
}

impl RegistryFilter {
    pub fn apply(&self, state: &AppState) -> Vec<RegistryAsset> {
        let needle = self
            .text
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());

        assets(state, self.category)
            .into_iter()
            .filter(|a| needle.as_deref().map_or(true, |n| a.matches_text(n)))
            .filter(|a| {
                self.cost_center
                    .as_deref()
                    .map_or(true, |cc| a.cost_center.as_deref() == Some(cc))
            })
            .filter(|a| self.kind.map_or(true, |k| a.kind == k))
            .filter(|a| {
                self.road_status.map_or(true, |status| {
                    a.kind == AssetKind::Road && a.maintenance_status() == Some(status)
                })
            })
            .collect()
    }
}

/// Every asset of a category, buildings each followed by their plessi
pub fn assets(state: &AppState, category: RegistryCategory) -> Vec<RegistryAsset> {
    let works = |id: &EntityId| state.interventions_for(id).count();
    match category {
        RegistryCategory::Buildings => {
            let mut rows = Vec::new();
            for s in &state.structures {
                rows.push(RegistryAsset {
                    id: s.id.clone(),
                    kind: AssetKind::Structure,
                    name: s.name.clone(),
                    unique_code: s.unique_code.clone(),
                    route_code: None,
                    parent_name: None,
                    address: Some(s.address.clone()).filter(|a| !a.trim().is_empty()),
                    cost_center: s.cost_center.clone(),
                    previous_names: owned(former_names(s)),
                    technical_data: s.technical_data.clone(),
                    interventions: works(&s.id),
                });
                for p in &s.plessi {
                    rows.push(RegistryAsset {
                        id: p.id.clone(),
                        kind: AssetKind::Plesso,
                        name: p.name.clone(),
                        unique_code: p.unique_code.clone(),
                        route_code: None,
                        parent_name: Some(s.name.clone()),
                        address: Some(s.address.clone()).filter(|a| !a.trim().is_empty()),
                        cost_center: p.cost_center.clone(),
                        previous_names: owned(former_names(p)),
                        technical_data: p.technical_data.clone(),
                        interventions: works(&p.id),
                    });
                }
            }
            rows
        }
        RegistryCategory::Roads => state
            .roads
            .iter()
            .map(|r| RegistryAsset {
                id: r.id.clone(),
                kind: AssetKind::Road,
                name: r.name.clone(),
                unique_code: r.unique_code.clone(),
                route_code: Some(r.code.clone()),
                parent_name: None,
                address: None,
                cost_center: r.cost_center.clone(),
                previous_names: Vec::new(),
                technical_data: r.technical_data.clone(),
                interventions: works(&r.id),
            })
            .collect(),
    }
}

fn owned(names: Vec<&str>) -> Vec<String> {
    names.into_iter().map(String::from).collect()
}

/// Distinct cost centers used in a category, sorted
pub fn cost_centers(state: &AppState, category: RegistryCategory) -> Vec<String> {
    assets(state, category)
        .into_iter()
        .filter_map(|a| a.cost_center)
        .filter(|c| !c.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::seed;

    fn codes(rows: &[RegistryAsset]) -> Vec<&str> {
        rows.iter()
            .map(|a| a.unique_code.as_deref().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_buildings_list_plessi_after_their_building() {
        let state = seed::sample_state();
        let rows = assets(&state, RegistryCategory::Buildings);
        assert_eq!(
            codes(&rows),
            vec!["IMM_000101", "PLX_000101", "PLX_000102", "IMM_000105", "PLX_000105"]
        );
        assert_eq!(rows[1].kind, AssetKind::Plesso);
        assert_eq!(rows[1].parent_name.as_deref(), Some(rows[0].name.as_str()));
    }

    #[test]
    fn test_kind_and_cost_center_filters() {
        let state = seed::sample_state();
        let plessi = RegistryFilter {
            kind: Some(AssetKind::Plesso),
            ..RegistryFilter::default()
        }
        .apply(&state);
        assert_eq!(codes(&plessi), vec!["PLX_000101", "PLX_000102", "PLX_000105"]);

        let central = RegistryFilter {
            cost_center: Some("AMMIN_CENTRALE".into()),
            ..RegistryFilter::default()
        }
        .apply(&state);
        assert_eq!(codes(&central), vec!["IMM_000105"]);
    }

    #[test]
    fn test_text_matches_parent_building() {
        let state = seed::sample_state();
        let rows = RegistryFilter {
            text: Some("marconi".into()),
            ..RegistryFilter::default()
        }
        .apply(&state);
        assert_eq!(codes(&rows), vec!["IMM_000101", "PLX_000101", "PLX_000102"]);
    }

    #[test]
    fn test_road_status_filter() {
        let state = seed::sample_state();
        let rows = RegistryFilter {
            category: RegistryCategory::Roads,
            road_status: Some(MaintenanceStatus::Sufficiente),
            ..RegistryFilter::default()
        }
        .apply(&state);
        assert_eq!(codes(&rows), vec!["STR_000015"]);
        assert_eq!(rows[0].route_code.as_deref(), Some("SP 15"));

        // a status filter never matches buildings
        let none = RegistryFilter {
            road_status: Some(MaintenanceStatus::Buono),
            ..RegistryFilter::default()
        }
        .apply(&state);
        assert!(none.is_empty());
    }

    #[test]
    fn test_cost_centers_are_distinct_and_sorted() {
        let state = seed::sample_state();
        assert_eq!(
            cost_centers(&state, RegistryCategory::Roads),
            vec!["VIAB_AREA_CENTRALE", "VIAB_AREA_SUD"]
        );
        assert_eq!(
            cost_centers(&state, RegistryCategory::Buildings),
            vec!["AMMIN_CENTRALE", "ISTR_AREA_A"]
        );
    }
}
