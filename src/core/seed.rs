//! Embedded first-run data

use rust_embed::Embed;
use std::collections::BTreeMap;

use crate::core::state::AppState;
use crate::entities::ManualEntry;

#[derive(Embed)]
#[folder = "seed/"]
struct EmbeddedSeed;

fn read_seed<T: serde::de::DeserializeOwned>(name: &str) -> Option<T> {
    let file = EmbeddedSeed::get(name)?;
    match serde_json::from_slice(&file.data) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(file = name, error = %e, "embedded seed data is malformed");
            None
        }
    }
}

/// Sample registers loaded when a workspace holds no assets
pub fn sample_state() -> AppState {
    let mut state: AppState = read_seed("sample_state.json").unwrap_or_default();
    state.normalize();
    state
}

/// Built-in help pages
pub fn default_manuals() -> BTreeMap<String, ManualEntry> {
    read_seed("manuals.json").unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::TargetType;

    #[test]
    fn test_sample_state_is_populated() {
        let state = sample_state();
        assert_eq!(state.structures.len(), 2);
        assert_eq!(state.plessi().count(), 3);
        assert_eq!(state.roads.len(), 2);
        assert_eq!(state.interventions.len(), 2);
        assert_eq!(state.interventions[1].target.kind, TargetType::Structure);
        assert!(state.audit_logs.is_empty());
        assert_eq!(state.users.len(), 3);
        assert!(!state.has_no_assets());
    }

    #[test]
    fn test_default_manuals_present() {
        let manuals = default_manuals();
        assert!(manuals.contains_key("man-1"));
        assert!(manuals["censimento-immobile"].external_url.is_some());
    }
}
