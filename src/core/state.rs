//! The entity store: the whole application state as one value
//!
//! [`AppState`] is what the local slot holds. Mutations never edit it in
//! place; they clone, change and return a new value (see
//! [`crate::core::mutation`]). Everything in this module is read-only
//! lookup over that value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::audit::AuditLogEntry;
use crate::core::code::{next_code, CodePrefix};
use crate::core::identity::EntityId;
use crate::core::seed;
use crate::core::target::{ResolvedTarget, TargetRef, TargetType};
use crate::entities::{
    Intervention, ManualEntry, NotificationSettings, Pertinenza, Plesso, Road,
    ScheduledExportConfig, SecurityPolicy, Structure, User,
};

/// Complete application state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppState {
    pub structures: Vec<Structure>,
    pub roads: Vec<Road>,
    #[serde(rename = "interventi")]
    pub interventions: Vec<Intervention>,
    /// Newest first
    pub audit_logs: Vec<AuditLogEntry>,
    pub notification_settings: NotificationSettings,
    pub scheduled_export: ScheduledExportConfig,
    pub security_policy: SecurityPolicy,
    pub users: Vec<User>,
    pub current_user_id: Option<EntityId>,
    pub manual_contents: BTreeMap<String, ManualEntry>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            structures: Vec::new(),
            roads: Vec::new(),
            interventions: Vec::new(),
            audit_logs: Vec::new(),
            notification_settings: NotificationSettings::default(),
            scheduled_export: ScheduledExportConfig::default(),
            security_policy: SecurityPolicy::default(),
            users: User::builtin(),
            current_user_id: None,
            manual_contents: seed::default_manuals(),
        }
    }
}

/// A search result row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Record type label ("Immobile", "Plesso", ...)
    pub kind: &'static str,
    pub id: EntityId,
    pub code: Option<String>,
    pub name: String,
    /// Which field matched
    pub matched: &'static str,
}

impl AppState {
    /// No structures, roads or interventions
    pub fn has_no_assets(&self) -> bool {
        self.structures.is_empty() && self.roads.is_empty() && self.interventions.is_empty()
    }

    /// Fill in what an older or hand-edited snapshot may lack
    pub fn normalize(&mut self) {
        if self.users.is_empty() {
            self.users = User::builtin();
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user_id
            .as_ref()
            .and_then(|id| self.find_user(id))
    }

    // ---- structures / plessi / pertinenze ----

    pub fn find_structure(&self, id: &EntityId) -> Option<&Structure> {
        self.structures.iter().find(|s| &s.id == id)
    }

    /// Look up a structure by id or unique code
    pub fn structure_by_ref(&self, reference: &str) -> Option<&Structure> {
        let reference = reference.trim();
        self.structures
            .iter()
            .find(|s| s.id == reference)
            .or_else(|| {
                self.structures
                    .iter()
                    .find(|s| code_matches(s.unique_code.as_deref(), reference))
            })
    }

    /// Every plesso with its owning structure, in hierarchy order
    pub fn plessi(&self) -> impl Iterator<Item = (&Structure, &Plesso)> {
        self.structures
            .iter()
            .flat_map(|s| s.plessi.iter().map(move |p| (s, p)))
    }

    pub fn find_plesso(&self, id: &EntityId) -> Option<(&Structure, &Plesso)> {
        self.plessi().find(|(_, p)| &p.id == id)
    }

    pub fn plesso_by_ref(&self, reference: &str) -> Option<(&Structure, &Plesso)> {
        let reference = reference.trim();
        self.plessi().find(|(_, p)| p.id == reference).or_else(|| {
            self.plessi()
                .find(|(_, p)| code_matches(p.unique_code.as_deref(), reference))
        })
    }

    pub fn find_pertinenza(&self, id: &EntityId) -> Option<(&Structure, &Plesso, &Pertinenza)> {
        self.plessi().find_map(|(s, p)| {
            p.pertinenze
                .iter()
                .find(|x| &x.id == id)
                .map(|x| (s, p, x))
        })
    }

    // ---- roads ----

    pub fn find_road(&self, id: &EntityId) -> Option<&Road> {
        self.roads.iter().find(|r| &r.id == id)
    }

    /// Look up a road by id, unique code or route code ("SP 2")
    pub fn road_by_ref(&self, reference: &str) -> Option<&Road> {
        let reference = reference.trim();
        self.roads
            .iter()
            .find(|r| r.id == reference)
            .or_else(|| {
                self.roads
                    .iter()
                    .find(|r| code_matches(r.unique_code.as_deref(), reference))
            })
            .or_else(|| {
                self.roads
                    .iter()
                    .find(|r| r.code.trim().eq_ignore_ascii_case(reference))
            })
    }

    // ---- interventions ----

    pub fn find_intervention(&self, id: &EntityId) -> Option<&Intervention> {
        self.interventions.iter().find(|i| &i.id == id)
    }

    pub fn intervention_by_ref(&self, reference: &str) -> Option<&Intervention> {
        let reference = reference.trim();
        self.interventions
            .iter()
            .find(|i| i.id == reference)
            .or_else(|| {
                self.interventions
                    .iter()
                    .find(|i| code_matches(i.unique_code.as_deref(), reference))
            })
    }

    /// Interventions pointing at the given asset
    pub fn interventions_for<'a>(
        &'a self,
        asset: &'a EntityId,
    ) -> impl Iterator<Item = &'a Intervention> + 'a {
        self.interventions
            .iter()
            .filter(move |i| &i.target.id == asset)
    }

    /// Interventions whose target no longer resolves
    pub fn orphan_interventions(&self) -> Vec<&Intervention> {
        self.interventions
            .iter()
            .filter(|i| !self.resolve_target(&i.target).is_resolved())
            .collect()
    }

    // ---- users ----

    pub fn find_user(&self, id: &EntityId) -> Option<&User> {
        self.users.iter().find(|u| &u.id == id)
    }

    pub fn user_by_ref(&self, reference: &str) -> Option<&User> {
        let reference = reference.trim();
        self.users
            .iter()
            .find(|u| u.id == reference)
            .or_else(|| self.users.iter().find(|u| u.username == reference))
    }

    // ---- targets ----

    /// Resolve a target reference with a single lookup per kind
    pub fn resolve_target<'a>(&'a self, target: &'a TargetRef) -> ResolvedTarget<'a> {
        let resolved = match target.kind {
            TargetType::Structure => self.find_structure(&target.id).map(ResolvedTarget::Structure),
            TargetType::Plesso => self
                .find_plesso(&target.id)
                .map(|(structure, plesso)| ResolvedTarget::Plesso { structure, plesso }),
            TargetType::Pertinenza => {
                self.find_pertinenza(&target.id)
                    .map(|(structure, plesso, pertinenza)| ResolvedTarget::Pertinenza {
                        structure,
                        plesso,
                        pertinenza,
                    })
            }
            TargetType::Road => self.find_road(&target.id).map(ResolvedTarget::Road),
        };
        resolved.unwrap_or(ResolvedTarget::Unresolved(target))
    }

    /// Display label for a target; dangling references get a placeholder
    pub fn target_label(&self, target: &TargetRef) -> String {
        self.resolve_target(target).label()
    }

    /// Find the asset carrying a unique code
    ///
    /// Structures are tried first, then roads, then plessi; the first match
    /// wins.
    pub fn asset_by_code(&self, code: &str) -> Option<TargetRef> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        if let Some(s) = self
            .structures
            .iter()
            .find(|s| code_matches(s.unique_code.as_deref(), code))
        {
            return Some(TargetRef::new(s.id.clone(), TargetType::Structure));
        }
        if let Some(r) = self
            .roads
            .iter()
            .find(|r| code_matches(r.unique_code.as_deref(), code))
        {
            return Some(TargetRef::new(r.id.clone(), TargetType::Road));
        }
        self.plessi()
            .find(|(_, p)| code_matches(p.unique_code.as_deref(), code))
            .map(|(_, p)| TargetRef::new(p.id.clone(), TargetType::Plesso))
    }

    /// Resolve a user-typed asset reference (id or unique code) of any kind
    pub fn asset_by_ref(&self, reference: &str) -> Option<TargetRef> {
        let reference = reference.trim();
        let id = EntityId::from_raw(reference);
        if self.find_structure(&id).is_some() {
            return Some(TargetRef::new(id, TargetType::Structure));
        }
        if self.find_road(&id).is_some() {
            return Some(TargetRef::new(id, TargetType::Road));
        }
        if self.find_plesso(&id).is_some() {
            return Some(TargetRef::new(id, TargetType::Plesso));
        }
        if self.find_pertinenza(&id).is_some() {
            return Some(TargetRef::new(id, TargetType::Pertinenza));
        }
        self.asset_by_code(reference)
    }

    // ---- codes ----

    /// Next unique code for the collection owning `prefix`
    ///
    /// Plesso codes are numbered across all structures.
    pub fn next_code(&self, prefix: CodePrefix) -> String {
        match prefix {
            CodePrefix::Imm => next_code(
                prefix,
                self.structures.iter().map(|s| s.unique_code.as_deref()),
            ),
            CodePrefix::Plx => next_code(prefix, self.plessi().map(|(_, p)| p.unique_code.as_deref())),
            CodePrefix::Str => next_code(prefix, self.roads.iter().map(|r| r.unique_code.as_deref())),
            CodePrefix::Int => next_code(
                prefix,
                self.interventions.iter().map(|i| i.unique_code.as_deref()),
            ),
        }
    }

    // ---- search ----

    /// Case-insensitive substring search across the registers
    ///
    /// Structures and plessi also match on their previous names.
    pub fn search(&self, term: &str) -> Vec<SearchHit> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let hit = |text: &str| text.to_lowercase().contains(&needle);
        let code_hit = |code: &Option<String>| code.as_deref().map_or(false, hit);
        let mut hits = Vec::new();

        for s in &self.structures {
            let matched = if hit(&s.name) {
                Some("name")
            } else if s.previous_names.iter().any(|n| hit(n)) {
                Some("previous name")
            } else if code_hit(&s.unique_code) {
                Some("code")
            } else if hit(&s.address) {
                Some("address")
            } else {
                None
            };
            if let Some(matched) = matched {
                hits.push(SearchHit {
                    kind: "Immobile",
                    id: s.id.clone(),
                    code: s.unique_code.clone(),
                    name: s.name.clone(),
                    matched,
                });
            }
        }

        for (s, p) in self.plessi() {
            let matched = if hit(&p.name) {
                Some("name")
            } else if p.previous_names.iter().any(|n| hit(n)) {
                Some("previous name")
            } else if code_hit(&p.unique_code) {
                Some("code")
            } else {
                None
            };
            if let Some(matched) = matched {
                hits.push(SearchHit {
                    kind: "Plesso",
                    id: p.id.clone(),
                    code: p.unique_code.clone(),
                    name: format!("{} > {}", s.name, p.name),
                    matched,
                });
            }
        }

        for r in &self.roads {
            let matched = if hit(&r.code) {
                Some("route code")
            } else if hit(&r.name) {
                Some("name")
            } else if code_hit(&r.unique_code) {
                Some("code")
            } else {
                None
            };
            if let Some(matched) = matched {
                hits.push(SearchHit {
                    kind: "Strada",
                    id: r.id.clone(),
                    code: r.unique_code.clone(),
                    name: r.label(),
                    matched,
                });
            }
        }

        for i in &self.interventions {
            let matched = if hit(&i.tender_code) {
                Some("cig")
            } else if code_hit(&i.unique_code) {
                Some("code")
            } else if hit(&i.title) {
                Some("title")
            } else if hit(&i.responsible) {
                Some("rup")
            } else {
                None
            };
            if let Some(matched) = matched {
                hits.push(SearchHit {
                    kind: "Intervento",
                    id: i.id.clone(),
                    code: i.unique_code.clone(),
                    name: format!("{} - {}", i.tender_code, i.title),
                    matched,
                });
            }
        }

        hits
    }
}

fn code_matches(code: Option<&str>, wanted: &str) -> bool {
    code.map_or(false, |c| c.trim().eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppState {
        seed::sample_state()
    }

    #[test]
    fn test_default_state_has_builtin_users_and_no_assets() {
        let state = AppState::default();
        assert!(state.has_no_assets());
        assert_eq!(state.users.len(), 3);
        assert!(state.current_user().is_none());
    }

    #[test]
    fn test_missing_collections_default_to_empty() {
        let state: AppState =
            serde_json::from_str(r#"{"roads": [], "currentUserId": null}"#).unwrap();
        assert!(state.structures.is_empty());
        assert_eq!(state.notification_settings.days_before_deadline, 7);
        assert_eq!(state.users.len(), 3);
    }

    #[test]
    fn test_next_codes_over_sample() {
        let state = sample();
        assert_eq!(state.next_code(CodePrefix::Imm), "IMM_000106");
        assert_eq!(state.next_code(CodePrefix::Plx), "PLX_000106");
        assert_eq!(state.next_code(CodePrefix::Str), "STR_000016");
        assert_eq!(state.next_code(CodePrefix::Int), "INT_000003");
    }

    #[test]
    fn test_asset_by_code_prefers_structures_then_roads_then_plessi() {
        let mut state = sample();
        assert_eq!(
            state.asset_by_code("str_000002").map(|t| t.kind),
            Some(TargetType::Road)
        );
        assert_eq!(
            state.asset_by_code("PLX_000102").map(|t| t.kind),
            Some(TargetType::Plesso)
        );
        // a road sharing a structure's code loses to the structure
        state.roads[0].unique_code = Some("IMM_000101".into());
        assert_eq!(
            state.asset_by_code("IMM_000101").map(|t| t.kind),
            Some(TargetType::Structure)
        );
        assert_eq!(state.asset_by_code("IMM_999999"), None);
    }

    #[test]
    fn test_dangling_target_resolves_to_placeholder() {
        let mut state = sample();
        let road_target = state.interventions[0].target.clone();
        assert_eq!(road_target.kind, TargetType::Road);
        assert_eq!(state.target_label(&road_target), "SP 2 - Villaspeciosa - Siliqua");

        state.roads.retain(|r| r.id != road_target.id);
        assert_eq!(state.target_label(&road_target), "Strada N/D");
        assert_eq!(state.orphan_interventions().len(), 1);
    }

    #[test]
    fn test_search_matches_previous_names_and_tender_codes() {
        let state = sample();
        let hits = state.search("laboratorio tecnico");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, "Plesso");
        assert_eq!(hits[0].matched, "previous name");

        let hits = state.search("b2344");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, "Intervento");

        assert!(state.search("   ").is_empty());
    }

    #[test]
    fn test_refs_accept_id_or_code() {
        let state = sample();
        assert!(state.structure_by_ref("struct-scuola-marconi").is_some());
        assert!(state.structure_by_ref("IMM_000105").is_some());
        assert!(state.road_by_ref("sp 15").is_some());
        assert!(state.plesso_by_ref("PLX_000105").is_some());
        assert!(state.intervention_by_ref("INT_000002").is_some());
        assert!(state.user_by_ref("editor").is_some());
    }
}
