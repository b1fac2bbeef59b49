//! User accounts, roles and accessible sections

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityKind};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    #[default]
    User,
}

impl Role {
    /// Sections a freshly created account of this role can open
    pub fn default_sections(&self) -> Vec<Section> {
        match self {
            Role::Admin => Section::all().to_vec(),
            Role::Editor => vec![
                Section::Buildings,
                Section::Roads,
                Section::TechRegistry,
                Section::DataView,
                Section::History,
                Section::Dashboard,
                Section::MapView,
                Section::Interventions,
                Section::Manuals,
            ],
            Role::User => vec![
                Section::Dashboard,
                Section::Buildings,
                Section::Roads,
                Section::MapView,
                Section::Interventions,
                Section::TechRegistry,
                Section::Manuals,
            ],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Editor => write!(f, "editor"),
            Role::User => write!(f, "user"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "user" => Ok(Role::User),
            _ => Err(format!("Unknown role: '{}'. Use admin, editor or user", s)),
        }
    }
}

/// Application area a user may be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Dashboard,
    Buildings,
    Roads,
    MapView,
    Interventions,
    DataView,
    CsvImport,
    Reports,
    History,
    UserManagement,
    TechRegistry,
    Manuals,
    SystemDb,
}

impl Section {
    pub fn all() -> &'static [Section] {
        &[
            Section::Dashboard,
            Section::Buildings,
            Section::Roads,
            Section::MapView,
            Section::Interventions,
            Section::DataView,
            Section::CsvImport,
            Section::Reports,
            Section::History,
            Section::UserManagement,
            Section::TechRegistry,
            Section::Manuals,
            Section::SystemDb,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Dashboard => "dashboard",
            Section::Buildings => "buildings",
            Section::Roads => "roads",
            Section::MapView => "map-view",
            Section::Interventions => "interventions",
            Section::DataView => "data-view",
            Section::CsvImport => "csv-import",
            Section::Reports => "reports",
            Section::History => "history",
            Section::UserManagement => "user-management",
            Section::TechRegistry => "tech-registry",
            Section::Manuals => "manuals",
            Section::SystemDb => "system-db",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Section::all()
            .iter()
            .copied()
            .find(|section| section.as_str() == wanted)
            .ok_or_else(|| format!("Unknown section: '{}'", s))
    }
}

/// Section lists written by other front ends may carry names this build
/// does not know; those are dropped instead of failing the whole load.
fn known_sections<'de, D>(deserializer: D) -> Result<Vec<Section>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<String> = Vec::deserialize(deserializer)?;
    let mut sections = Vec::with_capacity(raw.len());
    for name in raw {
        match name.parse::<Section>() {
            Ok(section) if !sections.contains(&section) => sections.push(section),
            Ok(_) => {}
            Err(_) => tracing::debug!(section = %name, "ignoring unknown section"),
        }
    }
    Ok(sections)
}

/// An application account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,

    pub username: String,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub role: Role,

    #[serde(
        rename = "accessibleTabs",
        default,
        deserialize_with = "known_sections"
    )]
    pub sections: Vec<Section>,

    /// Identity managed by an external directory
    #[serde(
        rename = "isLdapUser",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub external_identity: bool,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: EntityId::generate(EntityKind::User),
            username: username.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: email.into(),
            role,
            sections: role.default_sections(),
            external_identity: false,
        }
    }

    /// The three accounts every installation starts with
    pub fn builtin() -> Vec<User> {
        let account = |id: &str, username: &str, first: &str, last: &str, role: Role| User {
            id: EntityId::from_raw(id),
            username: username.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}@provincia.it", username),
            role,
            sections: role.default_sections(),
            external_identity: false,
        };
        vec![
            account("admin-001", "admin", "Amministratore", "Sistema", Role::Admin),
            account("editor-001", "editor", "Editor", "Patrimonio", Role::Editor),
            account("user-001", "user", "Operatore", "Standard", Role::User),
        ]
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can_access(&self, section: Section) -> bool {
        self.sections.contains(&section)
    }

    /// Lowercased part after the last `@`, if any
    pub fn email_domain(&self) -> Option<String> {
        self.email
            .rsplit_once('@')
            .map(|(_, domain)| domain.trim().to_lowercase())
            .filter(|d| !d.is_empty())
    }
}

impl Entity for User {
    const LABEL: &'static str = "Utente";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn display_name(&self) -> String {
        self.username.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_accounts() {
        let users = User::builtin();
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].id, "admin-001");
        assert_eq!(users[0].sections.len(), Section::all().len());
        assert!(!users[1].can_access(Section::UserManagement));
        assert!(!users[2].can_access(Section::DataView));
        assert!(users[2].can_access(Section::Interventions));
    }

    #[test]
    fn test_section_names_are_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Section::MapView).unwrap(),
            "\"map-view\""
        );
        assert_eq!("system-db".parse::<Section>(), Ok(Section::SystemDb));
    }

    #[test]
    fn test_unknown_sections_are_dropped_on_read() {
        let json = r#"{
            "id": "u-9",
            "username": "mrossi",
            "firstName": "Mario",
            "lastName": "Rossi",
            "email": "m.rossi@provincia.sulcis.it",
            "password": "ignored",
            "role": "editor",
            "accessibleTabs": ["dashboard", "gis-beta", "roads", "roads"],
            "isLdapUser": true
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.sections, vec![Section::Dashboard, Section::Roads]);
        assert!(user.external_identity);
        assert_eq!(user.email_domain().as_deref(), Some("provincia.sulcis.it"));

        let back = serde_json::to_string(&user).unwrap();
        assert!(!back.contains("password"));
    }
}
