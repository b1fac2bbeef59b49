//! Audit log entries
//!
//! The log is append-only: newest entries sit at the front, and nothing in
//! the application edits or removes an entry once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::core::identity::{EntityId, EntityKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Purge,
    Login,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Purge => "PURGE",
            AuditAction::Login => "LOGIN",
        }
    }

    pub fn all() -> &'static [AuditAction] {
        &[
            AuditAction::Create,
            AuditAction::Update,
            AuditAction::Delete,
            AuditAction::Purge,
            AuditAction::Login,
        ]
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::all()
            .iter()
            .copied()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown audit action: '{}'", s))
    }
}

/// One row of the audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: EntityId,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    /// Label of the affected record type ("Immobile", "Strada", ...)
    pub entity_type: String,
    /// Id of the affected record, or a topic for system entries
    #[serde(default)]
    pub entity_id: String,
    #[serde(default)]
    pub details: String,
}

impl AuditLogEntry {
    pub fn new(
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        details: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntityId::generate(EntityKind::Audit),
            timestamp,
            action,
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            details: details.into(),
        }
    }
}

/// Merge a remote window of entries into the local log
///
/// Entries are keyed by id; the local copy wins on conflict. The result is
/// ordered newest first. Local entries outside the remote window are kept.
pub fn merge_logs(local: Vec<AuditLogEntry>, remote: Vec<AuditLogEntry>) -> Vec<AuditLogEntry> {
    let known: HashSet<EntityId> = local.iter().map(|e| e.id.clone()).collect();
    let mut merged = local;
    merged.extend(remote.into_iter().filter(|e| !known.contains(&e.id)));
    // stable: entries sharing a timestamp keep their local order
    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str, minute: u32, details: &str) -> AuditLogEntry {
        AuditLogEntry {
            id: EntityId::from_raw(id),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap(),
            action: AuditAction::Update,
            entity_type: "Immobile".into(),
            entity_id: "s1".into(),
            details: details.into(),
        }
    }

    #[test]
    fn test_action_serialises_uppercase() {
        assert_eq!(
            serde_json::to_string(&AuditAction::Purge).unwrap(),
            "\"PURGE\""
        );
        assert_eq!("login".parse::<AuditAction>(), Ok(AuditAction::Login));
    }

    #[test]
    fn test_merge_keeps_local_and_adds_remote() {
        let local = vec![entry("a", 5, "local a"), entry("b", 1, "local b")];
        let remote = vec![entry("c", 9, "remote c"), entry("a", 5, "remote a")];

        let merged = merge_logs(local, remote);
        let ids: Vec<&str> = merged.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(merged[1].details, "local a");
    }
}
