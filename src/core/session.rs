//! Session: owns the current state and writes it back after each change

use chrono::{DateTime, Utc};

use crate::core::audit::AuditLogEntry;
use crate::core::config::Config;
use crate::core::mutation::{Mutation, MutationContext, MutationError};
use crate::core::persistence::{Gateway, LoadSource, SaveReport};
use crate::core::state::AppState;
use crate::core::workspace::Workspace;

/// Result of a dispatched mutation
#[derive(Debug, Clone)]
pub struct Dispatched {
    /// Audit entries the change appended, oldest first
    pub appended: Vec<AuditLogEntry>,
    /// `None` when the change was a no-op and nothing was written
    pub save: Option<SaveReport>,
}

pub struct Session {
    state: AppState,
    gateway: Gateway,
    admin_secret: String,
    source: LoadSource,
}

impl Session {
    /// Load the state through `gateway`
    ///
    /// Freshly installed sample registers are written back straight away.
    pub fn open(gateway: Gateway, admin_secret: impl Into<String>) -> Self {
        let loaded = gateway.load();
        if loaded.source == LoadSource::Seed {
            let report = gateway.save(&loaded.state, &[]);
            if !report.local_written {
                tracing::warn!("sample registers could not be written to the local slot");
            }
        }
        Self {
            state: loaded.state,
            gateway,
            admin_secret: admin_secret.into(),
            source: loaded.source,
        }
    }

    /// Session over a workspace's slot and configured remote database
    pub fn for_workspace(workspace: &Workspace, config: &Config) -> Self {
        Self::open(
            Gateway::for_workspace(workspace, config),
            config.admin_secret(),
        )
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn source(&self) -> LoadSource {
        self.source
    }

    pub fn dispatch(&mut self, mutation: Mutation) -> Result<Dispatched, MutationError> {
        self.dispatch_at(mutation, Utc::now())
    }

    /// Apply `mutation` as of `now`, then save once
    pub fn dispatch_at(
        &mut self,
        mutation: Mutation,
        now: DateTime<Utc>,
    ) -> Result<Dispatched, MutationError> {
        let ctx = MutationContext::new(now, self.admin_secret.clone());
        let transition = mutation.apply(&self.state, &ctx)?;

        if transition.is_noop(&self.state) {
            return Ok(Dispatched {
                appended: Vec::new(),
                save: None,
            });
        }

        let report = self.gateway.save(&transition.state, &transition.appended);
        if !report.is_clean() {
            tracing::warn!(
                local = report.local_written,
                mirror_failures = report.mirror_failures,
                "state change was not fully persisted"
            );
        }
        self.state = transition.state;
        Ok(Dispatched {
            appended: transition.appended,
            save: Some(report),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::{hash_password, DEFAULT_SECURITY_PASSWORD};
    use crate::core::persistence::{AuditMirror, FileSlot, SqliteAuditMirror};
    use crate::core::mutation::DeleteGuard;
    use crate::entities::Structure;
    use tempfile::tempdir;

    fn login() -> Mutation {
        Mutation::Login {
            username: "admin".into(),
            password: "password".into(),
        }
    }

    #[test]
    fn test_dispatch_persists_and_mirrors() {
        let dir = tempdir().unwrap();
        let slot = dir.path().join("slot.json");
        let db = dir.path().join("remote.db");
        let gateway = || {
            Gateway::new(
                Box::new(FileSlot::new(&slot)),
                Some(Box::new(SqliteAuditMirror::open(&db).unwrap())),
            )
        };

        let mut session = Session::open(gateway(), hash_password(DEFAULT_SECURITY_PASSWORD));
        assert_eq!(session.source(), LoadSource::Seed);
        session.dispatch(login()).unwrap();
        let done = session
            .dispatch(Mutation::SaveStructure(Structure::new("Palazzo A", "Via Roma 1")))
            .unwrap();
        let report = done.save.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.mirrored, 1);

        let reopened = Session::open(gateway(), "");
        assert_eq!(reopened.source(), LoadSource::Slot);
        assert_eq!(reopened.state().structures.len(), 3);
        assert_eq!(reopened.state().audit_logs.len(), 2);
        assert_eq!(
            SqliteAuditMirror::open(&db).unwrap().recent(10).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_rejected_mutation_leaves_state() {
        let dir = tempdir().unwrap();
        let gateway = Gateway::new(Box::new(FileSlot::new(dir.path().join("s.json"))), None);
        let mut session = Session::open(gateway, hash_password(DEFAULT_SECURITY_PASSWORD));
        session.dispatch(login()).unwrap();
        let before = session.state().clone();

        let err = session
            .dispatch(Mutation::DeleteRoad {
                id: "road-sample-sp2".into(),
                guard: DeleteGuard::with_password("nope"),
            })
            .unwrap_err();
        assert_eq!(err, MutationError::WrongSecurityPassword);
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn test_noop_is_not_saved() {
        let dir = tempdir().unwrap();
        let gateway = Gateway::new(Box::new(FileSlot::new(dir.path().join("s.json"))), None);
        let mut session = Session::open(gateway, hash_password(DEFAULT_SECURITY_PASSWORD));
        session.dispatch(login()).unwrap();
        let done = session
            .dispatch(Mutation::PurgeOrphanInterventions {
                guard: DeleteGuard::with_password(DEFAULT_SECURITY_PASSWORD),
            })
            .unwrap();
        assert!(done.save.is_none());
        assert!(done.appended.is_empty());
    }
}
