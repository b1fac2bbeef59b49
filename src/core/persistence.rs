//! Persistence gateway
//!
//! The whole [`AppState`] is written to a local slot after every change.
//! Audit entries are additionally mirrored to an optional remote SQLite
//! database and read back on load. Nothing here raises past the gateway:
//! `save` reports what happened, `load` degrades to defaults.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use thiserror::Error;

use crate::core::audit::{merge_logs, AuditAction, AuditLogEntry};
use crate::core::config::Config;
use crate::core::identity::EntityId;
use crate::core::seed;
use crate::core::state::AppState;
use crate::core::workspace::Workspace;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to access local slot {path}: {source}")]
    Slot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("remote audit database error: {0}")]
    Remote(#[from] rusqlite::Error),
}

/// Durable key-value slot holding the serialized state
pub trait LocalSlot {
    /// Stored text, or `None` when nothing was ever written
    fn read(&self) -> Result<Option<String>, PersistenceError>;

    /// Replace the stored text
    fn write(&self, contents: &str) -> Result<(), PersistenceError>;
}

/// Slot backed by a JSON file, replaced atomically
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Slot {
            path: self.path.clone(),
            source,
        }
    }
}

impl LocalSlot for FileSlot {
    fn read(&self) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn write(&self, contents: &str) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }
}

/// In-memory slot, for embedding and tests
#[derive(Debug, Default)]
pub struct MemorySlot {
    contents: RefCell<Option<String>>,
}

impl MemorySlot {
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: RefCell::new(Some(contents.into())),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.borrow().clone()
    }
}

impl LocalSlot for MemorySlot {
    fn read(&self) -> Result<Option<String>, PersistenceError> {
        Ok(self.contents.borrow().clone())
    }

    fn write(&self, contents: &str) -> Result<(), PersistenceError> {
        *self.contents.borrow_mut() = Some(contents.to_string());
        Ok(())
    }
}

/// Remote store that mirrors the audit trail
pub trait AuditMirror {
    /// Insert or replace an entry, keyed by its id
    fn upsert(&self, entry: &AuditLogEntry) -> Result<(), PersistenceError>;

    /// The `limit` most recent entries, newest first
    fn recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>, PersistenceError>;
}

const AUDIT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS audit_logs (
    id TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    action TEXT NOT NULL CHECK (action IN ('CREATE', 'UPDATE', 'DELETE', 'PURGE', 'LOGIN')),
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    details TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audit_logs_timestamp ON audit_logs(timestamp);
"#;

/// Audit mirror stored in a SQLite database
pub struct SqliteAuditMirror {
    conn: Connection,
}

impl SqliteAuditMirror {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute_batch(AUDIT_SCHEMA)?;
        Ok(Self { conn })
    }
}

impl AuditMirror for SqliteAuditMirror {
    fn upsert(&self, entry: &AuditLogEntry) -> Result<(), PersistenceError> {
        self.conn.execute(
            "INSERT INTO audit_logs (id, timestamp, action, entity_type, entity_id, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                timestamp = excluded.timestamp,
                action = excluded.action,
                entity_type = excluded.entity_type,
                entity_id = excluded.entity_id,
                details = excluded.details",
            params![
                entry.id.as_str(),
                entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                entry.action.as_str(),
                entry.entity_type,
                entry.entity_id,
                entry.details,
            ],
        )?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, action, entity_type, entity_id, details
             FROM audit_logs ORDER BY timestamp DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, timestamp, action, entity_type, entity_id, details) = row?;
            let parsed_ts = DateTime::parse_from_rfc3339(&timestamp).map(|t| t.with_timezone(&Utc));
            let parsed_action = action.parse::<AuditAction>();
            match (parsed_ts, parsed_action) {
                (Ok(timestamp), Ok(action)) => entries.push(AuditLogEntry {
                    id: EntityId::from_raw(id),
                    timestamp,
                    action,
                    entity_type,
                    entity_id,
                    details,
                }),
                _ => tracing::warn!(id = %id, "skipping malformed remote audit row"),
            }
        }
        Ok(entries)
    }
}

/// Outcome of a save
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub local_written: bool,
    /// Entries the remote store acknowledged
    pub mirrored: usize,
    /// Entries that failed every attempt
    pub mirror_failures: usize,
}

impl SaveReport {
    pub fn is_clean(&self) -> bool {
        self.local_written && self.mirror_failures == 0
    }
}

/// Where the loaded state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Parsed from the local slot
    Slot,
    /// Slot empty or unreadable; built-in defaults used
    Defaults,
    /// No assets found; sample registers installed
    Seed,
}

#[derive(Debug, Clone)]
pub struct Loaded {
    pub state: AppState,
    pub source: LoadSource,
    /// Remote entries merged into the log
    pub remote_entries: usize,
}

/// Local slot plus optional remote audit mirror
pub struct Gateway {
    slot: Box<dyn LocalSlot>,
    mirror: Option<Box<dyn AuditMirror>>,
    audit_window: usize,
    mirror_attempts: u32,
}

impl Gateway {
    pub fn new(slot: Box<dyn LocalSlot>, mirror: Option<Box<dyn AuditMirror>>) -> Self {
        Self {
            slot,
            mirror,
            audit_window: crate::core::config::DEFAULT_AUDIT_WINDOW,
            mirror_attempts: crate::core::config::DEFAULT_MIRROR_ATTEMPTS,
        }
    }

    /// Gateway for a workspace, honouring the remote database setting
    ///
    /// An unreachable remote database disables mirroring for this session.
    pub fn for_workspace(workspace: &Workspace, config: &Config) -> Self {
        let slot = Box::new(FileSlot::new(workspace.slot_path()));
        let mirror = config.remote_database.as_ref().and_then(|path| {
            match SqliteAuditMirror::open(path) {
                Ok(m) => Some(Box::new(m) as Box<dyn AuditMirror>),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "remote audit database unavailable");
                    None
                }
            }
        });
        Self::new(slot, mirror)
            .with_audit_window(config.audit_window())
            .with_mirror_attempts(config.mirror_attempts())
    }

    pub fn with_audit_window(mut self, window: usize) -> Self {
        self.audit_window = window;
        self
    }

    pub fn with_mirror_attempts(mut self, attempts: u32) -> Self {
        self.mirror_attempts = attempts.max(1);
        self
    }

    pub fn has_mirror(&self) -> bool {
        self.mirror.is_some()
    }

    /// Overwrite the slot with `state` and mirror the `appended` entries
    pub fn save(&self, state: &AppState, appended: &[AuditLogEntry]) -> SaveReport {
        let mut report = SaveReport::default();

        match serde_json::to_string_pretty(state)
            .map_err(PersistenceError::from)
            .and_then(|json| self.slot.write(&json))
        {
            Ok(()) => {
                report.local_written = true;
                tracing::debug!("state written to local slot");
            }
            Err(e) => tracing::error!(error = %e, "failed to write local slot"),
        }

        let Some(mirror) = &self.mirror else {
            return report;
        };
        for entry in appended {
            if self.mirror_entry(mirror.as_ref(), entry) {
                report.mirrored += 1;
            } else {
                report.mirror_failures += 1;
            }
        }
        report
    }

    fn mirror_entry(&self, mirror: &dyn AuditMirror, entry: &AuditLogEntry) -> bool {
        for attempt in 1..=self.mirror_attempts {
            match mirror.upsert(entry) {
                Ok(()) => {
                    tracing::debug!(id = %entry.id, "audit entry mirrored");
                    return true;
                }
                Err(e) => tracing::warn!(
                    id = %entry.id,
                    attempt,
                    of = self.mirror_attempts,
                    error = %e,
                    "audit mirror upsert failed"
                ),
            }
        }
        false
    }

    /// Reconstruct the state from the slot and the remote audit window
    pub fn load(&self) -> Loaded {
        let (mut state, mut source) = match self.slot.read() {
            Ok(Some(text)) => match serde_json::from_str::<AppState>(&text) {
                Ok(state) => (state, LoadSource::Slot),
                Err(e) => {
                    tracing::warn!(error = %e, "local slot is not valid state, using defaults");
                    (AppState::default(), LoadSource::Defaults)
                }
            },
            Ok(None) => (AppState::default(), LoadSource::Defaults),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read local slot, using defaults");
                (AppState::default(), LoadSource::Defaults)
            }
        };
        state.normalize();

        let mut remote_entries = 0;
        if let Some(mirror) = &self.mirror {
            match mirror.recent(self.audit_window) {
                Ok(remote) => {
                    remote_entries = remote.len();
                    let local = std::mem::take(&mut state.audit_logs);
                    state.audit_logs = merge_logs(local, remote);
                }
                Err(e) => tracing::warn!(error = %e, "failed to read remote audit log"),
            }
        }

        if state.has_no_assets() {
            tracing::info!("no assets found, installing sample registers");
            let sample = seed::sample_state();
            state.structures = sample.structures;
            state.roads = sample.roads;
            state.interventions = sample.interventions;
            source = LoadSource::Seed;
        }

        Loaded {
            state,
            source,
            remote_entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::tempdir;

    fn entry(id: &str, minute: u32) -> AuditLogEntry {
        AuditLogEntry {
            id: EntityId::from_raw(id),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap(),
            action: AuditAction::Create,
            entity_type: "Strada".into(),
            entity_id: "r1".into(),
            details: format!("entry {}", id),
        }
    }

    /// Mirror that fails a fixed number of times before succeeding
    struct FlakyMirror {
        failures_left: Cell<u32>,
        calls: Rc<Cell<u32>>,
    }

    impl AuditMirror for FlakyMirror {
        fn upsert(&self, _entry: &AuditLogEntry) -> Result<(), PersistenceError> {
            self.calls.set(self.calls.get() + 1);
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err(PersistenceError::Remote(rusqlite::Error::InvalidQuery));
            }
            Ok(())
        }

        fn recent(&self, _limit: usize) -> Result<Vec<AuditLogEntry>, PersistenceError> {
            Err(PersistenceError::Remote(rusqlite::Error::InvalidQuery))
        }
    }

    #[test]
    fn test_file_slot_roundtrip() {
        let dir = tempdir().unwrap();
        let slot = FileSlot::new(dir.path().join("nested").join("slot.json"));
        assert_eq!(slot.read().unwrap(), None);
        slot.write("{}").unwrap();
        assert_eq!(slot.read().unwrap().as_deref(), Some("{}"));
        assert!(!dir.path().join("nested").join("slot.json.tmp").exists());
    }

    #[test]
    fn test_sqlite_mirror_upsert_and_window() {
        let mirror = SqliteAuditMirror::open_in_memory().unwrap();
        for (i, minute) in [5, 1, 9].iter().enumerate() {
            mirror.upsert(&entry(&format!("e{}", i), *minute)).unwrap();
        }
        let mut changed = entry("e0", 5);
        changed.details = "rewritten".into();
        mirror.upsert(&changed).unwrap();

        let recent = mirror.recent(2).unwrap();
        let ids: Vec<&str> = recent.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e0"]);
        assert_eq!(recent[1].details, "rewritten");
    }

    #[test]
    fn test_load_empty_slot_installs_seed() {
        let gateway = Gateway::new(Box::new(MemorySlot::default()), None);
        let loaded = gateway.load();
        assert_eq!(loaded.source, LoadSource::Seed);
        assert_eq!(loaded.state.structures.len(), 2);
        assert_eq!(loaded.state.users.len(), 3);
    }

    #[test]
    fn test_load_garbage_falls_back() {
        let gateway = Gateway::new(Box::new(MemorySlot::with_contents("not json")), None);
        let loaded = gateway.load();
        assert_eq!(loaded.source, LoadSource::Seed);
        assert!(loaded.state.audit_logs.is_empty());
    }

    #[test]
    fn test_load_missing_collections_default() {
        let json = r#"{"roads":[{"id":"r1","code":"SP 1","name":"Costa","lengthKm":3}]}"#;
        let gateway = Gateway::new(Box::new(MemorySlot::with_contents(json)), None);
        let loaded = gateway.load();
        assert_eq!(loaded.source, LoadSource::Slot);
        assert_eq!(loaded.state.roads.len(), 1);
        assert!(loaded.state.structures.is_empty());
        assert_eq!(loaded.state.notification_settings.days_before_deadline, 7);
        assert_eq!(loaded.state.users.len(), 3);
    }

    #[test]
    fn test_save_then_load_merges_remote_window() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("remote.db");
        let slot_path = dir.path().join("slot.json");
        let make = || {
            Gateway::new(
                Box::new(FileSlot::new(&slot_path)),
                Some(Box::new(SqliteAuditMirror::open(&db).unwrap())),
            )
        };

        let mut state = seed::sample_state();
        let local = entry("local-only", 1);
        state.audit_logs.push(local.clone());
        let report = make().save(&state, &[]);
        assert!(report.is_clean());

        // written by another installation
        SqliteAuditMirror::open(&db)
            .unwrap()
            .upsert(&entry("remote-only", 7))
            .unwrap();

        let loaded = make().load();
        assert_eq!(loaded.remote_entries, 1);
        let ids: Vec<&str> = loaded.state.audit_logs.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["remote-only", "local-only"]);
    }

    #[test]
    fn test_save_retries_then_reports_failure() {
        let calls = Rc::new(Cell::new(0));
        let gateway = Gateway::new(
            Box::new(MemorySlot::default()),
            Some(Box::new(FlakyMirror {
                failures_left: Cell::new(4),
                calls: calls.clone(),
            })),
        )
        .with_mirror_attempts(2);

        let report = gateway.save(&AppState::default(), &[entry("a", 1), entry("b", 2)]);
        assert!(report.local_written);
        assert_eq!(report.mirrored, 0);
        assert_eq!(report.mirror_failures, 2);
        assert_eq!(calls.get(), 4);

        // remote read failure still loads
        let loaded = gateway.load();
        assert_eq!(loaded.remote_entries, 0);
    }
}
