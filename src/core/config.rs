//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::PathBuf;

use crate::core::auth::{hash_password, DEFAULT_SECURITY_PASSWORD};
use crate::core::workspace::Workspace;

/// Default number of audit rows read back from the remote database
pub const DEFAULT_AUDIT_WINDOW: usize = 50;

/// Default upsert attempts per mirrored audit entry
pub const DEFAULT_MIRROR_ATTEMPTS: u32 = 2;

/// EdilGest configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database mirroring the audit log
    pub remote_database: Option<PathBuf>,

    /// Audit rows fetched from the remote database on load
    pub audit_window: Option<usize>,

    /// Upsert attempts per audit entry
    pub mirror_attempts: Option<u32>,

    /// Hex SHA-256 of the protected-deletion password
    pub admin_password_sha256: Option<String>,

    /// Default output format
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(workspace: Option<&Workspace>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/edilgest/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_layer(&global_path) {
                config.merge(global);
            }
        }

        // 3. Workspace config (.edilgest/config.yaml)
        if let Some(ws) = workspace {
            if let Some(mut local) = Self::read_layer(&ws.config_path()) {
                // relative database paths are relative to the workspace
                local.remote_database = local.remote_database.map(|p| ws.resolve(&p));
                config.merge(local);
            }
        }

        // 4. Environment variables
        if let Ok(path) = std::env::var("EDILGEST_REMOTE_DB") {
            if !path.trim().is_empty() {
                config.remote_database = Some(PathBuf::from(path));
            }
        }
        if let Ok(window) = std::env::var("EDILGEST_AUDIT_WINDOW") {
            match window.trim().parse() {
                Ok(n) => config.audit_window = Some(n),
                Err(_) => tracing::warn!(value = %window, "ignoring invalid EDILGEST_AUDIT_WINDOW"),
            }
        }
        if let Ok(hash) = std::env::var("EDILGEST_ADMIN_PASSWORD_SHA256") {
            if !hash.trim().is_empty() {
                config.admin_password_sha256 = Some(hash);
            }
        }

        config
    }

    fn read_layer(path: &std::path::Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read config");
                return None;
            }
        };
        match serde_yml::from_str::<Config>(&contents) {
            Ok(layer) => Some(layer),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed config");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "edilgest")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.remote_database.is_some() {
            self.remote_database = other.remote_database;
        }
        if other.audit_window.is_some() {
            self.audit_window = other.audit_window;
        }
        if other.mirror_attempts.is_some() {
            self.mirror_attempts = other.mirror_attempts;
        }
        if other.admin_password_sha256.is_some() {
            self.admin_password_sha256 = other.admin_password_sha256;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }

    pub fn audit_window(&self) -> usize {
        self.audit_window.unwrap_or(DEFAULT_AUDIT_WINDOW)
    }

    /// At least one attempt is always made
    pub fn mirror_attempts(&self) -> u32 {
        self.mirror_attempts.unwrap_or(DEFAULT_MIRROR_ATTEMPTS).max(1)
    }

    /// Lowercase hex digest protected deletions are checked against
    pub fn admin_secret(&self) -> String {
        match &self.admin_password_sha256 {
            Some(hash) => hash.trim().to_lowercase(),
            None => hash_password(DEFAULT_SECURITY_PASSWORD),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_later_layer() {
        let mut base = Config {
            audit_window: Some(10),
            default_format: Some("json".into()),
            ..Default::default()
        };
        base.merge(Config {
            audit_window: Some(200),
            ..Default::default()
        });
        assert_eq!(base.audit_window(), 200);
        assert_eq!(base.default_format.as_deref(), Some("json"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.audit_window(), DEFAULT_AUDIT_WINDOW);
        assert_eq!(config.mirror_attempts(), DEFAULT_MIRROR_ATTEMPTS);
        assert_eq!(config.admin_secret(), hash_password(DEFAULT_SECURITY_PASSWORD));
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let config = Config {
            mirror_attempts: Some(0),
            ..Default::default()
        };
        assert_eq!(config.mirror_attempts(), 1);
    }

    #[test]
    fn test_workspace_layer_resolves_relative_database() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::init(tmp.path(), false, Some(std::path::Path::new("audit.db"))).unwrap();
        let config = Config::load(Some(&ws));
        if std::env::var("EDILGEST_REMOTE_DB").is_err() {
            assert_eq!(config.remote_database, Some(ws.root().join("audit.db")));
        }
    }
}
