//! Workspace discovery and layout

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the marker directory holding data and configuration
pub const WORKSPACE_DIR: &str = ".edilgest";

/// Fixed key of the local durable slot
pub const STORAGE_KEY: &str = "edilgest_pro_data";

/// Represents an EdilGest workspace
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Root directory of the workspace (parent of .edilgest/)
    root: PathBuf,
}

impl Workspace {
    /// Find workspace root by walking up from the current directory
    pub fn discover() -> Result<Self, WorkspaceError> {
        let current =
            std::env::current_dir().map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find workspace root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, WorkspaceError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        loop {
            if current.join(WORKSPACE_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(WorkspaceError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new workspace at the given path
    ///
    /// With `force`, an existing `.edilgest/` is reused and its config
    /// rewritten; stored data is left alone.
    pub fn init(
        path: &Path,
        force: bool,
        remote_database: Option<&Path>,
    ) -> Result<Self, WorkspaceError> {
        std::fs::create_dir_all(path).map_err(|e| WorkspaceError::IoError(e.to_string()))?;
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let data_dir = root.join(WORKSPACE_DIR);
        if data_dir.exists() && !force {
            return Err(WorkspaceError::AlreadyExists(root));
        }

        std::fs::create_dir_all(&data_dir).map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        std::fs::write(
            data_dir.join("config.yaml"),
            Self::default_config(remote_database),
        )
        .map_err(|e| WorkspaceError::IoError(e.to_string()))?;

        Ok(Self { root })
    }

    fn default_config(remote_database: Option<&Path>) -> String {
        let remote = match remote_database {
            Some(path) => format!("remote_database: \"{}\"", path.display()),
            None => "# remote_database: \"/srv/edilgest/audit.db\"".to_string(),
        };
        format!(
            r#"# EdilGest Pro workspace configuration

# SQLite database mirroring the audit log (absent = local only)
{remote}

# Audit rows read back from the remote database on load
# audit_window: 50

# Upsert attempts per audit entry before giving up
# mirror_attempts: 2

# SHA-256 (hex) of the security password required for protected deletions
# admin_password_sha256: ""

# Default output format (auto, json, yaml, csv, md, id)
# default_format: auto
"#
        )
    }

    /// Get the workspace root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .edilgest directory
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir().join("config.yaml")
    }

    /// Path of the local durable slot
    pub fn slot_path(&self) -> PathBuf {
        self.data_dir().join(format!("{}.json", STORAGE_KEY))
    }

    /// Resolve a possibly relative path against the workspace root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Errors that can occur during workspace operations
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("not an EdilGest workspace (searched from {searched_from:?}). Run 'edilgest init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("EdilGest workspace already exists at {0:?} (use --force to reinitialise)")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let ws = Workspace::init(tmp.path(), false, None).unwrap();

        assert!(ws.data_dir().is_dir());
        assert!(ws.config_path().exists());
        assert!(ws.slot_path().ends_with(".edilgest/edilgest_pro_data.json"));
    }

    #[test]
    fn test_init_fails_if_exists_unless_forced() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path(), false, None).unwrap();

        let err = Workspace::init(tmp.path(), false, None).unwrap_err();
        assert!(matches!(err, WorkspaceError::AlreadyExists(_)));

        Workspace::init(tmp.path(), true, Some(Path::new("audit.db"))).unwrap();
        let config = std::fs::read_to_string(tmp.path().join(".edilgest/config.yaml")).unwrap();
        assert!(config.contains("remote_database: \"audit.db\""));
    }

    #[test]
    fn test_discover_finds_workspace_from_subdir() {
        let tmp = tempdir().unwrap();
        Workspace::init(tmp.path(), false, None).unwrap();

        let subdir = tmp.path().join("exports/2024");
        std::fs::create_dir_all(&subdir).unwrap();

        let ws = Workspace::discover_from(&subdir).unwrap();
        assert_eq!(
            ws.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_discover_fails_without_workspace() {
        let tmp = tempdir().unwrap();
        let err = Workspace::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound { .. }));
    }
}
