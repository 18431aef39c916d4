use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::placement::{FutureClassShell, RuleSet};

use super::RosterSnapshot;

/// Classes and rules configured for one target level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelWorkspace {
    #[serde(default)]
    pub classes: Vec<FutureClassShell>,
    #[serde(default)]
    pub rules: RuleSet,
}

/// Persistence seam for the imported roster and the per-level workspaces.
pub trait WorkspaceStore: Send + Sync {
    fn load_roster(&self) -> Result<Option<RosterSnapshot>, StoreError>;
    fn save_roster(&self, roster: &RosterSnapshot) -> Result<(), StoreError>;
    /// A level never saved comes back with no classes and the default rules.
    fn load_level(&self, level: &str) -> Result<LevelWorkspace, StoreError>;
    fn save_level(&self, level: &str, workspace: &LevelWorkspace) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt workspace file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn level_key(level: &str) -> String {
    level.trim().to_uppercase()
}

/// One pretty-printed JSON file per blob under `data_dir`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn roster_path(&self) -> PathBuf {
        self.data_dir.join("roster.json")
    }

    fn level_path(&self, level: &str) -> PathBuf {
        let stem: String = level_key(level)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.data_dir.join(format!("level-{stem}.json"))
    }

    fn read<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<Option<T>, StoreError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Json {
                path: path.to_path_buf(),
                source,
            })
    }

    fn write<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        std::fs::create_dir_all(&self.data_dir).map_err(io_error)?;
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, bytes).map_err(io_error)?;
        debug!(path = %path.display(), "workspace file written");
        Ok(())
    }
}

impl WorkspaceStore for JsonFileStore {
    fn load_roster(&self) -> Result<Option<RosterSnapshot>, StoreError> {
        self.read(&self.roster_path())
    }

    fn save_roster(&self, roster: &RosterSnapshot) -> Result<(), StoreError> {
        self.write(&self.roster_path(), roster)
    }

    fn load_level(&self, level: &str) -> Result<LevelWorkspace, StoreError> {
        Ok(self.read(&self.level_path(level))?.unwrap_or_default())
    }

    fn save_level(&self, level: &str, workspace: &LevelWorkspace) -> Result<(), StoreError> {
        self.write(&self.level_path(level), workspace)
    }
}

/// Process-local store for tests and one-shot CLI runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    roster: Mutex<Option<RosterSnapshot>>,
    levels: Mutex<HashMap<String, LevelWorkspace>>,
}

impl WorkspaceStore for MemoryStore {
    fn load_roster(&self) -> Result<Option<RosterSnapshot>, StoreError> {
        Ok(self
            .roster
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save_roster(&self, roster: &RosterSnapshot) -> Result<(), StoreError> {
        *self.roster.lock().unwrap_or_else(PoisonError::into_inner) = Some(roster.clone());
        Ok(())
    }

    fn load_level(&self, level: &str) -> Result<LevelWorkspace, StoreError> {
        Ok(self
            .levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&level_key(level))
            .cloned()
            .unwrap_or_default())
    }

    fn save_level(&self, level: &str, workspace: &LevelWorkspace) -> Result<(), StoreError> {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(level_key(level), workspace.clone());
        Ok(())
    }
}
