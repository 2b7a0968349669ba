//! Whole-workspace snapshots on disk.
//!
//! One pretty-printed JSON file per data directory. Saving replaces it; a
//! missing file loads as an empty bench.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lab_core::LabState;

pub const SNAPSHOT_FILE_NAME: &str = "chemistar-workspace.json";

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(SNAPSHOT_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes to a sibling temp file first so a crash never leaves a
    /// half-written snapshot behind.
    pub fn save(&self, state: &LabState) -> Result<PathBuf> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating data dir {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(state).context("serializing workspace")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(self.path.clone())
    }

    pub fn load(&self) -> Result<LabState> {
        if !self.path.exists() {
            return Ok(LabState::default());
        }
        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing {}", self.path.display()))
    }
}
