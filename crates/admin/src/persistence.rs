//! JSON snapshot file backing the in-memory store between runs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use rolegate_auth::{InMemoryRbacStore, RbacSnapshot, RolePolicy};

#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot; a missing file yields `None`.
    pub fn load(&self) -> anyhow::Result<Option<RbacSnapshot>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading snapshot {}", self.path.display()));
            }
        };
        let snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("parsing snapshot {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    /// Write the snapshot to a sibling temp file, then rename it into place.
    pub fn save(&self, snapshot: &RbacSnapshot) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(snapshot).context("serializing snapshot")?;
        let tmp = self.temp_path();
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing snapshot {}", self.path.display()))?;
        debug!(
            path = %self.path.display(),
            permissions = snapshot.permissions.len(),
            roles = snapshot.roles.len(),
            "snapshot saved"
        );
        Ok(())
    }

    /// Open a store from the file (empty when the file does not exist yet).
    pub fn open_store(&self, policy: RolePolicy) -> anyhow::Result<InMemoryRbacStore> {
        match self.load()? {
            Some(snapshot) => InMemoryRbacStore::from_snapshot(snapshot, policy)
                .with_context(|| format!("rebuilding state from {}", self.path.display())),
            None => Ok(InMemoryRbacStore::with_policy(policy)),
        }
    }

    pub fn persist(&self, store: &InMemoryRbacStore) -> anyhow::Result<()> {
        let snapshot = store.snapshot().context("reading store for snapshot")?;
        self.save(&snapshot)
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "rolegate.json".to_string());
        self.path.with_file_name(format!(".{file_name}.tmp"))
    }
}
