//! JSON snapshots of cached collections on local disk.
//!
//! Lets a consumer show the last known state before the first network load
//! completes. Nothing in the sync layer depends on it.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;

const APP_DIR: &str = "oneflow";

/// One snapshot file, `{root}/{name}.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMirror {
    path: PathBuf,
}

impl LocalMirror {
    pub fn new(root: impl AsRef<Path>, name: &str) -> Self {
        Self {
            path: root.as_ref().join(format!("{name}.json")),
        }
    }

    /// `{data_dir}/oneflow`, e.g. `~/.local/share/oneflow` on Linux.
    pub fn default_root() -> anyhow::Result<PathBuf> {
        let base = dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
            .context("failed to resolve OS data directory - tried data_dir() and home_dir()/.local/share")?;
        Ok(base.join(APP_DIR))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the snapshot with `records`.
    ///
    /// Writes a sibling temp file and renames it over the snapshot so a crash
    /// never leaves a half-written file behind.
    pub fn save<E: Serialize>(&self, records: &[E]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create mirror directory at {parent:?}"))?;
        }

        let json = serde_json::to_vec_pretty(records).context("failed to serialize mirror snapshot")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("failed to write {tmp:?}"))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to move snapshot into place at {:?}", self.path))?;

        tracing::debug!(path = %self.path.display(), records = records.len(), "mirror saved");
        Ok(())
    }

    /// `None` when no snapshot has been written yet.
    pub fn load<E: DeserializeOwned>(&self) -> anyhow::Result<Option<Vec<E>>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("failed to read {:?}", self.path)),
        };
        let records = serde_json::from_slice(&bytes)
            .with_context(|| format!("corrupt mirror snapshot at {:?}", self.path))?;
        Ok(Some(records))
    }

    pub fn remove(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {:?}", self.path)),
        }
    }
}
