//! Persistent list of tracked roots.
//!
//! Stored as TOML:
//!
//! ```toml
//! [[roots]]
//! name = "proj"
//! path = "/repos/proj"
//! ```

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::status::{RootProvider, TrackedRoot, canonical_path};

#[derive(Debug, Default, Serialize, Deserialize)]
struct RootsFile {
    #[serde(default)]
    roots: Vec<TrackedRoot>,
}

/// Tracked roots backed by a TOML file. Mutations are in memory until
/// [`save`](Self::save).
#[derive(Debug)]
pub struct RootStore {
    path: PathBuf,
    roots: RwLock<Vec<TrackedRoot>>,
}

impl RootStore {
    /// Read `path`; a missing file is an empty list.
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let roots = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let file: RootsFile = toml::from_str(&content)
                    .with_context(|| format!("failed to parse roots file: {}", path.display()))?;
                file.roots
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read roots file: {}", path.display()));
            }
        };
        log::debug!("loaded {} roots from {}", roots.len(), path.display());

        Ok(Self {
            path,
            roots: RwLock::new(roots),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> Vec<TrackedRoot> {
        self.roots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Append `root` unless a root at the same canonical path exists.
    /// Returns whether it was added.
    pub fn add(&self, root: TrackedRoot) -> bool {
        let mut roots = self.roots.write().unwrap_or_else(PoisonError::into_inner);
        if roots.iter().any(|existing| existing.is_at(&root.path)) {
            return false;
        }
        roots.push(root);
        true
    }

    /// Remove the root at `path`. Returns whether one was removed.
    pub fn remove(&self, path: &Path) -> bool {
        let target = canonical_path(path);
        let mut roots = self.roots.write().unwrap_or_else(PoisonError::into_inner);
        let before = roots.len();
        roots.retain(|root| canonical_path(&root.path) != target);
        roots.len() != before
    }

    /// Write the list back, replacing the file atomically.
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(parent) = self.path.parent() else {
            anyhow::bail!("roots path has no parent directory: {}", self.path.display());
        };
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config dir: {}", parent.display()))?;

        let file = RootsFile { roots: self.list() };
        let content = toml::to_string_pretty(&file).context("failed to serialize roots")?;

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, content)
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "failed to atomically replace roots file at {}",
                self.path.display()
            )
        })?;

        log::debug!("saved {} roots to {}", file.roots.len(), self.path.display());
        Ok(())
    }
}

impl RootProvider for RootStore {
    fn roots(&self) -> anyhow::Result<Vec<TrackedRoot>> {
        let roots = self
            .roots
            .read()
            .map_err(|_| anyhow::anyhow!("roots list is poisoned"))?;
        Ok(roots.clone())
    }
}
